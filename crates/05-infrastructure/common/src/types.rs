//! 类型描述符
//!
//! 与宿主语言反射无关的类型表示，以及类型兼容性判定表。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 根类型名称
pub const OBJECT_TYPE: &str = "java.lang.Object";

/// 字符串类型名称
pub const STRING_TYPE: &str = "java.lang.String";

/// 类对象类型名称，env-entry 的值为类名称
pub const CLASS_TYPE: &str = "java.lang.Class";

/// 基本类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    /// 所有基本类型
    pub const ALL: [Self; 8] = [
        Self::Boolean,
        Self::Byte,
        Self::Char,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
    ];

    /// 基本类型名称
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// 对应包装类型名称
    pub const fn boxed_name(self) -> &'static str {
        match self {
            Self::Boolean => "java.lang.Boolean",
            Self::Byte => "java.lang.Byte",
            Self::Char => "java.lang.Character",
            Self::Short => "java.lang.Short",
            Self::Int => "java.lang.Integer",
            Self::Long => "java.lang.Long",
            Self::Float => "java.lang.Float",
            Self::Double => "java.lang.Double",
        }
    }

    /// 按基本类型名称查找
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// 按包装类型名称查找
    pub fn from_boxed_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.boxed_name() == name)
    }

    const fn is_numeric(self) -> bool {
        !matches!(self, Self::Boolean | Self::Char)
    }
}

/// 类型描述符
///
/// `ancestors` 包含全部（传递的）父类与接口名称，根类型隐含在内。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    name: String,
    primitive: Option<Primitive>,
    ancestors: Vec<String>,
}

impl TypeDescriptor {
    /// 按名称创建类型描述符
    ///
    /// 基本类型名称生成基本类型描述符，常见的 `java.lang` 类型带有其标准父类型。
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if let Some(primitive) = Primitive::from_name(&name) {
            return Self::primitive(primitive);
        }
        let ancestors = well_known_ancestors(&name);
        Self {
            name,
            primitive: None,
            ancestors,
        }
    }

    /// 创建基本类型描述符
    pub fn primitive(primitive: Primitive) -> Self {
        Self {
            name: primitive.name().to_string(),
            primitive: Some(primitive),
            ancestors: Vec::new(),
        }
    }

    /// 根类型
    pub fn object() -> Self {
        Self::named(OBJECT_TYPE)
    }

    /// 追加父类型
    pub fn with_ancestors<I, S>(mut self, ancestors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for ancestor in ancestors {
            let ancestor = ancestor.into();
            if !self.ancestors.contains(&ancestor) {
                self.ancestors.push(ancestor);
            }
        }
        self
    }

    /// 类型名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 父类型列表
    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    /// 是否为基本类型
    pub const fn is_primitive(&self) -> bool {
        self.primitive.is_some()
    }

    /// 基本类型本身，或包装类型对应的基本类型
    pub fn primitive_form(&self) -> Option<Primitive> {
        self.primitive.or_else(|| Primitive::from_boxed_name(&self.name))
    }

    /// 是否为根类型
    pub fn is_object(&self) -> bool {
        self.name == OBJECT_TYPE
    }

    /// `other` 的值是否可以赋给当前类型
    pub fn is_assignable_from(&self, other: &Self) -> bool {
        if self.name == other.name {
            return true;
        }
        if self.is_primitive() || other.is_primitive() {
            return false;
        }
        self.is_object() || other.ancestors.iter().any(|a| *a == self.name)
    }

    /// 是否为 env-entry 支持的类型
    ///
    /// 枚举类型同样可以作为 env-entry，需要类解析器判断，不在此列。
    pub fn is_env_entry_type(&self) -> bool {
        self.name == STRING_TYPE || self.name == CLASS_TYPE || self.primitive_form().is_some()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn well_known_ancestors(name: &str) -> Vec<String> {
    let ancestors: &[&str] = if name == STRING_TYPE {
        &["java.lang.CharSequence", "java.io.Serializable", "java.lang.Comparable"]
    } else if let Some(primitive) = Primitive::from_boxed_name(name) {
        if primitive.is_numeric() {
            &["java.lang.Number", "java.io.Serializable", "java.lang.Comparable"]
        } else {
            &["java.io.Serializable", "java.lang.Comparable"]
        }
    } else {
        &[]
    };
    ancestors.iter().map(|a| (*a).to_string()).collect()
}

/// 类型兼容性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCompatibility {
    /// 类型完全相同
    Exact,
    /// 任一方向可赋值
    Assignable,
    /// 基本类型与其包装类型
    Boxed,
    /// 不兼容
    Incompatible,
}

impl TypeCompatibility {
    /// 是否兼容
    pub const fn is_compatible(self) -> bool {
        !matches!(self, Self::Incompatible)
    }
}

/// 判定成员类型与注入类型的兼容性
pub fn compatibility(member: &TypeDescriptor, injection: &TypeDescriptor) -> TypeCompatibility {
    if member.name == injection.name {
        TypeCompatibility::Exact
    } else if member.is_assignable_from(injection) || injection.is_assignable_from(member) {
        TypeCompatibility::Assignable
    } else if member.primitive_form().is_some() && member.primitive_form() == injection.primitive_form() {
        TypeCompatibility::Boxed
    } else {
        TypeCompatibility::Incompatible
    }
}

/// 返回两个类型中更具体的一个
///
/// 若 `current` 可以接收 `candidate`，则 `candidate` 更具体。
pub fn most_specific<'a>(current: &'a TypeDescriptor, candidate: &'a TypeDescriptor) -> &'a TypeDescriptor {
    if current.is_assignable_from(candidate) {
        candidate
    } else {
        current
    }
}
