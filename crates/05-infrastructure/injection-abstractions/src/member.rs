//! 类与成员描述符
//!
//! 注入引擎只依赖这里的描述符，不依赖宿主语言的反射。

use crate::annotation::Annotation;
use injection_common::{LinkageFailure, TypeDescriptor};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 方法参数描述符
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    /// 参数类型
    pub parameter_type: TypeDescriptor,
    /// 参数上的限定注解名称
    pub qualifiers: Vec<String>,
}

/// 字段描述符
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// 声明类名称
    pub declaring_class: String,
    /// 字段名称
    pub name: String,
    /// 字段类型
    pub field_type: TypeDescriptor,
    /// 是否为静态字段
    pub is_static: bool,
    /// 是否为 final 字段
    pub is_final: bool,
    /// 是否带有生产者注解（免除静态检查）
    pub producer: bool,
    /// 字段上的注解
    pub annotations: Vec<Annotation>,
}

impl FieldDescriptor {
    /// 创建字段描述符，声明类由 [`ClassDescriptor::with_field`] 填充
    pub fn new(name: impl Into<String>, field_type: TypeDescriptor) -> Self {
        Self {
            declaring_class: String::new(),
            name: name.into(),
            field_type,
            is_static: false,
            is_final: false,
            producer: false,
            annotations: Vec::new(),
        }
    }

    /// 标记为静态字段
    pub const fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// 标记为 final 字段
    pub const fn with_final(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    /// 标记为生产者字段
    pub const fn as_producer(mut self) -> Self {
        self.producer = true;
        self
    }

    /// 添加注解
    pub fn with_annotation(mut self, annotation: impl Into<Annotation>) -> Self {
        self.annotations.push(annotation.into());
        self
    }
}

/// 方法描述符
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    /// 声明类名称
    pub declaring_class: String,
    /// 方法名称
    pub name: String,
    /// 参数列表
    pub parameters: Vec<ParameterDescriptor>,
    /// 是否为静态方法
    pub is_static: bool,
    /// 方法上的注解
    pub annotations: Vec<Annotation>,
}

impl MethodDescriptor {
    /// 创建方法描述符，声明类由 [`ClassDescriptor::with_method`] 填充
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            declaring_class: String::new(),
            name: name.into(),
            parameters: Vec::new(),
            is_static: false,
            annotations: Vec::new(),
        }
    }

    /// 创建单参数 set 方法
    pub fn setter(name: impl Into<String>, parameter_type: TypeDescriptor) -> Self {
        Self::new(name).with_parameter(parameter_type)
    }

    /// 添加参数
    pub fn with_parameter(self, parameter_type: TypeDescriptor) -> Self {
        self.with_qualified_parameter(parameter_type, Vec::<String>::new())
    }

    /// 添加带限定注解的参数
    pub fn with_qualified_parameter<I, S>(mut self, parameter_type: TypeDescriptor, qualifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters.push(ParameterDescriptor {
            parameter_type,
            qualifiers: qualifiers.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// 标记为静态方法
    pub const fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// 添加注解
    pub fn with_annotation(mut self, annotation: impl Into<Annotation>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// JavaBeans 属性名称，`setDataSource` 对应 `dataSource`
    pub fn property_name(&self) -> String {
        match self.name.strip_prefix("set") {
            Some(rest) if !rest.is_empty() => decapitalize(rest),
            _ => self.name.clone(),
        }
    }

    /// 唯一参数的类型
    pub fn single_parameter_type(&self) -> Option<&TypeDescriptor> {
        match self.parameters.as_slice() {
            [parameter] => Some(&parameter.parameter_type),
            _ => None,
        }
    }

    /// 方法签名，例如 `setDataSource(javax.sql.DataSource)`
    pub fn signature(&self) -> String {
        let parameters: Vec<&str> = self
            .parameters
            .iter()
            .map(|p| p.parameter_type.name())
            .collect();
        format!("{}({})", self.name, parameters.join(","))
    }
}

/// 属性对应的 set 方法名称
pub fn setter_name(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("set{}{}", first.to_uppercase(), chars.as_str()),
        None => "set".to_string(),
    }
}

fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        // URL -> URL
        (Some(first), Some(second)) if first.is_uppercase() && second.is_uppercase() => name.to_string(),
        (Some(first), _) => {
            let rest = &name[first.len_utf8()..];
            format!("{}{}", first.to_lowercase(), rest)
        }
        (None, _) => String::new(),
    }
}

/// 类描述符
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    /// 类名称
    pub name: String,
    /// 父类
    pub superclass: Option<Arc<ClassDescriptor>>,
    /// 实现的接口名称
    pub interfaces: Vec<String>,
    /// 声明的字段
    pub fields: Vec<Arc<FieldDescriptor>>,
    /// 声明的方法
    pub methods: Vec<Arc<MethodDescriptor>>,
    /// 类级注解
    pub annotations: Vec<Annotation>,
    /// 枚举常量，非枚举类为 `None`
    pub enum_constants: Option<Vec<String>>,
}

impl ClassDescriptor {
    /// 创建类描述符
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            annotations: Vec::new(),
            enum_constants: None,
        }
    }

    /// 声明为枚举类型
    pub fn with_enum_constants<I, S>(mut self, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_constants = Some(constants.into_iter().map(Into::into).collect());
        self
    }

    /// 是否为枚举类型
    pub const fn is_enum(&self) -> bool {
        self.enum_constants.is_some()
    }

    /// 是否声明了名为 `name` 的枚举常量
    pub fn has_enum_constant(&self, name: &str) -> bool {
        self.enum_constants
            .as_ref()
            .is_some_and(|constants| constants.iter().any(|c| c == name))
    }

    /// 设置父类
    pub fn extends(mut self, superclass: Arc<Self>) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// 添加实现的接口
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// 添加字段
    pub fn with_field(mut self, mut field: FieldDescriptor) -> Self {
        field.declaring_class = self.name.clone();
        self.fields.push(Arc::new(field));
        self
    }

    /// 添加方法
    pub fn with_method(mut self, mut method: MethodDescriptor) -> Self {
        method.declaring_class = self.name.clone();
        self.methods.push(Arc::new(method));
        self
    }

    /// 添加类级注解
    pub fn with_annotation(mut self, annotation: impl Into<Annotation>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// 自身及所有父类，子类在前
    pub fn hierarchy(&self) -> Vec<&Self> {
        let mut classes = vec![self];
        let mut current = self.superclass.as_deref();
        while let Some(class) = current {
            classes.push(class);
            current = class.superclass.as_deref();
        }
        classes
    }

    /// 当前类是否为 `class_name` 或其子类
    pub fn is_subclass_of(&self, class_name: &str) -> bool {
        self.hierarchy().iter().any(|c| c.name == class_name)
    }

    /// 当前类的类型描述符，包含父类与接口
    pub fn type_descriptor(&self) -> TypeDescriptor {
        let ancestors = self
            .hierarchy()
            .into_iter()
            .skip(1)
            .map(|c| c.name.clone())
            .chain(
                self.hierarchy()
                    .into_iter()
                    .flat_map(|c| c.interfaces.iter().cloned()),
            );
        TypeDescriptor::named(self.name.clone()).with_ancestors(ancestors)
    }

    /// 查找声明的字段
    pub fn declared_field(&self, name: &str) -> Option<&Arc<FieldDescriptor>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// 声明的 set 方法
    ///
    /// 客户端流程只选择静态方法，其余流程只选择实例方法。
    pub fn declared_set_methods(&self, client: bool) -> Vec<Arc<MethodDescriptor>> {
        self.methods
            .iter()
            .filter(|m| m.name.starts_with("set") && m.is_static == client)
            .cloned()
            .collect()
    }
}

/// 注入成员
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// 字段
    Field(Arc<FieldDescriptor>),
    /// 方法
    Method(Arc<MethodDescriptor>),
}

/// 成员标识，用于注入目标去重
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberKey {
    /// 声明类名称
    pub declaring_class: String,
    /// 成员名称
    pub name: String,
    /// 方法参数类型，字段为 `None`
    pub parameter_types: Option<Vec<String>>,
}

impl Member {
    /// 成员标识
    pub fn key(&self) -> MemberKey {
        match self {
            Self::Field(field) => MemberKey {
                declaring_class: field.declaring_class.clone(),
                name: field.name.clone(),
                parameter_types: None,
            },
            Self::Method(method) => MemberKey {
                declaring_class: method.declaring_class.clone(),
                name: method.name.clone(),
                parameter_types: Some(
                    method
                        .parameters
                        .iter()
                        .map(|p| p.parameter_type.name().to_string())
                        .collect(),
                ),
            },
        }
    }

    /// 声明类名称
    pub fn declaring_class(&self) -> &str {
        match self {
            Self::Field(field) => &field.declaring_class,
            Self::Method(method) => &method.declaring_class,
        }
    }

    /// 成员名称
    pub fn name(&self) -> &str {
        match self {
            Self::Field(field) => &field.name,
            Self::Method(method) => &method.name,
        }
    }

    /// JavaBeans 属性名称
    pub fn property_name(&self) -> String {
        match self {
            Self::Field(field) => field.name.clone(),
            Self::Method(method) => method.property_name(),
        }
    }

    /// 是否为静态成员
    pub fn is_static(&self) -> bool {
        match self {
            Self::Field(field) => field.is_static,
            Self::Method(method) => method.is_static,
        }
    }

    /// 成员上的注解
    pub fn annotations(&self) -> &[Annotation] {
        match self {
            Self::Field(field) => &field.annotations,
            Self::Method(method) => &method.annotations,
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => write!(f, "{}.{}", field.declaring_class, field.name),
            Self::Method(method) => write!(f, "{}.{}", method.declaring_class, method.signature()),
        }
    }
}

/// 类解析器
///
/// 部署描述符中的注入目标只给出类名称，由类解析器提供类描述符。
pub trait ClassResolver: Send + Sync {
    /// 加载类，类不存在时返回 `Ok(None)`
    fn load_class(&self, name: &str) -> Result<Option<Arc<ClassDescriptor>>, LinkageFailure>;
}

/// 基于内存表的类解析器
#[derive(Debug, Default)]
pub struct InMemoryClassResolver {
    classes: HashMap<String, Arc<ClassDescriptor>>,
    broken: HashMap<String, String>,
}

impl InMemoryClassResolver {
    /// 创建空的类解析器
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册类
    pub fn with_class(mut self, class: Arc<ClassDescriptor>) -> Self {
        self.classes.insert(class.name.clone(), class);
        self
    }

    /// 注册一个加载时链接失败的类
    pub fn with_broken_class(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.broken.insert(name.into(), message.into());
        self
    }
}

impl ClassResolver for InMemoryClassResolver {
    fn load_class(&self, name: &str) -> Result<Option<Arc<ClassDescriptor>>, LinkageFailure> {
        if let Some(message) = self.broken.get(name) {
            return Err(LinkageFailure::new(name, message.clone()));
        }
        Ok(self.classes.get(name).cloned())
    }
}
