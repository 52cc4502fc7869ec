//! 对象工厂抽象接口
//!
//! 解析阶段为引用生成 [`Reference`]，运行期由对象工厂据此创建对象。

use crate::annotation::{Annotation, ReferenceKind};
use crate::context::InjectionTargetContext;
use crate::member::{ClassDescriptor, Member};
use injection_common::ComponentIdentity;
use std::any::Any;
use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// 绑定到命名空间或注入到目标中的对象
pub type BoundObject = Arc<dyn Any + Send + Sync>;

/// 对象工厂错误
pub type FactoryError = Box<dyn Error + Send + Sync>;

/// 引用中的地址项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefAddr {
    /// 地址类型
    pub kind: String,
    /// 地址内容
    pub content: String,
}

/// 命名引用
///
/// 记录对象类型、负责创建对象的工厂名称以及工厂所需的地址项。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// 对象类型名称
    pub class_name: String,
    /// 工厂名称
    pub factory_name: String,
    /// 地址项
    pub addresses: Vec<RefAddr>,
}

impl Reference {
    /// 创建引用
    pub fn new(class_name: impl Into<String>, factory_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            factory_name: factory_name.into(),
            addresses: Vec::new(),
        }
    }

    /// 添加地址项
    pub fn with_address(mut self, kind: impl Into<String>, content: impl Into<String>) -> Self {
        self.addresses.push(RefAddr {
            kind: kind.into(),
            content: content.into(),
        });
        self
    }

    /// 查找第一个指定类型的地址内容
    pub fn address(&self, kind: &str) -> Option<&str> {
        self.addresses
            .iter()
            .find(|a| a.kind == kind)
            .map(|a| a.content.as_str())
    }

    /// 所有指定类型的地址内容
    pub fn addresses_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.addresses
            .iter()
            .filter(move |a| a.kind == kind)
            .map(|a| a.content.as_str())
    }
}

/// 初始化方法的参数列表
///
/// 多参数注入方法的工厂返回该类型，按参数顺序排列。
#[derive(Clone)]
pub struct InitializerArguments(pub Vec<BoundObject>);

impl fmt::Debug for InitializerArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InitializerArguments").field(&self.0.len()).finish()
    }
}

/// env-entry 中的枚举常量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    /// 枚举类型名称
    pub type_name: String,
    /// 常量名称
    pub name: String,
}

/// 对象工厂 trait
pub trait ObjectFactory: Send + Sync {
    /// 根据引用创建对象，`Ok(None)` 表示工厂无法提供对象
    fn get_object_instance(
        &self,
        reference: &Reference,
        context: &mut InjectionTargetContext,
    ) -> Result<Option<BoundObject>, FactoryError>;
}

impl<F> ObjectFactory for F
where
    F: Fn(&Reference, &mut InjectionTargetContext) -> Result<Option<BoundObject>, FactoryError> + Send + Sync,
{
    fn get_object_instance(
        &self,
        reference: &Reference,
        context: &mut InjectionTargetContext,
    ) -> Result<Option<BoundObject>, FactoryError> {
        self(reference, context)
    }
}

/// 对象工厂注册信息
///
/// 按 (引用类型, 对象类型) 注册。
#[derive(Clone)]
pub struct ObjectFactoryInfo {
    /// 工厂名称，写入生成的 [`Reference`]
    pub factory_name: String,
    /// 工厂实例
    pub factory: Arc<dyn ObjectFactory>,
    /// 是否允许部署者覆盖（绑定、lookup 优先于工厂）
    pub allow_override: bool,
    /// 不允许覆盖时，仍允许取非默认值的注解属性
    pub allowed_attributes: HashSet<String>,
    /// 生成的引用是否需要携带引用名称地址项
    pub ref_addr_needed: bool,
}

impl ObjectFactoryInfo {
    /// 创建注册信息
    pub fn new(factory_name: impl Into<String>, factory: Arc<dyn ObjectFactory>) -> Self {
        Self {
            factory_name: factory_name.into(),
            factory,
            allow_override: true,
            allowed_attributes: HashSet::new(),
            ref_addr_needed: false,
        }
    }

    /// 设置是否允许覆盖
    pub const fn with_allow_override(mut self, allow_override: bool) -> Self {
        self.allow_override = allow_override;
        self
    }

    /// 允许某个注解属性取非默认值
    pub fn with_allowed_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.allowed_attributes.insert(attribute.into());
        self
    }

    /// 设置是否需要引用名称地址项
    pub const fn with_ref_addr_needed(mut self, needed: bool) -> Self {
        self.ref_addr_needed = needed;
        self
    }
}

impl fmt::Debug for ObjectFactoryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectFactoryInfo")
            .field("factory_name", &self.factory_name)
            .field("allow_override", &self.allow_override)
            .field("allowed_attributes", &self.allowed_attributes)
            .field("ref_addr_needed", &self.ref_addr_needed)
            .finish_non_exhaustive()
    }
}

/// 覆盖引用工厂的请求参数
#[derive(Debug, Clone, Copy)]
pub struct OverrideRequest<'a> {
    /// 组件标识
    pub identity: &'a ComponentIdentity,
    /// 引用类型
    pub kind: ReferenceKind,
    /// 完整引用名称
    pub reference_name: &'a str,
    /// 注入类型名称
    pub type_name: Option<&'a str>,
    /// 首次发现的注解
    pub annotation: Option<&'a Annotation>,
}

/// 覆盖引用工厂
///
/// 在常规解析之前调用，可能被推测性地调用，不应产生副作用。
pub trait OverrideReferenceFactory: Send + Sync {
    /// 返回 `Some` 表示接管该引用
    fn create_reference(&self, request: &OverrideRequest<'_>) -> Option<Reference>;
}

/// 注解覆盖处理器
///
/// 在引用名称首次出现时调用，可以把注解转换为另一种引用类型的注解。
pub trait AnnotationOverride: Send + Sync {
    /// 返回 `Some` 表示接管该注解
    fn translate(
        &self,
        annotation: &Annotation,
        class: &ClassDescriptor,
        member: Option<&Member>,
    ) -> Option<Annotation>;
}
