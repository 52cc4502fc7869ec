//! 引用处理策略
//!
//! 每种引用类型一个策略对象，负责部署描述符处理、注解合并、解析与跨组件一致性检查。
//! 处理器负责生命周期与绑定表，策略只处理单个绑定。

mod context;
mod definition;
mod resource;

pub use context::{ContainerContextStrategy, ContextData};
pub use definition::{DefinitionData, ResourceDefinitionStrategy, ISOLATION_LEVELS};
pub use resource::{convert_env_entry, EnvEntryFormatError, ResourceData, ResourceStrategy};

use crate::binding::{Binding, SimpleBindingKey};
use crate::context::ProcessorContext;
use crate::processor::BindingTable;
use injection_abstractions::{Annotation, ClassDescriptor, Member, ReferenceKind};
use injection_common::{ConfigurationResult, InjectionError, InjectionResult, TypeDescriptor};

/// 间接查找工厂（lookup、env-entry 绑定）
pub const INDIRECT_LOOKUP_FACTORY: &str = "indirect-lookup";
/// 部署者绑定名称工厂
pub const RESOURCE_REF_FACTORY: &str = "resource-ref-lookup";
/// 自动链接工厂，注册后作为最后的解析手段
pub const RESOURCE_AUTO_LINK_FACTORY: &str = "resource-auto-link";
/// 托管 Bean 链接工厂
pub const MANAGED_BEAN_LINK_FACTORY: &str = "managed-bean-link";
/// 资源定义工厂
pub const RESOURCE_DEFINITION_FACTORY: &str = "resource-definition";
/// 没有类解析器时延迟加载 env-entry 类与枚举值的工厂
pub const ENV_ENTRY_FACTORY: &str = "env-entry";

/// 引用地址项类型
pub mod address {
    /// 绑定或查找的目标名称
    pub const BINDING_NAME: &str = "binding-name";
    /// 完整引用名称
    pub const REFERENCE_NAME: &str = "reference-name";
    /// 托管 Bean 类名称
    pub const MANAGED_BEAN: &str = "managed-bean";
    /// 认证类型
    pub const AUTHENTICATION_TYPE: &str = "authentication-type";
    /// 是否可共享
    pub const SHAREABLE: &str = "shareable";
    /// 映射名称
    pub const MAPPED_NAME: &str = "mapped-name";
    /// env-entry 的类名称值
    pub const CLASS_NAME: &str = "class-name";
    /// env-entry 的枚举常量名称
    pub const ENUM_CONSTANT: &str = "enum-constant";
}

/// 解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// 已得到绑定对象（可能为空）
    Resolved,
    /// 无法解析，加入缺失列表
    Missing,
}

/// 引用处理策略 trait
pub trait ReferenceStrategy: Send + Sync {
    /// 处理的引用类型
    fn kind(&self) -> ReferenceKind;

    /// 处理部署描述符中的声明
    fn process_xml(&self, _table: &mut BindingTable, _context: &ProcessorContext<'_>) -> InjectionResult<()> {
        Ok(())
    }

    /// 成员级注解未指定名称时的默认名称，`None` 表示创建无名称绑定
    fn default_name(&self, _class: &ClassDescriptor, member: &Member) -> Option<String> {
        Some(format!("{}/{}", member.declaring_class(), member.property_name()))
    }

    /// 类级注解未指定名称
    fn validate_empty_name(
        &self,
        _annotation: &Annotation,
        _class: &ClassDescriptor,
        _context: &ProcessorContext<'_>,
    ) -> ConfigurationResult<()> {
        Ok(())
    }

    /// 是否支持多参数初始化方法
    fn supports_initializer_methods(&self) -> bool {
        false
    }

    /// 由注解创建命名绑定
    fn create_binding(
        &self,
        annotation: &Annotation,
        name: &str,
        class: &ClassDescriptor,
        member: Option<&Member>,
        context: &ProcessorContext<'_>,
    ) -> InjectionResult<Binding>;

    /// 由注解创建无名称绑定
    fn create_simple_binding(
        &self,
        _annotation: &Annotation,
        key: SimpleBindingKey,
        _member: &Member,
        _context: &ProcessorContext<'_>,
    ) -> InjectionResult<Binding> {
        Err(InjectionError::illegal_state(format!(
            "{} 不支持无名称绑定: {}/{}",
            self.kind(),
            key.class_name,
            key.property
        )))
    }

    /// 把注解合并到已有绑定
    fn merge(
        &self,
        binding: &mut Binding,
        annotation: &Annotation,
        class: &ClassDescriptor,
        member: Option<&Member>,
        context: &ProcessorContext<'_>,
    ) -> InjectionResult<()>;

    /// 解析绑定对象
    fn resolve(&self, binding: &mut Binding, context: &ProcessorContext<'_>) -> InjectionResult<ResolveOutcome>;

    /// 与其他组件保存的同名绑定比较
    ///
    /// 只有非组件作用域的命名绑定会被保存，无名称的绑定不会走到这里。
    fn merge_saved(&self, _saved: &Binding, _binding: &Binding) -> ConfigurationResult<()> {
        Ok(())
    }
}

/// 成员的注入类型：字段类型或单参数方法的参数类型
pub fn member_type(member: &Member) -> Option<TypeDescriptor> {
    match member {
        Member::Field(field) => Some(field.field_type.clone()),
        Member::Method(method) => method.single_parameter_type().cloned(),
    }
}

fn unexpected_data(expected: ReferenceKind, actual: ReferenceKind) -> InjectionError {
    InjectionError::illegal_state(format!("{expected} 处理器收到了 {actual} 的绑定数据"))
}

fn unexpected_annotation(kind: ReferenceKind, annotation: &Annotation) -> InjectionError {
    InjectionError::illegal_state(format!("{kind} 处理器收到了 {} 注解", annotation.kind()))
}
