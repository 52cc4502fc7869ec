//! 错误类型定义

use crate::metadata::ComponentIdentity;
use thiserror::Error;

/// 部署配置错误
///
/// 由注解或部署描述符中的错误配置引起。每个变体都携带组件标识，
/// 引用相关的变体同时携带引用名称，便于部署人员定位问题。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{identity} 中的引用 {reference} 存在冲突的配置数据: {attribute} 的值 {old_value} 与 {new_value} 冲突")]
    MergeConflict {
        identity: ComponentIdentity,
        reference: String,
        attribute: String,
        old_value: String,
        new_value: String,
    },

    #[error("引用 {reference} 的 {attribute} 属性在多个组件中存在冲突的值: {old_value} 和 {new_value} ({identity})")]
    SavedConflict {
        identity: ComponentIdentity,
        reference: String,
        attribute: String,
        old_value: String,
        new_value: String,
    },

    #[error("{identity} 中引用 {reference} 的属性 {property} 格式无效, 期望 name=value")]
    InvalidProperty {
        identity: ComponentIdentity,
        reference: String,
        property: String,
    },

    #[error("{identity} 中的引用名称 {reference} 无效")]
    InvalidReferenceName {
        identity: ComponentIdentity,
        reference: String,
    },

    #[error("{identity} 中类 {class_name} 上的 {annotation} 注解未指定引用名称")]
    EmptyReferenceName {
        identity: ComponentIdentity,
        annotation: String,
        class_name: String,
    },

    #[error("引用 {reference} 的注入目标属性 {property} 在类 {class_name} 中存在歧义: 方法 {first} 与方法 {second} 都与类型 {injection_type} 兼容 ({identity})")]
    AmbiguousTarget {
        identity: ComponentIdentity,
        reference: String,
        property: String,
        class_name: String,
        first: String,
        second: String,
        injection_type: String,
    },

    #[error("引用 {reference} 的注入目标不存在: 类 {class_name} 中既没有 {setter} 方法也没有 {property} 字段 ({identity})")]
    TargetNotFound {
        identity: ComponentIdentity,
        reference: String,
        class_name: String,
        setter: String,
        property: String,
    },

    #[error("引用 {reference} 的注入目标 {class_name}.{member} 的类型 {member_type} 与注入类型 {injection_type} 不兼容 ({identity})")]
    IncompatibleTarget {
        identity: ComponentIdentity,
        reference: String,
        class_name: String,
        member: String,
        member_type: String,
        injection_type: String,
    },

    #[error("引用 {reference} 同时指定在类 {class_name} 的属性字段 {property} 及其对应的 set 方法上 ({identity})")]
    FieldAndMethodTarget {
        identity: ComponentIdentity,
        reference: String,
        class_name: String,
        property: String,
    },

    #[error("引用 {reference} 的注入目标 {class_name}.{member} 不能声明为 {modifier} ({identity})")]
    IllegalModifier {
        identity: ComponentIdentity,
        reference: String,
        class_name: String,
        member: String,
        modifier: String,
    },

    #[error("客户端组件中引用 {reference} 的注入目标 {class_name}.{member} 必须声明为 static ({identity})")]
    ClientTargetNotStatic {
        identity: ComponentIdentity,
        reference: String,
        class_name: String,
        member: String,
    },

    #[error("引用 {reference} 的注入方法 {class_name}.{method} 有 {count} 个参数, 该引用类型只支持单参数方法 ({identity})")]
    InvalidInitializerMethod {
        identity: ComponentIdentity,
        reference: String,
        class_name: String,
        method: String,
        count: usize,
    },

    #[error("{identity} 中引用 {reference} 使用的类 {class_name} 不存在")]
    ClassNotFound {
        identity: ComponentIdentity,
        reference: String,
        class_name: String,
    },

    #[error("{identity} 中加载类 {class_name} 失败: {message}")]
    ClassLinkage {
        identity: ComponentIdentity,
        class_name: String,
        message: String,
    },

    #[error("引用 {reference} 的声明类型 {declared_type} 与类型 {other_type} 不兼容 ({identity})")]
    IncompatibleType {
        identity: ComponentIdentity,
        reference: String,
        declared_type: String,
        other_type: String,
    },

    #[error("env-entry {reference} 的值 {value} 无法转换为类型 {type_name} ({identity})")]
    InvalidEnvEntryValue {
        identity: ComponentIdentity,
        reference: String,
        value: String,
        type_name: String,
    },

    #[error("env-entry {reference} 同时指定了 value 和 lookup ({identity})")]
    EnvEntryValueAndLookup {
        identity: ComponentIdentity,
        reference: String,
    },

    #[error("引用 {reference} 的类型 {type_name} 不允许为属性 {attribute} 指定非默认值 {value} ({identity})")]
    InvalidOverrideAttribute {
        identity: ComponentIdentity,
        reference: String,
        type_name: String,
        attribute: String,
        value: String,
    },

    #[error("引用名称 {reference} 同时被 {first} 和 {second} 两种引用类型使用 ({identity})")]
    DuplicateReference {
        identity: ComponentIdentity,
        reference: String,
        first: String,
        second: String,
    },

    #[error("{identity} 中以下引用无法解析: {}", references.join(", "))]
    MissingBindings {
        identity: ComponentIdentity,
        references: Vec<String>,
    },
}

impl ConfigurationError {
    /// 获取出错组件的标识
    pub const fn identity(&self) -> &ComponentIdentity {
        match self {
            Self::MergeConflict { identity, .. }
            | Self::SavedConflict { identity, .. }
            | Self::InvalidProperty { identity, .. }
            | Self::InvalidReferenceName { identity, .. }
            | Self::EmptyReferenceName { identity, .. }
            | Self::AmbiguousTarget { identity, .. }
            | Self::TargetNotFound { identity, .. }
            | Self::IncompatibleTarget { identity, .. }
            | Self::FieldAndMethodTarget { identity, .. }
            | Self::IllegalModifier { identity, .. }
            | Self::ClientTargetNotStatic { identity, .. }
            | Self::InvalidInitializerMethod { identity, .. }
            | Self::ClassNotFound { identity, .. }
            | Self::ClassLinkage { identity, .. }
            | Self::IncompatibleType { identity, .. }
            | Self::InvalidEnvEntryValue { identity, .. }
            | Self::EnvEntryValueAndLookup { identity, .. }
            | Self::InvalidOverrideAttribute { identity, .. }
            | Self::DuplicateReference { identity, .. }
            | Self::MissingBindings { identity, .. } => identity,
        }
    }

    /// 获取出错的引用名称（如果错误与单个引用相关）
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::MergeConflict { reference, .. }
            | Self::SavedConflict { reference, .. }
            | Self::InvalidProperty { reference, .. }
            | Self::InvalidReferenceName { reference, .. }
            | Self::AmbiguousTarget { reference, .. }
            | Self::TargetNotFound { reference, .. }
            | Self::IncompatibleTarget { reference, .. }
            | Self::FieldAndMethodTarget { reference, .. }
            | Self::IllegalModifier { reference, .. }
            | Self::ClientTargetNotStatic { reference, .. }
            | Self::InvalidInitializerMethod { reference, .. }
            | Self::ClassNotFound { reference, .. }
            | Self::IncompatibleType { reference, .. }
            | Self::InvalidEnvEntryValue { reference, .. }
            | Self::EnvEntryValueAndLookup { reference, .. }
            | Self::InvalidOverrideAttribute { reference, .. }
            | Self::DuplicateReference { reference, .. } => Some(reference),
            Self::EmptyReferenceName { .. }
            | Self::ClassLinkage { .. }
            | Self::MissingBindings { .. } => None,
        }
    }
}

/// 命名空间错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("名称已绑定: {name}")]
    AlreadyBound { name: String },

    #[error("名称未找到: {name}")]
    NotFound { name: String },

    #[error("无效的名称: {name}")]
    InvalidName { name: String },
}

/// 类链接失败
///
/// 由类解析器在目标类缺失或版本不兼容时返回。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("类 {class_name} 链接失败: {message}")]
pub struct LinkageFailure {
    /// 类名称
    pub class_name: String,
    /// 失败原因
    pub message: String,
}

impl LinkageFailure {
    /// 创建链接失败错误
    pub fn new(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message: message.into(),
        }
    }
}

/// 引擎配置错误
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("引擎配置解析失败: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },

    #[error("引擎配置加载失败: {message}")]
    Load { message: String },
}

/// 注入引擎错误
///
/// 元数据处理与运行期注入的顶层错误类型。
#[derive(Error, Debug)]
pub enum InjectionError {
    #[error("配置错误: {source}")]
    Configuration {
        #[from]
        source: ConfigurationError,
    },

    #[error("命名空间错误: {source}")]
    Naming {
        #[from]
        source: NamingError,
    },

    #[error("检测到递归注入: 引用 {reference}, 注入链: {}", chain.join(" -> "))]
    RecursiveInjection {
        reference: String,
        chain: Vec<String>,
        logged: bool,
    },

    #[error("引用 {reference} 的对象实例创建失败: {source}")]
    ObjectCreationFailed {
        reference: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{identity} 中类型为 {type_name} 的引用 {reference} 无法解析为对象")]
    UnresolvedObject {
        identity: ComponentIdentity,
        reference: String,
        type_name: String,
    },

    #[error("向 {target} 注入引用 {reference} 失败: {source}")]
    TargetInjectionFailed {
        reference: String,
        target: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("对象工厂不存在: {factory}")]
    FactoryNotFound { factory: String },

    #[error("非法状态: {message}")]
    IllegalState { message: String },
}

impl InjectionError {
    /// 创建非法状态错误
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    /// 判断是否为部署配置错误
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// 获取内部的部署配置错误
    pub const fn as_configuration_error(&self) -> Option<&ConfigurationError> {
        match self {
            Self::Configuration { source } => Some(source),
            _ => None,
        }
    }

    /// 在错误链中查找递归注入错误
    ///
    /// 返回找到的引用名称、注入链以及是否已经记录过日志。
    pub fn find_recursive(
        error: &(dyn std::error::Error + 'static),
    ) -> Option<(String, Vec<String>, bool)> {
        let mut current = Some(error);
        while let Some(err) = current {
            if let Some(Self::RecursiveInjection {
                reference,
                chain,
                logged,
            }) = err.downcast_ref::<Self>()
            {
                return Some((reference.clone(), chain.clone(), *logged));
            }
            current = err.source();
        }
        None
    }
}

/// 注入结果类型
pub type InjectionResult<T> = Result<T, InjectionError>;

/// 配置校验结果类型
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;
