//! 注解数据
//!
//! 注解扫描机制由容器提供，引擎只接收扫描得到的注解数据。

use injection_common::TypeDescriptor;
use std::fmt;

/// 引用类型
///
/// 每种引用类型对应一个处理器与一组合并/解析策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReferenceKind {
    /// `@Resource`、env-entry、resource-ref、resource-env-ref、message-destination-ref
    Resource,
    /// `@DataSourceDefinition` 类资源定义
    ResourceDefinition,
    /// 无名称的容器上下文注入
    ContainerContext,
}

impl ReferenceKind {
    /// 注解名称
    pub const fn annotation_name(self) -> &'static str {
        match self {
            Self::Resource => "@Resource",
            Self::ResourceDefinition => "@DataSourceDefinition",
            Self::ContainerContext => "@Context",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.annotation_name())
    }
}

/// 认证类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthenticationType {
    /// 由容器认证
    #[default]
    Container,
    /// 由应用认证
    Application,
}

impl fmt::Display for AuthenticationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container => f.write_str("CONTAINER"),
            Self::Application => f.write_str("APPLICATION"),
        }
    }
}

/// `@Resource` 注解
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceAnnotation {
    /// 引用名称，空字符串表示使用默认名称
    pub name: String,
    /// 声明的资源类型，`None` 表示使用成员类型
    pub resource_type: Option<TypeDescriptor>,
    /// 认证类型
    pub authentication_type: AuthenticationType,
    /// 是否可共享
    pub shareable: bool,
    /// 映射名称
    pub mapped_name: String,
    /// 描述
    pub description: String,
    /// 间接查找名称
    pub lookup: String,
}

impl Default for ResourceAnnotation {
    fn default() -> Self {
        Self {
            name: String::new(),
            resource_type: None,
            authentication_type: AuthenticationType::Container,
            shareable: true,
            mapped_name: String::new(),
            description: String::new(),
            lookup: String::new(),
        }
    }
}

impl ResourceAnnotation {
    /// 创建指定名称的注解
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// 设置资源类型
    pub fn with_type(mut self, resource_type: TypeDescriptor) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    /// 设置间接查找名称
    pub fn with_lookup(mut self, lookup: impl Into<String>) -> Self {
        self.lookup = lookup.into();
        self
    }

    /// 设置认证类型
    pub const fn with_authentication_type(mut self, authentication_type: AuthenticationType) -> Self {
        self.authentication_type = authentication_type;
        self
    }

    /// 设置是否可共享
    pub const fn with_shareable(mut self, shareable: bool) -> Self {
        self.shareable = shareable;
        self
    }

    /// 设置映射名称
    pub fn with_mapped_name(mut self, mapped_name: impl Into<String>) -> Self {
        self.mapped_name = mapped_name.into();
        self
    }
}

/// `@DataSourceDefinition` 注解
#[derive(Clone, PartialEq)]
pub struct ResourceDefinitionAnnotation {
    pub name: String,
    pub class_name: String,
    pub description: String,
    pub url: String,
    pub user: String,
    pub password: String,
    pub database_name: String,
    pub server_name: String,
    pub port_number: i32,
    pub isolation_level: i32,
    pub transactional: bool,
    pub initial_pool_size: i32,
    pub max_pool_size: i32,
    pub min_pool_size: i32,
    /// `name=value` 形式的属性
    pub properties: Vec<String>,
}

impl Default for ResourceDefinitionAnnotation {
    fn default() -> Self {
        Self {
            name: String::new(),
            class_name: String::new(),
            description: String::new(),
            url: String::new(),
            user: String::new(),
            password: String::new(),
            database_name: String::new(),
            server_name: String::new(),
            port_number: -1,
            isolation_level: -1,
            transactional: true,
            initial_pool_size: -1,
            max_pool_size: -1,
            min_pool_size: -1,
            properties: Vec::new(),
        }
    }
}

impl ResourceDefinitionAnnotation {
    /// 创建资源定义注解
    pub fn new(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            ..Self::default()
        }
    }

    /// 设置连接地址
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// 添加 `name=value` 属性
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.properties.push(property.into());
        self
    }
}

impl fmt::Debug for ResourceDefinitionAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDefinitionAnnotation")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"********")
            .field("database_name", &self.database_name)
            .field("server_name", &self.server_name)
            .field("port_number", &self.port_number)
            .field("isolation_level", &self.isolation_level)
            .field("transactional", &self.transactional)
            .field("initial_pool_size", &self.initial_pool_size)
            .field("max_pool_size", &self.max_pool_size)
            .field("min_pool_size", &self.min_pool_size)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// 容器上下文注解
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextAnnotation {
    /// 上下文类型，`None` 表示使用成员类型
    pub context_type: Option<TypeDescriptor>,
}

/// 扫描得到的注解
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Resource(ResourceAnnotation),
    ResourceDefinition(ResourceDefinitionAnnotation),
    Context(ContextAnnotation),
}

impl Annotation {
    /// 注解对应的引用类型
    pub const fn kind(&self) -> ReferenceKind {
        match self {
            Self::Resource(_) => ReferenceKind::Resource,
            Self::ResourceDefinition(_) => ReferenceKind::ResourceDefinition,
            Self::Context(_) => ReferenceKind::ContainerContext,
        }
    }

    /// 注解上显式声明的名称
    pub fn declared_name(&self) -> &str {
        match self {
            Self::Resource(resource) => &resource.name,
            Self::ResourceDefinition(definition) => &definition.name,
            Self::Context(_) => "",
        }
    }
}

impl From<ResourceAnnotation> for Annotation {
    fn from(annotation: ResourceAnnotation) -> Self {
        Self::Resource(annotation)
    }
}

impl From<ResourceDefinitionAnnotation> for Annotation {
    fn from(annotation: ResourceDefinitionAnnotation) -> Self {
        Self::ResourceDefinition(annotation)
    }
}

impl From<ContextAnnotation> for Annotation {
    fn from(annotation: ContextAnnotation) -> Self {
        Self::Context(annotation)
    }
}
