//! 部署描述符声明
//!
//! 描述符解析由容器完成，这里只定义解析结果。

use crate::annotation::AuthenticationType;
use std::collections::HashMap;
use std::fmt;

/// 部署描述符中的注入目标
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InjectionTargetDecl {
    /// 目标类名称
    pub class_name: String,
    /// 目标属性名称
    pub target_name: String,
}

impl InjectionTargetDecl {
    /// 创建注入目标声明
    pub fn new(class_name: impl Into<String>, target_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            target_name: target_name.into(),
        }
    }
}

/// 资源引用在部署描述符中的元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceXmlType {
    EnvEntry,
    ResourceRef,
    ResourceEnvRef,
    MessageDestinationRef,
}

impl fmt::Display for ResourceXmlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EnvEntry => "env-entry",
            Self::ResourceRef => "resource-ref",
            Self::ResourceEnvRef => "resource-env-ref",
            Self::MessageDestinationRef => "message-destination-ref",
        })
    }
}

/// 资源类引用声明
///
/// env-entry、resource-ref、resource-env-ref、message-destination-ref
/// 共用同一结构，未使用的字段保持 `None`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRefDecl {
    /// 元素类型
    pub xml_type: ResourceXmlType,
    /// 引用名称
    pub name: String,
    /// 声明的类型名称
    pub type_name: Option<String>,
    /// env-entry 的值
    pub value: Option<String>,
    /// 间接查找名称
    pub lookup: Option<String>,
    /// 认证类型（resource-ref）
    pub authentication_type: Option<AuthenticationType>,
    /// 是否可共享（resource-ref）
    pub shareable: Option<bool>,
    /// 消息目的地链接（message-destination-ref）
    pub link: Option<String>,
    /// 映射名称
    pub mapped_name: Option<String>,
    /// 描述
    pub description: Option<String>,
    /// 注入目标
    pub targets: Vec<InjectionTargetDecl>,
}

impl ResourceRefDecl {
    fn new(xml_type: ResourceXmlType, name: impl Into<String>) -> Self {
        Self {
            xml_type,
            name: name.into(),
            type_name: None,
            value: None,
            lookup: None,
            authentication_type: None,
            shareable: None,
            link: None,
            mapped_name: None,
            description: None,
            targets: Vec::new(),
        }
    }

    /// 创建 env-entry 声明
    pub fn env_entry(name: impl Into<String>) -> Self {
        Self::new(ResourceXmlType::EnvEntry, name)
    }

    /// 创建 resource-ref 声明
    pub fn resource_ref(name: impl Into<String>) -> Self {
        Self::new(ResourceXmlType::ResourceRef, name)
    }

    /// 创建 resource-env-ref 声明
    pub fn resource_env_ref(name: impl Into<String>) -> Self {
        Self::new(ResourceXmlType::ResourceEnvRef, name)
    }

    /// 创建 message-destination-ref 声明
    pub fn message_destination_ref(name: impl Into<String>) -> Self {
        Self::new(ResourceXmlType::MessageDestinationRef, name)
    }

    /// 设置类型名称
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// 设置 env-entry 的值
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// 设置间接查找名称
    pub fn with_lookup(mut self, lookup: impl Into<String>) -> Self {
        self.lookup = Some(lookup.into());
        self
    }

    /// 设置认证类型
    pub const fn with_authentication_type(mut self, authentication_type: AuthenticationType) -> Self {
        self.authentication_type = Some(authentication_type);
        self
    }

    /// 设置是否可共享
    pub const fn with_shareable(mut self, shareable: bool) -> Self {
        self.shareable = Some(shareable);
        self
    }

    /// 设置消息目的地链接
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// 添加注入目标
    pub fn with_target(mut self, class_name: impl Into<String>, target_name: impl Into<String>) -> Self {
        self.targets.push(InjectionTargetDecl::new(class_name, target_name));
        self
    }
}

/// 资源定义声明（data-source）
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResourceDefinitionDecl {
    pub name: String,
    pub class_name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database_name: Option<String>,
    pub server_name: Option<String>,
    pub port_number: Option<i32>,
    pub isolation_level: Option<i32>,
    pub transactional: Option<bool>,
    pub initial_pool_size: Option<i32>,
    pub max_pool_size: Option<i32>,
    pub min_pool_size: Option<i32>,
    /// 属性名称与值
    pub properties: Vec<(String, String)>,
}

impl ResourceDefinitionDecl {
    /// 创建资源定义声明
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// 设置实现类名称
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// 设置连接地址
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// 设置最大连接数
    pub const fn with_max_pool_size(mut self, max_pool_size: i32) -> Self {
        self.max_pool_size = Some(max_pool_size);
        self
    }

    /// 设置是否参与事务
    pub const fn with_transactional(mut self, transactional: bool) -> Self {
        self.transactional = Some(transactional);
        self
    }

    /// 添加属性
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }
}

impl fmt::Debug for ResourceDefinitionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDefinitionDecl")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("transactional", &self.transactional)
            .field("max_pool_size", &self.max_pool_size)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// 部署者提供的绑定覆盖
///
/// 键为引用名称（归一化或完整形式）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceBindings {
    /// resource-ref 绑定名称
    pub resource_ref: HashMap<String, String>,
    /// resource-env-ref 绑定名称
    pub resource_env_ref: HashMap<String, String>,
    /// message-destination-ref 绑定名称
    pub message_destination_ref: HashMap<String, String>,
    /// env-entry 绑定名称（间接查找）
    pub env_entry_bindings: HashMap<String, String>,
    /// env-entry 值覆盖
    pub env_entry_values: HashMap<String, String>,
}

impl ReferenceBindings {
    /// 按元素类型选择绑定表
    pub fn for_xml_type(&self, xml_type: ResourceXmlType) -> &HashMap<String, String> {
        match xml_type {
            ResourceXmlType::EnvEntry => &self.env_entry_bindings,
            ResourceXmlType::ResourceRef => &self.resource_ref,
            ResourceXmlType::ResourceEnvRef => &self.resource_env_ref,
            ResourceXmlType::MessageDestinationRef => &self.message_destination_ref,
        }
    }

    /// 先按归一化名称、再按完整名称查找
    pub fn find<'a>(
        table: &'a HashMap<String, String>,
        normalized: &str,
        full: &str,
    ) -> Option<&'a String> {
        table.get(normalized).or_else(|| table.get(full))
    }
}
