//! 组件命名空间配置
//!
//! 容器为每个组件构造一份配置，引擎只读取其中与注入相关的部分。

use crate::declarations::{ReferenceBindings, ResourceDefinitionDecl, ResourceRefDecl, ResourceXmlType};
use crate::member::{ClassDescriptor, ClassResolver};
use injection_common::{ComponentIdentity, ReferenceFlowKind};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// 组件命名空间配置
#[derive(Clone)]
pub struct ComponentNamespaceConfig {
    /// 组件标识
    pub identity: ComponentIdentity,
    /// 所属流程
    pub flow: ReferenceFlowKind,
    /// 类解析器，联邦客户端模块中可能不存在
    pub class_resolver: Option<Arc<dyn ClassResolver>>,
    /// 元数据是否完整（完整时不扫描注解）
    pub metadata_complete: bool,
    /// 是否开启应用配置检查
    pub check_application_configuration: bool,
    /// 需要扫描注解的注入类
    pub injection_classes: Vec<Arc<ClassDescriptor>>,
    /// 托管 Bean 类名称
    pub managed_bean_classes: HashSet<String>,
    /// 资源类引用声明
    pub resource_refs: Vec<ResourceRefDecl>,
    /// 资源定义声明
    pub resource_definitions: Vec<ResourceDefinitionDecl>,
    /// 绑定覆盖
    pub bindings: ReferenceBindings,
}

impl ComponentNamespaceConfig {
    /// 创建组件配置
    pub fn new(identity: ComponentIdentity) -> Self {
        Self {
            identity,
            flow: ReferenceFlowKind::default(),
            class_resolver: None,
            metadata_complete: false,
            check_application_configuration: false,
            injection_classes: Vec::new(),
            managed_bean_classes: HashSet::new(),
            resource_refs: Vec::new(),
            resource_definitions: Vec::new(),
            bindings: ReferenceBindings::default(),
        }
    }

    /// 设置所属流程
    pub const fn with_flow(mut self, flow: ReferenceFlowKind) -> Self {
        self.flow = flow;
        self
    }

    /// 设置类解析器
    pub fn with_class_resolver(mut self, resolver: Arc<dyn ClassResolver>) -> Self {
        self.class_resolver = Some(resolver);
        self
    }

    /// 设置元数据完整标志
    pub const fn with_metadata_complete(mut self, metadata_complete: bool) -> Self {
        self.metadata_complete = metadata_complete;
        self
    }

    /// 开启应用配置检查
    pub const fn with_check_application_configuration(mut self, check: bool) -> Self {
        self.check_application_configuration = check;
        self
    }

    /// 添加注入类
    pub fn with_injection_class(mut self, class: Arc<ClassDescriptor>) -> Self {
        self.injection_classes.push(class);
        self
    }

    /// 添加托管 Bean 类
    pub fn with_managed_bean_class(mut self, class_name: impl Into<String>) -> Self {
        self.managed_bean_classes.insert(class_name.into());
        self
    }

    /// 添加资源类引用声明
    pub fn with_resource_ref(mut self, declaration: ResourceRefDecl) -> Self {
        self.resource_refs.push(declaration);
        self
    }

    /// 添加资源定义声明
    pub fn with_resource_definition(mut self, declaration: ResourceDefinitionDecl) -> Self {
        self.resource_definitions.push(declaration);
        self
    }

    /// 设置绑定覆盖
    pub fn with_bindings(mut self, bindings: ReferenceBindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// 按元素类型筛选资源类引用声明
    pub fn resource_refs_of(&self, xml_type: ResourceXmlType) -> impl Iterator<Item = &ResourceRefDecl> {
        self.resource_refs.iter().filter(move |r| r.xml_type == xml_type)
    }
}

impl fmt::Debug for ComponentNamespaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentNamespaceConfig")
            .field("identity", &self.identity)
            .field("flow", &self.flow)
            .field("has_class_resolver", &self.class_resolver.is_some())
            .field("metadata_complete", &self.metadata_complete)
            .field("injection_classes", &self.injection_classes.len())
            .field("resource_refs", &self.resource_refs.len())
            .field("resource_definitions", &self.resource_definitions.len())
            .finish_non_exhaustive()
    }
}
