//! 元数据定义
//!
//! 组件标识与组件所属的处理流程

use serde::{Deserialize, Serialize};
use std::fmt;

/// 组件标识
///
/// 应用、模块、组件三级名称，所有配置错误都携带它。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentIdentity {
    /// 应用名称
    pub application: String,
    /// 模块名称
    pub module: String,
    /// 组件名称
    pub component: String,
}

impl ComponentIdentity {
    /// 创建新的组件标识
    pub fn new(
        application: impl Into<String>,
        module: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        Self {
            application: application.into(),
            module: module.into(),
            component: component.into(),
        }
    }
}

impl fmt::Display for ComponentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "应用 {} 的模块 {} 中的组件 {}",
            self.application, self.module, self.component
        )
    }
}

/// 组件所属的处理流程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceFlowKind {
    /// EJB 容器
    Ejb,
    /// Web 容器
    #[default]
    Web,
    /// 客户端容器，注入目标必须为静态成员
    Client,
    /// 托管 Bean
    ManagedBean,
    /// 混合模块
    Hybrid,
}

impl ReferenceFlowKind {
    /// 是否为客户端流程
    pub const fn is_client(self) -> bool {
        matches!(self, Self::Client)
    }
}
