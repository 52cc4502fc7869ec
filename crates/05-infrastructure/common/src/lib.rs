//! # Injection Common
//!
//! 注入元数据引擎的公共类型。
//!
//! ## 核心组件
//!
//! - [`NamespaceScope`] - 命名空间作用域与名称归一化
//! - [`TypeDescriptor`] - 与反射无关的类型描述符及兼容性判定
//! - [`ComponentIdentity`] - 应用/模块/组件标识
//! - [`EngineSettings`] - 引擎配置与校验策略
//! - [`ConfigurationError`] / [`InjectionError`] - 错误分类
//!
//! ## 设计原则
//!
//! - 纯数据类型，不依赖任何运行时状态
//! - 所有配置错误都携带完整的组件标识

pub mod configuration;
pub mod errors;
pub mod metadata;
pub mod scope;
pub mod types;

pub use configuration::*;
pub use errors::*;
pub use metadata::*;
pub use scope::*;
pub use types::*;
