//! # Injection Abstractions
//!
//! 注入元数据引擎与容器之间的边界：容器提供的数据与容器实现的接口。
//!
//! ## 核心接口
//!
//! - [`ClassResolver`] - 按名称加载类描述符
//! - [`ObjectFactory`] - 根据引用创建对象
//! - [`OverrideReferenceFactory`] / [`AnnotationOverride`] - 扩展点
//! - [`NamingContext`] - 命名空间绑定
//! - [`InjectableInstance`] - 字段赋值与方法调用
//! - [`MetadataListener`] - 元数据创建通知
//!
//! ## 声明数据
//!
//! - [`Annotation`] - 扫描得到的注解
//! - [`ResourceRefDecl`] / [`ResourceDefinitionDecl`] - 部署描述符声明
//! - [`ComponentNamespaceConfig`] - 组件配置

pub mod annotation;
pub mod context;
pub mod declarations;
pub mod factory;
pub mod instance;
pub mod listener;
pub mod member;
pub mod namespace_config;
pub mod naming;

pub use annotation::*;
pub use context::*;
pub use declarations::*;
pub use factory::*;
pub use instance::*;
pub use listener::*;
pub use member::*;
pub use namespace_config::*;
pub use naming::*;
