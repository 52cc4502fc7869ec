//! # Injection Impl
//!
//! 注入元数据引擎的实现。
//!
//! ## 处理流程
//!
//! 1. 每种引用类型一个 [`Processor`]，先处理部署描述符中的声明
//! 2. 扫描注入类及其父类上的注解，合并到已有绑定或创建新绑定
//! 3. 解析所有绑定，非组件作用域的绑定与 [`SavedBindingTables`] 中的保存结果比较
//! 4. 绑定到命名空间并生成 [`ComponentInjectionMetadata`]
//!
//! ## 核心组件
//!
//! - [`InjectionEngine`] - 注册表与组件处理入口
//! - [`Binding`] - 一个已配置的引用
//! - [`ReferenceStrategy`] - 各引用类型的合并与解析策略
//! - [`InjectionTarget`] - 运行期注入到字段或方法
//! - [`JavaNamespace`] - 内存命名空间

pub mod binding;
pub mod collector;
pub mod context;
pub mod engine;
pub mod merge;
pub mod metadata;
pub mod namespace;
pub mod processor;
pub mod registry;
pub mod saved;
pub mod strategy;
pub mod target;

pub use binding::{Binding, BindingData, BindingObject, ResolvedObject, SimpleBindingKey};
pub use collector::{ClientInjectionTarget, TargetCollector, TargetMember, TargetSpec};
pub use context::{DeclaredMethodCache, ProcessorContext};
pub use engine::InjectionEngine;
pub use merge::{MergeSite, Merged};
pub use metadata::ComponentInjectionMetadata;
pub use namespace::JavaNamespace;
pub use processor::{BindingTable, Processor, ProcessorOutput, ProcessorState};
pub use registry::EngineRegistry;
pub use saved::{SavedBindingTables, SavedScopeKey};
pub use strategy::{
    ContainerContextStrategy, ReferenceStrategy, ResolveOutcome, ResourceDefinitionStrategy, ResourceStrategy,
};
pub use target::InjectionTarget;
