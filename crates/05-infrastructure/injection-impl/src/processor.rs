//! 引用处理器
//!
//! 每个组件每种引用类型一个处理器。处理器持有绑定表并驱动
//! 部署描述符处理、注解扫描、解析与命名空间绑定四个阶段，
//! 与具体引用类型相关的部分交给 [`ReferenceStrategy`]。

use crate::binding::{Binding, SimpleBindingKey};
use crate::context::ProcessorContext;
use crate::strategy::{ReferenceStrategy, ResolveOutcome};
use indexmap::IndexMap;
use injection_abstractions::{
    Annotation, ClassDescriptor, Member, NamespaceEntry, NamingContext, OverrideRequest, ReferenceKind,
};
use injection_common::{ConfigurationError, InjectionError, InjectionResult, NamespaceScope};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// 绑定表
///
/// 命名绑定以归一化名称为键，无名称绑定以 (类, 属性) 为键，均保持插入顺序。
#[derive(Debug, Default)]
pub struct BindingTable {
    named: IndexMap<String, Binding>,
    simple: IndexMap<SimpleBindingKey, Binding>,
}

impl BindingTable {
    /// 按名称查找，名称可以是归一化或完整形式
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.named.get(NamespaceScope::normalize(name))
    }

    /// 按名称查找可变绑定
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.named.get_mut(NamespaceScope::normalize(name))
    }

    /// 按名称查找，不存在时创建
    pub fn get_or_insert_with(&mut self, name: &str, create: impl FnOnce() -> Binding) -> &mut Binding {
        self.named
            .entry(NamespaceScope::normalize(name).to_string())
            .or_insert_with(create)
    }

    /// 查找无名称绑定
    pub fn simple_mut(&mut self, key: &SimpleBindingKey) -> Option<&mut Binding> {
        self.simple.get_mut(key)
    }

    /// 插入绑定，返回表中的绑定
    pub fn insert(&mut self, binding: Binding) -> &mut Binding {
        match binding.simple_key().cloned() {
            Some(key) => {
                let (index, _) = self.simple.insert_full(key, binding);
                &mut self.simple[index]
            }
            None => {
                let (index, _) = self.named.insert_full(binding.name().to_string(), binding);
                &mut self.named[index]
            }
        }
    }

    /// 是否包含该名称
    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(NamespaceScope::normalize(name))
    }

    /// 绑定总数
    pub fn len(&self) -> usize {
        self.named.len() + self.simple.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.simple.is_empty()
    }

    /// 命名绑定的归一化名称
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Binding> {
        self.named.values_mut().chain(self.simple.values_mut())
    }
}

/// 处理器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// 刚创建
    Init,
    /// 已处理部署描述符，正在扫描注解
    Scanning,
    /// 已解析
    Resolved,
    /// 已绑定到命名空间
    Bound,
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Scanning => "scanning",
            Self::Resolved => "resolved",
            Self::Bound => "bound",
        })
    }
}

/// 处理完成后交给组件元数据的绑定
#[derive(Debug, Default)]
pub struct ProcessorOutput {
    /// 命名绑定
    pub named: IndexMap<String, Arc<Binding>>,
    /// 无名称绑定
    pub simple: Vec<Arc<Binding>>,
}

/// 引用处理器
pub struct Processor {
    strategy: Arc<dyn ReferenceStrategy>,
    state: ProcessorState,
    table: BindingTable,
    output: ProcessorOutput,
}

impl Processor {
    /// 创建处理器
    pub fn new(strategy: Arc<dyn ReferenceStrategy>) -> Self {
        Self {
            strategy,
            state: ProcessorState::Init,
            table: BindingTable::default(),
            output: ProcessorOutput::default(),
        }
    }

    /// 处理的引用类型
    pub fn kind(&self) -> ReferenceKind {
        self.strategy.kind()
    }

    /// 当前状态
    pub const fn state(&self) -> ProcessorState {
        self.state
    }

    /// 绑定表
    pub const fn table(&self) -> &BindingTable {
        &self.table
    }

    fn transition(&mut self, from: ProcessorState, to: ProcessorState) -> InjectionResult<()> {
        if self.state != from {
            return Err(InjectionError::illegal_state(format!(
                "{} 处理器状态为 {}, 无法进入 {}",
                self.kind(),
                self.state,
                to
            )));
        }
        self.state = to;
        Ok(())
    }

    /// 处理部署描述符中的声明
    pub fn process_xml(&mut self, context: &ProcessorContext<'_>) -> InjectionResult<()> {
        self.transition(ProcessorState::Init, ProcessorState::Scanning)?;
        self.strategy.process_xml(&mut self.table, context)?;
        debug!("{} 处理器从部署描述符得到 {} 个绑定", self.kind(), self.table.len());
        Ok(())
    }

    /// 跳过部署描述符直接扫描注解（动态处理）
    pub fn begin_dynamic(&mut self) -> InjectionResult<()> {
        self.transition(ProcessorState::Init, ProcessorState::Scanning)
    }

    /// 注解对应的引用名称，类级空名称与无名称绑定返回 `None`
    fn reference_name(&self, annotation: &Annotation, class: &ClassDescriptor, member: Option<&Member>) -> Option<String> {
        let declared = annotation.declared_name().trim();
        if !declared.is_empty() {
            return Some(declared.to_string());
        }
        member.and_then(|member| self.strategy.default_name(class, member))
    }

    /// 注解是否首次引入一个命名引用
    ///
    /// 注解覆盖处理器只在引用名称首次出现时调用。
    pub fn is_new_reference(
        &self,
        annotation: &Annotation,
        class: &ClassDescriptor,
        member: Option<&Member>,
        context: &ProcessorContext<'_>,
    ) -> bool {
        self.reference_name(annotation, class, member).is_some_and(|name| {
            let normalized = NamespaceScope::normalize(&name);
            !self.table.contains(normalized) && context.completed(normalized).is_none()
        })
    }

    /// 添加或合并注解声明的绑定
    pub fn add_or_merge(
        &mut self,
        annotation: &Annotation,
        class: &ClassDescriptor,
        member: Option<&Member>,
        context: &ProcessorContext<'_>,
    ) -> InjectionResult<()> {
        if self.state != ProcessorState::Scanning {
            return Err(InjectionError::illegal_state(format!(
                "{} 处理器状态为 {}, 无法合并注解",
                self.kind(),
                self.state
            )));
        }
        let strategy = self.strategy.clone();

        let Some(name) = self.reference_name(annotation, class, member) else {
            return match member {
                None => {
                    strategy.validate_empty_name(annotation, class, context)?;
                    Ok(())
                }
                Some(member) => self.add_simple(annotation, member, context),
            };
        };

        let normalized = NamespaceScope::normalize(&name).to_string();
        let binding = if let Some(binding) = self.table.get_mut(&normalized) {
            debug!("合并 {} 到引用 {}", annotation.kind(), binding.jndi_name());
            strategy.merge(binding, annotation, class, member, context)?;
            binding
        } else if let Some(completed) = context.completed(&normalized) {
            if completed.kind() != strategy.kind() {
                let problem = ConfigurationError::DuplicateReference {
                    identity: context.identity().clone(),
                    reference: completed.jndi_name().to_string(),
                    first: completed.kind().to_string(),
                    second: strategy.kind().to_string(),
                };
                error!("{}", problem);
                return Err(problem.into());
            }
            let mut derived = Binding::derive_from_completed(completed);
            debug!("由已完成的引用 {} 派生绑定", derived.jndi_name());
            strategy.merge(&mut derived, annotation, class, member, context)?;
            self.table.insert(derived)
        } else {
            let created = strategy.create_binding(annotation, &name, class, member, context)?;
            debug!("创建 {} 引用 {}", strategy.kind(), created.jndi_name());
            self.table.insert(created)
        };

        if let Some(member) = member {
            binding.add_member_target(member, strategy.supports_initializer_methods(), context)?;
        }
        Ok(())
    }

    fn add_simple(&mut self, annotation: &Annotation, member: &Member, context: &ProcessorContext<'_>) -> InjectionResult<()> {
        let allow_initializer = self.strategy.supports_initializer_methods();
        let key = SimpleBindingKey {
            class_name: member.declaring_class().to_string(),
            property: member.property_name(),
        };
        if let Some(existing) = self.table.simple_mut(&key) {
            existing.add_member_target(member, allow_initializer, context)?;
            return Ok(());
        }
        let created = self.strategy.create_simple_binding(annotation, key, member, context)?;
        debug!("创建无名称 {} 绑定 {}", self.kind(), created.jndi_name());
        self.table
            .insert(created)
            .add_member_target(member, allow_initializer, context)?;
        Ok(())
    }

    /// 解析所有尚未解析的绑定
    ///
    /// 返回无法解析的引用名称。非组件作用域的绑定与跨组件保存的绑定合并。
    pub fn resolve(&mut self, context: &mut ProcessorContext<'_>) -> InjectionResult<Vec<String>> {
        self.transition(ProcessorState::Scanning, ProcessorState::Resolved)?;
        let strategy = self.strategy.clone();
        let registry = context.registry().clone();
        let kind = strategy.kind();
        let mut missing = Vec::new();

        for binding in self.table.iter_mut() {
            if binding.is_resolve_attempted() {
                continue;
            }
            binding.resolve_jndi_name()?;

            let request = OverrideRequest {
                identity: binding.identity(),
                kind,
                reference_name: binding.jndi_name(),
                type_name: binding.injection_type_name(),
                annotation: binding.source_annotation(),
            };
            let overridden = registry
                .override_factories(kind)
                .iter()
                .find_map(|factory| factory.create_reference(&request));

            let outcome = match overridden {
                Some(reference) => {
                    debug!("覆盖引用工厂接管引用 {}", binding.jndi_name());
                    binding.bind_reference(reference, context);
                    ResolveOutcome::Resolved
                }
                None => strategy.resolve(binding, context)?,
            };
            binding.mark_resolve_attempted();

            match outcome {
                ResolveOutcome::Missing => missing.push(binding.jndi_name().to_string()),
                ResolveOutcome::Resolved => {
                    if binding.scope() != NamespaceScope::Comp && !binding.is_simple() && !binding.is_derived() {
                        context.saved_mut().merge_or_adopt(binding, strategy.as_ref())?;
                    }
                }
            }
        }
        Ok(missing)
    }

    /// 完成元数据处理并把绑定写入命名空间
    ///
    /// 组件作用域的绑定总是绑定；其他作用域只在开启立即绑定且当前组件
    /// 首个解析该名称时绑定。派生绑定与空绑定对象不绑定。
    pub fn bind_namespace(&mut self, naming: &dyn NamingContext, context: &ProcessorContext<'_>) -> InjectionResult<()> {
        self.transition(ProcessorState::Resolved, ProcessorState::Bound)?;
        let eager = context.settings().bind_non_comp_eagerly;
        let table = std::mem::take(&mut self.table);

        for (name, mut binding) in table.named {
            binding.metadata_processing_complete();
            let binding = Arc::new(binding);
            let bindable = !binding.is_derived()
                && binding.is_resolved()
                && (binding.scope() == NamespaceScope::Comp || (eager && binding.is_first_in_scope()));
            if bindable {
                let relative = binding.namespace_relative_name();
                if binding.scope() != NamespaceScope::Comp && naming.is_bound(binding.scope(), &relative) {
                    debug!("{} 已经绑定, 跳过", binding.jndi_name());
                } else {
                    debug!("绑定 {} 到 {}/{}", binding.jndi_name(), binding.scope(), relative);
                    naming.bind(binding.scope(), &relative, binding.clone() as Arc<dyn NamespaceEntry>)?;
                }
            } else if binding.has_null_object() {
                debug!("引用 {} 没有绑定对象, 不绑定到命名空间", binding.jndi_name());
            }
            self.output.named.insert(name, binding);
        }
        for (_, mut binding) in table.simple {
            binding.metadata_processing_complete();
            self.output.simple.push(Arc::new(binding));
        }
        Ok(())
    }

    /// 处理完成，交出绑定
    pub fn complete(self) -> InjectionResult<ProcessorOutput> {
        if self.state != ProcessorState::Bound {
            return Err(InjectionError::illegal_state(format!(
                "{} 处理器状态为 {}, 尚未绑定",
                self.kind(),
                self.state
            )));
        }
        Ok(self.output)
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("kind", &self.kind())
            .field("state", &self.state)
            .field("bindings", &self.table.len())
            .finish_non_exhaustive()
    }
}
