//! 组件注入元数据
//!
//! 组件处理完成后的只读结果：绑定、按类分组的注入目标以及延迟处理的客户端目标。

use crate::binding::Binding;
use crate::collector::ClientInjectionTarget;
use crate::processor::ProcessorOutput;
use crate::target::InjectionTarget;
use indexmap::IndexMap;
use injection_abstractions::{ClassDescriptor, InjectableInstance, InjectionTargetContext};
use injection_common::{ComponentIdentity, InjectionResult, NamespaceScope};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// 组件注入元数据
#[derive(Debug, Clone)]
pub struct ComponentInjectionMetadata {
    identity: ComponentIdentity,
    bindings: IndexMap<String, Arc<Binding>>,
    simple_bindings: Vec<Arc<Binding>>,
    targets: HashMap<String, Vec<InjectionTarget>>,
    deferred: Vec<(Arc<Binding>, ClientInjectionTarget)>,
    known_classes: HashSet<String>,
}

impl ComponentInjectionMetadata {
    pub(crate) fn new(identity: ComponentIdentity) -> Self {
        Self {
            identity,
            bindings: IndexMap::new(),
            simple_bindings: Vec::new(),
            targets: HashMap::new(),
            deferred: Vec::new(),
            known_classes: HashSet::new(),
        }
    }

    /// 组件标识
    pub const fn identity(&self) -> &ComponentIdentity {
        &self.identity
    }

    /// 按名称查找绑定，名称可以是归一化或完整形式
    pub fn binding(&self, name: &str) -> Option<&Arc<Binding>> {
        self.bindings.get(NamespaceScope::normalize(name))
    }

    /// 所有命名绑定，以归一化名称为键
    pub const fn bindings(&self) -> &IndexMap<String, Arc<Binding>> {
        &self.bindings
    }

    /// 无名称绑定
    pub fn simple_bindings(&self) -> &[Arc<Binding>] {
        &self.simple_bindings
    }

    /// 引用的完整名称
    pub fn reference_names(&self) -> Vec<String> {
        self.bindings.values().map(|b| b.jndi_name().to_string()).collect()
    }

    /// 没有绑定到命名空间的非组件作用域绑定，由容器按需绑定
    pub fn non_comp_bindings(&self) -> impl Iterator<Item = &Arc<Binding>> {
        self.bindings
            .values()
            .filter(|b| b.scope() != NamespaceScope::Comp && b.is_resolved() && !b.is_derived())
    }

    /// 延迟到客户端运行期处理的注入目标
    pub fn deferred_client_targets(&self) -> impl Iterator<Item = (&Arc<Binding>, &ClientInjectionTarget)> {
        self.deferred.iter().map(|(binding, target)| (binding, target))
    }

    /// 拥有注入目标的类数量
    pub fn target_class_count(&self) -> usize {
        self.targets.len()
    }

    /// 类及其父类的注入目标，父类的目标在前
    pub fn targets_for(&self, class: &ClassDescriptor) -> Vec<&InjectionTarget> {
        class
            .hierarchy()
            .into_iter()
            .rev()
            .filter_map(|c| self.targets.get(&c.name))
            .flatten()
            .collect()
    }

    /// 新类是否需要动态处理
    ///
    /// 类层次中有尚未处理且带有注解的类时需要。
    pub fn is_process_dynamic_needed(&self, classes: &[Arc<ClassDescriptor>]) -> bool {
        classes.iter().any(|class| {
            class.hierarchy().into_iter().any(|c| {
                !self.known_classes.contains(&c.name)
                    && (!c.annotations.is_empty()
                        || c.fields.iter().any(|f| !f.annotations.is_empty())
                        || c.methods.iter().any(|m| !m.annotations.is_empty()))
            })
        })
    }

    pub(crate) fn known_classes(&self) -> &HashSet<String> {
        &self.known_classes
    }

    /// 向实例注入类层次中的所有目标
    pub fn inject(
        &self,
        class: &ClassDescriptor,
        instance: &mut dyn InjectableInstance,
        context: &mut InjectionTargetContext,
    ) -> InjectionResult<()> {
        let targets = self.targets_for(class);
        debug!("向 {} 的实例注入 {} 个目标", class.name, targets.len());
        for target in targets {
            target.inject(instance, context)?;
        }
        Ok(())
    }

    /// 加入处理器输出
    ///
    /// 名称冲突已在发布前检查。由已完成绑定派生的绑定只贡献新目标。
    pub(crate) fn extend(&mut self, outputs: Vec<ProcessorOutput>, classes: &[Arc<ClassDescriptor>]) {
        for output in outputs {
            for (name, binding) in output.named {
                self.add_targets(&binding);
                if !binding.is_derived() {
                    self.bindings.insert(name, binding);
                }
            }
            for binding in output.simple {
                self.add_targets(&binding);
                self.simple_bindings.push(binding);
            }
        }
        for class in classes {
            for c in class.hierarchy() {
                self.known_classes.insert(c.name.clone());
            }
        }
    }

    fn add_targets(&mut self, binding: &Arc<Binding>) {
        for spec in binding.targets().targets() {
            self.targets
                .entry(spec.member.declaring_class().to_string())
                .or_default()
                .push(InjectionTarget::new(spec.clone(), binding.clone()));
        }
        for deferred in binding.targets().deferred() {
            self.deferred.push((binding.clone(), deferred.clone()));
        }
    }
}
