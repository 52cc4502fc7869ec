//! 注入引擎
//!
//! 引擎持有处理器、对象工厂与扩展点的注册表，驱动每个组件的元数据处理：
//! 部署描述符、注解扫描、解析、命名空间绑定，最后生成 [`ComponentInjectionMetadata`]。
//!
//! 注册表以写时复制的方式更新，组件处理开始时取一个快照，处理期间不持有锁。

use crate::binding::Binding;
use crate::context::{DeclaredMethodCache, ProcessorContext};
use crate::metadata::ComponentInjectionMetadata;
use crate::processor::{Processor, ProcessorOutput};
use crate::registry::EngineRegistry;
use crate::saved::SavedBindingTables;
use crate::strategy::{ContainerContextStrategy, ReferenceStrategy, ResourceDefinitionStrategy, ResourceStrategy};
use injection_abstractions::{
    Annotation, AnnotationOverride, ClassDescriptor, ComponentNamespaceConfig, Member, MetadataCreatedEvent,
    MetadataListener, NamingContext, ObjectFactory, ObjectFactoryInfo, OverrideReferenceFactory, ReferenceKind,
};
use injection_common::{ConfigurationError, EngineSettings, InjectionResult};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info};

/// 注入引擎
pub struct InjectionEngine {
    settings: EngineSettings,
    registry: RwLock<Arc<EngineRegistry>>,
    methods: DeclaredMethodCache,
}

impl InjectionEngine {
    /// 创建没有任何注册的引擎
    pub fn new(settings: EngineSettings) -> Self {
        let methods = DeclaredMethodCache::new(settings.declared_methods_cache_capacity);
        Self {
            settings,
            registry: RwLock::new(Arc::new(EngineRegistry::default())),
            methods,
        }
    }

    /// 创建注册了内置处理器的引擎
    pub fn with_default_processors(settings: EngineSettings) -> InjectionResult<Self> {
        let engine = Self::new(settings);
        engine.register_processor(Arc::new(ResourceStrategy::new()))?;
        engine.register_processor(Arc::new(ResourceDefinitionStrategy::new()))?;
        engine.register_processor(Arc::new(ContainerContextStrategy::new()))?;
        Ok(engine)
    }

    /// 引擎配置
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// 当前注册表快照
    pub fn registry(&self) -> Arc<EngineRegistry> {
        self.registry.read().clone()
    }

    fn update<T>(&self, change: impl FnOnce(&mut EngineRegistry) -> T) -> T {
        let mut guard = self.registry.write();
        let mut next = EngineRegistry::clone(&guard);
        let result = change(&mut next);
        *guard = Arc::new(next);
        result
    }

    /// 注册引用处理器，每种引用类型只能注册一次
    pub fn register_processor(&self, strategy: Arc<dyn ReferenceStrategy>) -> InjectionResult<()> {
        let kind = strategy.kind();
        self.update(|registry| registry.add_strategy(strategy))?;
        info!("注册 {} 处理器", kind);
        Ok(())
    }

    /// 按引用类型与对象类型注册对象工厂
    pub fn register_object_factory(
        &self,
        kind: ReferenceKind,
        type_name: &str,
        info: ObjectFactoryInfo,
    ) -> InjectionResult<()> {
        let factory_name = info.factory_name.clone();
        self.update(|registry| registry.add_object_factory(kind, type_name, info))?;
        info!("注册对象工厂: {} {} -> {}", kind, type_name, factory_name);
        Ok(())
    }

    /// 注销对象工厂
    pub fn unregister_object_factory(&self, kind: ReferenceKind, type_name: &str) -> bool {
        let removed = self.update(|registry| registry.remove_object_factory(kind, type_name));
        if removed {
            info!("注销对象工厂: {} {}", kind, type_name);
        }
        removed
    }

    /// 按名称注册对象工厂，供引用中的工厂名称查找
    pub fn register_named_factory(&self, name: &str, factory: Arc<dyn ObjectFactory>) -> InjectionResult<()> {
        self.update(|registry| registry.add_named_factory(name, factory))?;
        info!("注册命名对象工厂: {}", name);
        Ok(())
    }

    /// 注销命名对象工厂
    pub fn unregister_named_factory(&self, name: &str) -> bool {
        let removed = self.update(|registry| registry.remove_named_factory(name));
        if removed {
            info!("注销命名对象工厂: {}", name);
        }
        removed
    }

    /// 注册覆盖引用工厂，先注册的先调用
    pub fn register_override_reference_factory(&self, kind: ReferenceKind, factory: Arc<dyn OverrideReferenceFactory>) {
        self.update(|registry| registry.add_override_factory(kind, factory));
        info!("注册 {} 覆盖引用工厂", kind);
    }

    /// 注册注解覆盖处理器
    pub fn register_annotation_override(&self, kind: ReferenceKind, processor: Arc<dyn AnnotationOverride>) {
        self.update(|registry| registry.add_annotation_override(kind, processor));
        info!("注册 {} 注解覆盖处理器", kind);
    }

    /// 注册元数据监听器
    pub fn register_listener(&self, listener: Arc<dyn MetadataListener>) {
        self.update(|registry| registry.add_listener(listener));
        info!("注册元数据监听器");
    }

    /// 处理组件的注入元数据
    ///
    /// `saved` 在同一应用的组件之间共享，并发处理多个模块时由调用方同步。
    pub fn process_component(
        &self,
        config: &ComponentNamespaceConfig,
        naming: &dyn NamingContext,
        saved: &mut SavedBindingTables,
    ) -> InjectionResult<ComponentInjectionMetadata> {
        let identity = config.identity.clone();
        info!("开始处理组件 {} 的注入元数据", identity);

        let registry = self.registry();
        let mut context = ProcessorContext::new(registry.clone(), &self.settings, config, saved, &self.methods);
        let mut processors = processors(&registry);

        for processor in processors.values_mut() {
            processor.process_xml(&context)?;
        }

        if config.metadata_complete {
            debug!("组件 {} 的元数据完整, 不扫描注解", identity);
        } else {
            let mut visited = HashSet::new();
            for class in &config.injection_classes {
                scan(class, &mut visited, &mut processors, &context)?;
            }
        }

        let outputs = finish(&mut processors, naming, &mut context, None)?;
        let mut metadata = ComponentInjectionMetadata::new(identity);
        metadata.extend(outputs, &config.injection_classes);

        let event = MetadataCreatedEvent {
            identity: metadata.identity(),
            reference_names: metadata.reference_names(),
            target_class_count: metadata.target_class_count(),
        };
        for listener in registry.listeners() {
            listener.metadata_created(&event);
        }

        info!(
            "组件 {} 处理完成: {} 个引用, {} 个无名称绑定",
            metadata.identity(),
            metadata.bindings().len(),
            metadata.simple_bindings().len()
        );
        Ok(metadata)
    }

    /// 动态处理组件运行期新出现的类
    ///
    /// 已完成的引用不再解析，新类上的注解只能与之完全一致并贡献新的注入目标。
    pub fn process_dynamic(
        &self,
        metadata: &mut ComponentInjectionMetadata,
        config: &ComponentNamespaceConfig,
        classes: &[Arc<ClassDescriptor>],
        naming: &dyn NamingContext,
        saved: &mut SavedBindingTables,
    ) -> InjectionResult<()> {
        info!("动态处理组件 {} 的 {} 个类", metadata.identity(), classes.len());

        let registry = self.registry();
        let completed = metadata.bindings().clone();
        let mut context = ProcessorContext::new(registry.clone(), &self.settings, config, saved, &self.methods)
            .with_completed(&completed);
        let mut processors = processors(&registry);

        for processor in processors.values_mut() {
            processor.begin_dynamic()?;
        }
        let mut visited = metadata.known_classes().clone();
        for class in classes {
            scan(class, &mut visited, &mut processors, &context)?;
        }

        let outputs = finish(&mut processors, naming, &mut context, Some(&completed))?;
        metadata.extend(outputs, classes);
        Ok(())
    }

    /// 清空所有注册
    pub fn shutdown(&self) {
        *self.registry.write() = Arc::new(EngineRegistry::default());
        self.methods.invalidate_all();
        info!("注入引擎已关闭");
    }
}

impl std::fmt::Debug for InjectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectionEngine")
            .field("settings", &self.settings)
            .field("registry", &*self.registry.read())
            .finish_non_exhaustive()
    }
}

fn processors(registry: &EngineRegistry) -> BTreeMap<ReferenceKind, Processor> {
    registry
        .strategies()
        .map(|strategy| (strategy.kind(), Processor::new(strategy.clone())))
        .collect()
}

/// 扫描类层次上的注解，父类先于子类，每个类只扫描一次
fn scan(
    class: &ClassDescriptor,
    visited: &mut HashSet<String>,
    processors: &mut BTreeMap<ReferenceKind, Processor>,
    context: &ProcessorContext<'_>,
) -> InjectionResult<()> {
    for current in class.hierarchy().into_iter().rev() {
        if !visited.insert(current.name.clone()) {
            continue;
        }
        debug!("扫描类 {}", current.name);
        for annotation in &current.annotations {
            route(annotation, current, None, processors, context)?;
        }
        for field in &current.fields {
            let member = Member::Field(field.clone());
            for annotation in &field.annotations {
                route(annotation, current, Some(&member), processors, context)?;
            }
        }
        for method in &current.methods {
            let member = Member::Method(method.clone());
            for annotation in &method.annotations {
                route(annotation, current, Some(&member), processors, context)?;
            }
        }
    }
    Ok(())
}

/// 把注解交给对应的处理器，引用首次出现时先询问注解覆盖处理器
fn route(
    annotation: &Annotation,
    class: &ClassDescriptor,
    member: Option<&Member>,
    processors: &mut BTreeMap<ReferenceKind, Processor>,
    context: &ProcessorContext<'_>,
) -> InjectionResult<()> {
    let kind = annotation.kind();
    let Some(processor) = processors.get(&kind) else {
        debug!("没有 {} 处理器, 忽略 {} 上的注解", kind, class.name);
        return Ok(());
    };

    let translated = if processor.is_new_reference(annotation, class, member, context) {
        context
            .registry()
            .annotation_overrides(kind)
            .iter()
            .find_map(|processor| processor.translate(annotation, class, member))
    } else {
        None
    };
    let effective = translated.as_ref().unwrap_or(annotation);
    if translated.is_some() {
        debug!("注解覆盖处理器把 {} 转换为 {}", kind, effective.kind());
    }

    match processors.get_mut(&effective.kind()) {
        Some(processor) => processor.add_or_merge(effective, class, member, context),
        None => {
            debug!("没有 {} 处理器, 忽略转换后的注解", effective.kind());
            Ok(())
        }
    }
}

/// 名称冲突检查、解析、绑定并交出所有处理器的输出
/// 校验、解析并发布所有处理器的绑定
///
/// 名称冲突在任何绑定发布之前检查，动态处理时包括已完成的绑定。
fn finish(
    processors: &mut BTreeMap<ReferenceKind, Processor>,
    naming: &dyn NamingContext,
    context: &mut ProcessorContext<'_>,
    completed: Option<&IndexMap<String, Arc<Binding>>>,
) -> InjectionResult<Vec<ProcessorOutput>> {
    let mut owners: HashMap<&str, ReferenceKind> = completed
        .into_iter()
        .flatten()
        .map(|(name, binding)| (name.as_str(), binding.kind()))
        .collect();
    for (kind, processor) in processors.iter() {
        for name in processor.table().names() {
            match owners.get(name) {
                Some(first) if first != kind => {
                    let problem = ConfigurationError::DuplicateReference {
                        identity: context.identity().clone(),
                        reference: name.to_string(),
                        first: first.to_string(),
                        second: kind.to_string(),
                    };
                    error!("{}", problem);
                    return Err(problem.into());
                }
                Some(_) => {}
                None => {
                    owners.insert(name, *kind);
                }
            }
        }
    }

    let mut missing = Vec::new();
    for processor in processors.values_mut() {
        missing.extend(processor.resolve(context)?);
    }
    if !missing.is_empty() {
        let problem = ConfigurationError::MissingBindings {
            identity: context.identity().clone(),
            references: missing,
        };
        error!("{}", problem);
        return Err(problem.into());
    }

    for processor in processors.values_mut() {
        processor.bind_namespace(naming, context)?;
    }

    let processors = std::mem::take(processors);
    processors.into_values().map(Processor::complete).collect()
}
