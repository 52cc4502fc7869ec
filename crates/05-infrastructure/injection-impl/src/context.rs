//! 处理器上下文
//!
//! 一次组件处理期间所有处理器共享的只读环境，以及跨组件保存的绑定表。

use crate::binding::Binding;
use crate::collector::TargetEnv;
use crate::registry::EngineRegistry;
use crate::saved::SavedBindingTables;
use indexmap::IndexMap;
use injection_abstractions::{ClassDescriptor, ComponentNamespaceConfig, MethodDescriptor};
use injection_common::{
    ComponentIdentity, ConfigurationError, ConfigurationResult, EngineSettings, TypeDescriptor, ValidationPolicy,
};
use moka::sync::Cache;
use std::fmt;
use std::sync::Arc;

/// 缓存键
///
/// 类解析器属于某个应用的某个模块，同名类在不同模块中可以有不同的成员。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MethodCacheKey {
    application: String,
    module: String,
    class_name: String,
    client: bool,
}

/// 声明的 set 方法缓存
///
/// 以 (应用, 模块, 类名称, 是否客户端流程) 为键，部署描述符目标查找时复用。
#[derive(Clone)]
pub struct DeclaredMethodCache {
    cache: Cache<MethodCacheKey, Arc<Vec<Arc<MethodDescriptor>>>>,
}

impl DeclaredMethodCache {
    /// 创建指定容量的缓存
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::new(capacity),
        }
    }

    /// 获取类中声明的 set 方法
    pub fn declared_set_methods(
        &self,
        identity: &ComponentIdentity,
        class: &ClassDescriptor,
        client: bool,
    ) -> Arc<Vec<Arc<MethodDescriptor>>> {
        let key = MethodCacheKey {
            application: identity.application.clone(),
            module: identity.module.clone(),
            class_name: class.name.clone(),
            client,
        };
        self.cache.get_with(key, || Arc::new(class.declared_set_methods(client)))
    }

    /// 清空缓存
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

impl fmt::Debug for DeclaredMethodCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclaredMethodCache")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

/// 处理器上下文
pub struct ProcessorContext<'a> {
    registry: Arc<EngineRegistry>,
    settings: &'a EngineSettings,
    policy: ValidationPolicy,
    config: &'a ComponentNamespaceConfig,
    saved: &'a mut SavedBindingTables,
    completed: Option<&'a IndexMap<String, Arc<Binding>>>,
    methods: &'a DeclaredMethodCache,
}

impl<'a> ProcessorContext<'a> {
    pub(crate) fn new(
        registry: Arc<EngineRegistry>,
        settings: &'a EngineSettings,
        config: &'a ComponentNamespaceConfig,
        saved: &'a mut SavedBindingTables,
        methods: &'a DeclaredMethodCache,
    ) -> Self {
        Self {
            registry,
            settings,
            policy: settings.validation_policy(config.check_application_configuration),
            config,
            saved,
            completed: None,
            methods,
        }
    }

    /// 动态处理时提供已完成的绑定
    pub(crate) fn with_completed(mut self, completed: &'a IndexMap<String, Arc<Binding>>) -> Self {
        self.completed = Some(completed);
        self
    }

    /// 注册表快照
    pub fn registry(&self) -> &Arc<EngineRegistry> {
        &self.registry
    }

    /// 引擎配置
    pub const fn settings(&self) -> &EngineSettings {
        self.settings
    }

    /// 校验策略
    pub const fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// 组件配置
    pub const fn config(&self) -> &ComponentNamespaceConfig {
        self.config
    }

    /// 组件标识
    pub const fn identity(&self) -> &ComponentIdentity {
        &self.config.identity
    }

    /// 已完成的绑定
    pub fn completed(&self, name: &str) -> Option<&Arc<Binding>> {
        self.completed.and_then(|completed| completed.get(name))
    }

    /// 是否处于动态处理
    pub const fn is_dynamic(&self) -> bool {
        self.completed.is_some()
    }

    pub(crate) fn saved_mut(&mut self) -> &mut SavedBindingTables {
        self.saved
    }

    /// 按类型名称加载类型描述符
    ///
    /// 类解析器能找到该类时携带父类与接口信息，否则只有名称。
    /// 链接失败按校验策略报告，未失败时同样退回只有名称的描述符。
    pub fn type_descriptor(&self, type_name: &str) -> ConfigurationResult<TypeDescriptor> {
        let Some(resolver) = self.config.class_resolver.as_ref() else {
            return Ok(TypeDescriptor::named(type_name));
        };
        match resolver.load_class(type_name) {
            Ok(Some(class)) => Ok(class.type_descriptor()),
            Ok(None) => Ok(TypeDescriptor::named(type_name)),
            Err(failure) => {
                self.policy.report(ConfigurationError::ClassLinkage {
                    identity: self.identity().clone(),
                    class_name: failure.class_name,
                    message: failure.message,
                })?;
                Ok(TypeDescriptor::named(type_name))
            }
        }
    }

    pub(crate) fn target_env<'b>(
        &'b self,
        identity: &'b ComponentIdentity,
        reference: &'b str,
        injection_type: Option<&'b TypeDescriptor>,
    ) -> TargetEnv<'b> {
        TargetEnv {
            identity,
            reference,
            injection_type,
            flow: self.config.flow,
            policy: self.policy,
            class_resolver: self.config.class_resolver.as_deref(),
            methods: self.methods,
        }
    }
}
