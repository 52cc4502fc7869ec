//! 引擎注册表
//!
//! 处理器、对象工厂、扩展点与监听器的登记信息。注册表本身不可变，
//! 引擎以写时复制的方式替换整个快照，读取方持有 `Arc` 即可无锁访问。

use crate::strategy::ReferenceStrategy;
use injection_abstractions::{
    AnnotationOverride, MetadataListener, ObjectFactory, ObjectFactoryInfo, OverrideReferenceFactory, ReferenceKind,
};
use injection_common::{InjectionError, InjectionResult};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// 引擎注册表快照
#[derive(Clone, Default)]
pub struct EngineRegistry {
    strategies: BTreeMap<ReferenceKind, Arc<dyn ReferenceStrategy>>,
    factories_by_type: HashMap<(ReferenceKind, String), ObjectFactoryInfo>,
    factories_by_name: HashMap<String, Arc<dyn ObjectFactory>>,
    override_factories: HashMap<ReferenceKind, Vec<Arc<dyn OverrideReferenceFactory>>>,
    annotation_overrides: HashMap<ReferenceKind, Vec<Arc<dyn AnnotationOverride>>>,
    listeners: Vec<Arc<dyn MetadataListener>>,
}

impl EngineRegistry {
    /// 已注册的处理策略，按引用类型排序
    pub fn strategies(&self) -> impl Iterator<Item = &Arc<dyn ReferenceStrategy>> {
        self.strategies.values()
    }

    /// 引用类型对应的处理策略
    pub fn strategy(&self, kind: ReferenceKind) -> Option<&Arc<dyn ReferenceStrategy>> {
        self.strategies.get(&kind)
    }

    /// 按引用类型与对象类型查找工厂
    pub fn object_factory(&self, kind: ReferenceKind, type_name: &str) -> Option<&ObjectFactoryInfo> {
        self.factories_by_type.get(&(kind, type_name.to_string()))
    }

    /// 按名称查找工厂
    pub fn named_factory(&self, name: &str) -> Option<&Arc<dyn ObjectFactory>> {
        self.factories_by_name.get(name)
    }

    /// 引用类型对应的覆盖引用工厂
    pub fn override_factories(&self, kind: ReferenceKind) -> &[Arc<dyn OverrideReferenceFactory>] {
        self.override_factories.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// 引用类型对应的注解覆盖处理器
    pub fn annotation_overrides(&self, kind: ReferenceKind) -> &[Arc<dyn AnnotationOverride>] {
        self.annotation_overrides.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// 元数据监听器
    pub fn listeners(&self) -> &[Arc<dyn MetadataListener>] {
        &self.listeners
    }

    pub(crate) fn add_strategy(&mut self, strategy: Arc<dyn ReferenceStrategy>) -> InjectionResult<()> {
        let kind = strategy.kind();
        if self.strategies.contains_key(&kind) {
            return Err(InjectionError::illegal_state(format!("{kind} 的处理器已经注册")));
        }
        self.strategies.insert(kind, strategy);
        Ok(())
    }

    pub(crate) fn add_object_factory(
        &mut self,
        kind: ReferenceKind,
        type_name: &str,
        info: ObjectFactoryInfo,
    ) -> InjectionResult<()> {
        let key = (kind, type_name.to_string());
        if self.factories_by_type.contains_key(&key) {
            return Err(InjectionError::illegal_state(format!(
                "{kind} 类型 {type_name} 的对象工厂已经注册"
            )));
        }
        match self.factories_by_name.get(&info.factory_name) {
            Some(existing) if !Arc::ptr_eq(existing, &info.factory) => {
                return Err(InjectionError::illegal_state(format!(
                    "对象工厂名称 {} 已被另一个工厂使用",
                    info.factory_name
                )));
            }
            Some(_) => {}
            None => {
                self.factories_by_name
                    .insert(info.factory_name.clone(), info.factory.clone());
            }
        }
        self.factories_by_type.insert(key, info);
        Ok(())
    }

    pub(crate) fn remove_object_factory(&mut self, kind: ReferenceKind, type_name: &str) -> bool {
        let Some(info) = self.factories_by_type.remove(&(kind, type_name.to_string())) else {
            return false;
        };
        let still_used = self
            .factories_by_type
            .values()
            .any(|other| other.factory_name == info.factory_name);
        if !still_used {
            self.factories_by_name.remove(&info.factory_name);
        }
        true
    }

    pub(crate) fn add_named_factory(&mut self, name: &str, factory: Arc<dyn ObjectFactory>) -> InjectionResult<()> {
        if self.factories_by_name.contains_key(name) {
            return Err(InjectionError::illegal_state(format!("对象工厂名称 {name} 已经注册")));
        }
        self.factories_by_name.insert(name.to_string(), factory);
        Ok(())
    }

    /// 仍被按类型注册的工厂使用的名称不能单独移除
    pub(crate) fn remove_named_factory(&mut self, name: &str) -> bool {
        if self.factories_by_type.values().any(|info| info.factory_name == name) {
            return false;
        }
        self.factories_by_name.remove(name).is_some()
    }

    pub(crate) fn add_override_factory(&mut self, kind: ReferenceKind, factory: Arc<dyn OverrideReferenceFactory>) {
        self.override_factories.entry(kind).or_default().push(factory);
    }

    pub(crate) fn add_annotation_override(&mut self, kind: ReferenceKind, processor: Arc<dyn AnnotationOverride>) {
        self.annotation_overrides.entry(kind).or_default().push(processor);
    }

    pub(crate) fn add_listener(&mut self, listener: Arc<dyn MetadataListener>) {
        self.listeners.push(listener);
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .field("factories_by_type", &self.factories_by_type.len())
            .field("factories_by_name", &self.factories_by_name.keys().collect::<Vec<_>>())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
