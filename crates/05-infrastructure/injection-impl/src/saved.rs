//! 跨组件保存的绑定
//!
//! 模块、应用、全局作用域的名称在声明它们的所有组件之间必须完全一致。
//! 第一个解析某个名称的组件保存其绑定，之后的组件与之比较并共享解析结果。
//!
//! 同一应用的多个模块可能被并发处理，对保存表的修改需要由调用方同步。

use crate::binding::Binding;
use crate::strategy::ReferenceStrategy;
use injection_abstractions::ReferenceKind;
use injection_common::{ComponentIdentity, ConfigurationResult, NamespaceScope};
use std::collections::HashMap;
use tracing::debug;

/// 保存表的作用域键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SavedScopeKey {
    /// 某个模块
    Module { application: String, module: String },
    /// 某个应用
    App { application: String },
    /// 全局
    Global,
}

impl SavedScopeKey {
    /// 组件所在的作用域键，组件作用域不保存
    pub fn for_scope(scope: NamespaceScope, identity: &ComponentIdentity) -> Option<Self> {
        match scope {
            NamespaceScope::Comp => None,
            NamespaceScope::Module => Some(Self::Module {
                application: identity.application.clone(),
                module: identity.module.clone(),
            }),
            NamespaceScope::App => Some(Self::App {
                application: identity.application.clone(),
            }),
            NamespaceScope::Global => Some(Self::Global),
        }
    }

    fn application(&self) -> Option<&str> {
        match self {
            Self::Module { application, .. } | Self::App { application } => Some(application),
            Self::Global => None,
        }
    }
}

/// 跨组件保存的绑定表
#[derive(Debug, Default)]
pub struct SavedBindingTables {
    tables: HashMap<SavedScopeKey, HashMap<(ReferenceKind, String), Binding>>,
}

impl SavedBindingTables {
    /// 创建空表
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存的绑定总数
    pub fn len(&self) -> usize {
        self.tables.values().map(HashMap::len).sum()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(HashMap::is_empty)
    }

    /// 查找保存的绑定
    pub fn get(
        &self,
        scope: NamespaceScope,
        identity: &ComponentIdentity,
        kind: ReferenceKind,
        name: &str,
    ) -> Option<&Binding> {
        let key = SavedScopeKey::for_scope(scope, identity)?;
        self.tables.get(&key)?.get(&(kind, name.to_string()))
    }

    /// 是否保存了该名称
    pub fn contains(
        &self,
        scope: NamespaceScope,
        identity: &ComponentIdentity,
        kind: ReferenceKind,
        name: &str,
    ) -> bool {
        self.get(scope, identity, kind, name).is_some()
    }

    /// 应用卸载时移除其模块与应用作用域的绑定
    pub fn remove_application(&mut self, application: &str) -> usize {
        let before = self.len();
        self.tables.retain(|key, _| key.application() != Some(application));
        before - self.len()
    }

    /// 与保存的绑定合并，或者保存当前绑定
    ///
    /// 已有保存的绑定时，两者必须完全一致，当前绑定改用保存的解析结果。
    pub(crate) fn merge_or_adopt(
        &mut self,
        binding: &mut Binding,
        strategy: &dyn ReferenceStrategy,
    ) -> ConfigurationResult<()> {
        let Some(key) = SavedScopeKey::for_scope(binding.scope(), binding.identity()) else {
            return Ok(());
        };
        let table = self.tables.entry(key).or_default();
        let entry_key = (binding.kind(), binding.name().to_string());

        match table.get(&entry_key) {
            Some(saved) => {
                strategy.merge_saved(saved, binding)?;
                binding.adopt_resolution(saved);
                debug!("引用 {} 使用已保存的解析结果", binding.jndi_name());
            }
            None => {
                table.insert(entry_key, binding.saved_copy());
                binding.set_first_in_scope();
                debug!("保存 {} 引用 {}", binding.scope(), binding.jndi_name());
            }
        }
        Ok(())
    }
}
