//! 内存命名空间
//!
//! `java:comp`、`java:module`、`java:app`、`java:global` 四棵命名树的内存实现。
//! 绑定完成后可被多个线程并发查找。

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use injection_abstractions::{BoundObject, InjectionTargetContext, NamespaceEntry, NamingContext};
use injection_common::{InjectionResult, NamespaceScope, NamingError};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 内存命名空间
#[derive(Default)]
pub struct JavaNamespace {
    entries: DashMap<(NamespaceScope, String), Arc<dyn NamespaceEntry>>,
}

impl JavaNamespace {
    /// 创建空命名空间
    pub fn new() -> Self {
        Self::default()
    }

    /// 把名称拆分为作用域与相对名称
    ///
    /// 未限定的名称位于 `java:comp/env` 下。
    fn split(name: &str) -> Result<(NamespaceScope, String), NamingError> {
        if !NamespaceScope::is_qualified(name) {
            return Ok((NamespaceScope::Comp, format!("env/{name}")));
        }
        NamespaceScope::match_name(name)
            .and_then(|scope| scope.relative_name(name).map(|relative| (scope, relative.to_string())))
            .filter(|(_, relative)| !relative.is_empty())
            .ok_or_else(|| NamingError::InvalidName { name: name.to_string() })
    }

    /// 按完整名称查找对象
    ///
    /// `Ok(None)` 表示名称已绑定但绑定对象为空。
    pub fn lookup(&self, name: &str, context: &mut InjectionTargetContext) -> InjectionResult<Option<BoundObject>> {
        let key = Self::split(name)?;
        let entry = self
            .entries
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| NamingError::NotFound { name: name.to_string() })?;
        debug!("查找 {}", entry.reference_name());
        entry.object(context)
    }

    /// 是否绑定了完整名称
    pub fn contains(&self, name: &str) -> bool {
        Self::split(name).is_ok_and(|key| self.entries.contains_key(&key))
    }

    /// 已绑定的条目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl NamingContext for JavaNamespace {
    fn bind(&self, scope: NamespaceScope, relative_name: &str, entry: Arc<dyn NamespaceEntry>) -> Result<(), NamingError> {
        match self.entries.entry((scope, relative_name.to_string())) {
            Entry::Occupied(_) => Err(NamingError::AlreadyBound {
                name: format!("{}{}", scope.prefix(), relative_name),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                Ok(())
            }
        }
    }

    fn is_bound(&self, scope: NamespaceScope, relative_name: &str) -> bool {
        self.entries.contains_key(&(scope, relative_name.to_string()))
    }
}

impl fmt::Debug for JavaNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JavaNamespace")
            .field("entries", &self.entries.len())
            .finish()
    }
}
