//! 命名空间抽象接口

use crate::context::InjectionTargetContext;
use crate::factory::BoundObject;
use injection_common::{InjectionResult, NamespaceScope, NamingError};
use std::fmt;
use std::sync::Arc;

/// 命名空间中的条目
pub trait NamespaceEntry: Send + Sync + fmt::Debug {
    /// 条目对应的完整引用名称
    fn reference_name(&self) -> String;

    /// 获取条目对象，`None` 表示绑定对象为空
    fn object(&self, context: &mut InjectionTargetContext) -> InjectionResult<Option<BoundObject>>;
}

/// 命名上下文
///
/// `relative_name` 相对于作用域根，组件环境中的名称以 `env/` 开头。
pub trait NamingContext: Send + Sync {
    /// 绑定条目
    fn bind(
        &self,
        scope: NamespaceScope,
        relative_name: &str,
        entry: Arc<dyn NamespaceEntry>,
    ) -> Result<(), NamingError>;

    /// 是否已经绑定
    fn is_bound(&self, scope: NamespaceScope, relative_name: &str) -> bool;
}
