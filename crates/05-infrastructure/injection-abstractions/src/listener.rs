//! 元数据创建监听器

use injection_common::ComponentIdentity;

/// 元数据创建事件
#[derive(Debug, Clone)]
pub struct MetadataCreatedEvent<'a> {
    /// 组件标识
    pub identity: &'a ComponentIdentity,
    /// 组件中的引用名称（完整形式）
    pub reference_names: Vec<String>,
    /// 拥有注入目标的类数量
    pub target_class_count: usize,
}

/// 元数据创建监听器
///
/// 每个组件在命名空间填充完成后通知一次。
pub trait MetadataListener: Send + Sync {
    /// 元数据已创建
    fn metadata_created(&self, event: &MetadataCreatedEvent<'_>);
}
