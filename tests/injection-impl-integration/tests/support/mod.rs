//! 集成测试共用的组件、工厂与日志工具

#![allow(dead_code)]

use injection_abstractions::{
    BoundObject, FactoryError, FieldDescriptor, InjectableInstance, InjectionTargetContext, MethodDescriptor,
    ObjectFactory, Reference,
};
use injection_common::ComponentIdentity;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

static INIT_LOGGER: Once = Once::new();

/// 初始化测试日志系统（只初始化一次）
pub fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init()
            .ok(); // 忽略重复初始化
    });
}

pub fn identity(module: &str, component: &str) -> ComponentIdentity {
    ComponentIdentity::new("shop", module, component)
}

/// 每次调用都创建新字符串对象的工厂
pub struct ConstantFactory {
    value: &'static str,
    created: AtomicUsize,
}

impl ConstantFactory {
    pub fn new(value: &'static str) -> Arc<Self> {
        Arc::new(Self {
            value,
            created: AtomicUsize::new(0),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ObjectFactory for ConstantFactory {
    fn get_object_instance(
        &self,
        _reference: &Reference,
        _context: &mut InjectionTargetContext,
    ) -> Result<Option<BoundObject>, FactoryError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let object: BoundObject = Arc::new(self.value.to_string());
        Ok(Some(object))
    }
}

/// 记录注入结果的组件实例
#[derive(Default)]
pub struct RecordingInstance {
    pub fields: HashMap<String, BoundObject>,
    pub calls: Vec<(String, usize)>,
}

impl RecordingInstance {
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|value| value.downcast_ref::<String>())
            .map(String::as_str)
    }
}

impl InjectableInstance for RecordingInstance {
    fn set_field(&mut self, field: &FieldDescriptor, value: BoundObject) -> Result<(), FactoryError> {
        self.fields.insert(field.name.clone(), value);
        Ok(())
    }

    fn invoke_method(&mut self, method: &MethodDescriptor, arguments: Vec<BoundObject>) -> Result<(), FactoryError> {
        self.calls.push((method.name.clone(), arguments.len()));
        Ok(())
    }
}

/// 统计 ERROR 级别事件数量的日志层
#[derive(Clone, Default)]
pub struct ErrorCounter {
    count: Arc<AtomicUsize>,
}

impl ErrorCounter {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}
