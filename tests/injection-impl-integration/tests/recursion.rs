//! 递归注入检测

mod support;

use injection_abstractions::{
    BoundObject, ComponentNamespaceConfig, FactoryError, InjectionTargetContext, ObjectFactory, Reference,
    ResourceRefDecl,
};
use injection_common::{EngineSettings, InjectionError};
use injection_impl::{InjectionEngine, JavaNamespace, SavedBindingTables};
use std::sync::Arc;
use support::{identity, init_test_logger, ErrorCounter};
use tracing_subscriber::layer::SubscriberExt;

/// 创建对象时回头查找命名空间中另一个名称的工厂
struct LookupFactory {
    namespace: Arc<JavaNamespace>,
}

impl ObjectFactory for LookupFactory {
    fn get_object_instance(
        &self,
        reference: &Reference,
        context: &mut InjectionTargetContext,
    ) -> Result<Option<BoundObject>, FactoryError> {
        let target = reference.address("binding-name").unwrap_or_default();
        self.namespace
            .lookup(target, context)
            .map_err(|e| Box::new(e) as FactoryError)
    }
}

fn process(names: &[(&str, &str)]) -> Arc<JavaNamespace> {
    let namespace = Arc::new(JavaNamespace::new());
    let engine = InjectionEngine::with_default_processors(EngineSettings::default()).unwrap();
    engine
        .register_named_factory(
            "indirect-lookup",
            Arc::new(LookupFactory {
                namespace: namespace.clone(),
            }),
        )
        .unwrap();

    let mut config = ComponentNamespaceConfig::new(identity("loop.war", "LoopServlet"));
    for (name, lookup) in names {
        config = config.with_resource_ref(ResourceRefDecl::resource_env_ref(*name).with_lookup(*lookup));
    }
    let mut saved = SavedBindingTables::new();
    engine
        .process_component(&config, namespace.as_ref(), &mut saved)
        .unwrap();
    namespace
}

#[test]
fn test_self_reference_is_reported_once() {
    init_test_logger();
    let namespace = process(&[("loop", "java:comp/env/loop")]);
    let counter = ErrorCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());

    let result = tracing::subscriber::with_default(subscriber, || {
        let mut context = InjectionTargetContext::new();
        let result = namespace.lookup("java:comp/env/loop", &mut context);
        assert_eq!(context.depth(), 0);
        result
    });

    match result {
        Err(InjectionError::RecursiveInjection {
            reference,
            chain,
            logged,
        }) => {
            assert_eq!(reference, "java:comp/env/loop");
            assert_eq!(chain, ["java:comp/env/loop", "java:comp/env/loop"]);
            assert!(logged);
        }
        other => panic!("期望递归注入错误, 实际: {other:?}"),
    }
    assert_eq!(counter.count(), 1);
}

#[test]
fn test_indirect_cycle_is_reported_once() {
    init_test_logger();
    let namespace = process(&[("a", "java:comp/env/b"), ("b", "java:comp/env/a")]);
    let counter = ErrorCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());

    let result = tracing::subscriber::with_default(subscriber, || {
        let mut context = InjectionTargetContext::new();
        namespace.lookup("a", &mut context)
    });

    match result {
        Err(InjectionError::RecursiveInjection { reference, chain, .. }) => {
            assert_eq!(reference, "java:comp/env/a");
            assert_eq!(chain, ["java:comp/env/a", "java:comp/env/b", "java:comp/env/a"]);
        }
        other => panic!("期望递归注入错误, 实际: {other:?}"),
    }
    assert_eq!(counter.count(), 1);
}

#[test]
fn test_chain_without_cycle_resolves() {
    init_test_logger();
    let namespace = Arc::new(JavaNamespace::new());
    let engine = InjectionEngine::with_default_processors(EngineSettings::default()).unwrap();
    engine
        .register_named_factory(
            "indirect-lookup",
            Arc::new(LookupFactory {
                namespace: namespace.clone(),
            }),
        )
        .unwrap();

    let config = ComponentNamespaceConfig::new(identity("chain.war", "ChainServlet"))
        .with_resource_ref(ResourceRefDecl::resource_env_ref("alias").with_lookup("java:comp/env/greeting"))
        .with_resource_ref(
            ResourceRefDecl::env_entry("greeting")
                .with_type("java.lang.String")
                .with_value("hello"),
        );
    let mut saved = SavedBindingTables::new();
    engine
        .process_component(&config, namespace.as_ref(), &mut saved)
        .unwrap();

    let mut context = InjectionTargetContext::new();
    let object = namespace.lookup("alias", &mut context).unwrap().unwrap();
    assert_eq!(object.downcast_ref::<String>().map(String::as_str), Some("hello"));
}
