//! 非组件作用域名称在多个组件之间的共享与一致性检查

mod support;

use injection_abstractions::{
    ClassDescriptor, ComponentNamespaceConfig, FieldDescriptor, InjectionTargetContext, ObjectFactoryInfo,
    ReferenceKind, ResourceAnnotation,
};
use injection_common::{ComponentIdentity, ConfigurationError, EngineSettings, NamespaceScope, TypeDescriptor};
use injection_impl::{InjectionEngine, JavaNamespace, SavedBindingTables};
use std::sync::Arc;
use support::{identity, init_test_logger, ConstantFactory};

const SHARED: &str = "java:global/jdbc/shared";

fn engine(settings: EngineSettings) -> InjectionEngine {
    let engine = InjectionEngine::with_default_processors(settings).unwrap();
    engine
        .register_object_factory(
            ReferenceKind::Resource,
            "javax.sql.DataSource",
            ObjectFactoryInfo::new("pooled-ds", ConstantFactory::new("shared-pool")),
        )
        .unwrap();
    engine
        .register_object_factory(
            ReferenceKind::Resource,
            "javax.sql.XADataSource",
            ObjectFactoryInfo::new("xa-ds", ConstantFactory::new("xa-pool")),
        )
        .unwrap();
    engine
}

fn component(identity: ComponentIdentity, field_type: &str) -> ComponentNamespaceConfig {
    let class = Arc::new(
        ClassDescriptor::new(format!("com.acme.{}", identity.component)).with_field(
            FieldDescriptor::new("datasource", TypeDescriptor::named(field_type))
                .with_annotation(ResourceAnnotation::named(SHARED)),
        ),
    );
    ComponentNamespaceConfig::new(identity).with_injection_class(class)
}

#[test]
fn test_components_share_one_resolution() {
    init_test_logger();
    let engine = engine(EngineSettings::default());
    let namespace = JavaNamespace::new();
    let mut saved = SavedBindingTables::new();

    let first_identity = identity("orders.war", "OrderServlet");
    let first = engine
        .process_component(&component(first_identity.clone(), "javax.sql.DataSource"), &namespace, &mut saved)
        .unwrap();
    let second = engine
        .process_component(
            &component(identity("billing.jar", "InvoiceBean"), "javax.sql.DataSource"),
            &namespace,
            &mut saved,
        )
        .unwrap();

    let first = first.binding(SHARED).unwrap();
    let second = second.binding(SHARED).unwrap();
    assert_eq!(first.scope(), NamespaceScope::Global);
    assert!(first.is_first_in_scope());
    assert!(!second.is_first_in_scope());
    assert!(Arc::ptr_eq(
        first.resolved_object().unwrap(),
        second.resolved_object().unwrap()
    ));

    assert!(saved.contains(NamespaceScope::Global, &first_identity, ReferenceKind::Resource, SHARED));
    assert_eq!(saved.len(), 1);

    // 默认不立即绑定非组件作用域的名称
    assert!(!namespace.contains(SHARED));
    assert!(namespace.is_empty());
}

#[test]
fn test_eager_binding_happens_once() {
    init_test_logger();
    let engine = engine(EngineSettings {
        bind_non_comp_eagerly: true,
        ..EngineSettings::default()
    });
    let namespace = JavaNamespace::new();
    let mut saved = SavedBindingTables::new();

    for (module, component_name) in [("orders.war", "OrderServlet"), ("billing.jar", "InvoiceBean")] {
        engine
            .process_component(
                &component(identity(module, component_name), "javax.sql.DataSource"),
                &namespace,
                &mut saved,
            )
            .unwrap();
    }

    assert_eq!(namespace.len(), 1);
    let mut context = InjectionTargetContext::new();
    let object = namespace.lookup(SHARED, &mut context).unwrap().unwrap();
    assert_eq!(object.downcast_ref::<String>().map(String::as_str), Some("shared-pool"));
}

#[test]
fn test_conflicting_type_across_components() {
    init_test_logger();
    let engine = engine(EngineSettings::default());
    let namespace = JavaNamespace::new();
    let mut saved = SavedBindingTables::new();

    engine
        .process_component(
            &component(identity("orders.war", "OrderServlet"), "javax.sql.DataSource"),
            &namespace,
            &mut saved,
        )
        .unwrap();

    let error = engine
        .process_component(
            &component(identity("audit.war", "AuditServlet"), "javax.sql.XADataSource"),
            &namespace,
            &mut saved,
        )
        .unwrap_err();

    match error.as_configuration_error() {
        Some(ConfigurationError::SavedConflict {
            attribute,
            old_value,
            new_value,
            ..
        }) => {
            assert_eq!(attribute, "type");
            assert_eq!(old_value, "javax.sql.DataSource");
            assert_eq!(new_value, "javax.sql.XADataSource");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_application_names_are_scoped_per_application() {
    init_test_logger();
    let engine = InjectionEngine::with_default_processors(EngineSettings::default()).unwrap();
    engine
        .register_object_factory(
            ReferenceKind::Resource,
            "javax.sql.DataSource",
            ObjectFactoryInfo::new("pooled-ds", ConstantFactory::new("app-pool")),
        )
        .unwrap();
    let mut saved = SavedBindingTables::new();

    for application in ["shop", "crm"] {
        let identity = ComponentIdentity::new(application, "web.war", "Servlet");
        let class = Arc::new(
            ClassDescriptor::new("com.acme.Servlet").with_field(
                FieldDescriptor::new("datasource", TypeDescriptor::named("javax.sql.DataSource"))
                    .with_annotation(ResourceAnnotation::named("java:app/jdbc/main").with_shareable(application == "crm")),
            ),
        );
        let config = ComponentNamespaceConfig::new(identity).with_injection_class(class);
        engine
            .process_component(&config, &JavaNamespace::new(), &mut saved)
            .unwrap();
    }

    assert_eq!(saved.len(), 2);
    assert_eq!(saved.remove_application("shop"), 1);
    assert_eq!(saved.len(), 1);
}
