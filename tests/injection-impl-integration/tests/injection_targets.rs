//! 部署描述符注入目标的查找与校验

mod support;

use injection_abstractions::{
    ClassDescriptor, ComponentNamespaceConfig, FieldDescriptor, InMemoryClassResolver, MethodDescriptor,
    ObjectFactoryInfo, ReferenceBindings, ReferenceKind, ResourceAnnotation, ResourceRefDecl,
};
use injection_common::{
    ComponentIdentity, ConfigurationError, EngineSettings, ReferenceFlowKind, TypeDescriptor, ValidationLevel,
};
use injection_impl::{InjectionEngine, JavaNamespace, SavedBindingTables, TargetMember};
use std::sync::Arc;
use support::{identity, init_test_logger, ConstantFactory};

fn queue_bindings() -> ReferenceBindings {
    let mut bindings = ReferenceBindings::default();
    bindings
        .resource_env_ref
        .insert("jms/orders".to_string(), "jms/OrdersQueue".to_string());
    bindings
}

fn resolver_with(listener: ClassDescriptor) -> Arc<InMemoryClassResolver> {
    Arc::new(
        InMemoryClassResolver::new()
            .with_class(Arc::new(ClassDescriptor::new("javax.jms.Queue").implements("javax.jms.Destination")))
            .with_class(Arc::new(listener)),
    )
}

#[test]
fn test_two_compatible_setters_are_ambiguous() {
    init_test_logger();
    let listener = ClassDescriptor::new("com.acme.OrderListener")
        .with_method(MethodDescriptor::setter("setQueue", TypeDescriptor::named("javax.jms.Destination")))
        .with_method(MethodDescriptor::setter("setQueue", TypeDescriptor::object()));
    let config = ComponentNamespaceConfig::new(identity("orders.jar", "OrderListener"))
        .with_flow(ReferenceFlowKind::Ejb)
        .with_class_resolver(resolver_with(listener))
        .with_resource_ref(
            ResourceRefDecl::resource_env_ref("jms/orders")
                .with_type("javax.jms.Queue")
                .with_target("com.acme.OrderListener", "queue"),
        )
        .with_bindings(queue_bindings());
    let engine = InjectionEngine::with_default_processors(EngineSettings::default()).unwrap();
    let mut saved = SavedBindingTables::new();

    let error = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap_err();

    match error.as_configuration_error() {
        Some(ConfigurationError::AmbiguousTarget {
            property,
            class_name,
            injection_type,
            ..
        }) => {
            assert_eq!(property, "queue");
            assert_eq!(class_name, "com.acme.OrderListener");
            assert_eq!(injection_type, "javax.jms.Queue");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_exact_setter_is_preferred() {
    init_test_logger();
    let listener = ClassDescriptor::new("com.acme.OrderListener")
        .with_method(MethodDescriptor::setter("setQueue", TypeDescriptor::named("javax.jms.Destination")))
        .with_method(MethodDescriptor::setter("setQueue", TypeDescriptor::named("javax.jms.Queue")));
    let config = ComponentNamespaceConfig::new(identity("orders.jar", "OrderListener"))
        .with_flow(ReferenceFlowKind::Ejb)
        .with_class_resolver(resolver_with(listener.clone()))
        .with_resource_ref(
            ResourceRefDecl::resource_env_ref("jms/orders")
                .with_type("javax.jms.Queue")
                .with_target("com.acme.OrderListener", "queue"),
        )
        .with_bindings(queue_bindings());
    let engine = InjectionEngine::with_default_processors(EngineSettings::default()).unwrap();
    let mut saved = SavedBindingTables::new();

    let metadata = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap();

    let targets = metadata.targets_for(&listener);
    assert_eq!(targets.len(), 1);
    assert!(targets[0].is_from_xml());
    match targets[0].member() {
        TargetMember::Method(method) => {
            assert_eq!(method.single_parameter_type().map(TypeDescriptor::name), Some("javax.jms.Queue"));
        }
        other => panic!("期望 set 方法目标, 实际: {other:?}"),
    }
}

#[test]
fn test_client_targets_are_deferred_without_resolver() {
    init_test_logger();
    let config = ComponentNamespaceConfig::new(identity("client.jar", "Main"))
        .with_flow(ReferenceFlowKind::Client)
        .with_resource_ref(
            ResourceRefDecl::resource_env_ref("jms/orders")
                .with_type("javax.jms.Queue")
                .with_target("com.acme.client.Main", "queue"),
        )
        .with_bindings(queue_bindings());
    let engine = InjectionEngine::with_default_processors(EngineSettings::default()).unwrap();
    let namespace = JavaNamespace::new();
    let mut saved = SavedBindingTables::new();

    let metadata = engine.process_component(&config, &namespace, &mut saved).unwrap();

    let deferred: Vec<_> = metadata.deferred_client_targets().collect();
    assert_eq!(deferred.len(), 1);
    let (binding, target) = deferred[0];
    assert_eq!(binding.jndi_name(), "java:comp/env/jms/orders");
    assert_eq!(binding.injection_type_name(), Some("javax.jms.Queue"));
    assert_eq!(target.class_name, "com.acme.client.Main");
    assert_eq!(target.target_name, "queue");
    assert_eq!(metadata.target_class_count(), 0);
    assert!(namespace.contains("jms/orders"));
}

#[test]
fn test_client_targets_must_be_static() {
    init_test_logger();
    let main = ClassDescriptor::new("com.acme.client.Main").with_field(
        FieldDescriptor::new("queue", TypeDescriptor::named("javax.jms.Queue"))
            .with_annotation(ResourceAnnotation::named("jms/orders")),
    );
    let config = ComponentNamespaceConfig::new(identity("client.jar", "Main"))
        .with_flow(ReferenceFlowKind::Client)
        .with_injection_class(Arc::new(main))
        .with_bindings(queue_bindings());
    let engine = InjectionEngine::with_default_processors(EngineSettings::default()).unwrap();
    let mut saved = SavedBindingTables::new();

    let error = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap_err();
    assert!(matches!(
        error.as_configuration_error(),
        Some(ConfigurationError::ClientTargetNotStatic { .. })
    ));
}

#[test]
fn test_static_member_is_skipped_in_server_flows() {
    init_test_logger();
    let servlet = Arc::new(
        ClassDescriptor::new("com.acme.StatusServlet")
            .with_field(
                FieldDescriptor::new("shared", TypeDescriptor::named("javax.sql.DataSource"))
                    .with_static(true)
                    .with_annotation(ResourceAnnotation::named("jdbc/status")),
            )
            .with_field(
                FieldDescriptor::new("local", TypeDescriptor::named("javax.sql.DataSource"))
                    .with_annotation(ResourceAnnotation::named("jdbc/status")),
            ),
    );
    let engine = InjectionEngine::with_default_processors(EngineSettings {
        validation: ValidationLevel::Warn,
        ..EngineSettings::default()
    })
    .unwrap();
    engine
        .register_object_factory(
            ReferenceKind::Resource,
            "javax.sql.DataSource",
            ObjectFactoryInfo::new("status-ds", ConstantFactory::new("status")),
        )
        .unwrap();
    let config = ComponentNamespaceConfig::new(identity("status.war", "StatusServlet")).with_injection_class(servlet.clone());
    let mut saved = SavedBindingTables::new();

    let metadata = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap();

    let targets = metadata.targets_for(&servlet);
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].member().property_name(), "local");
}

#[test]
fn test_final_field_is_rejected() {
    init_test_logger();
    let servlet = Arc::new(
        ClassDescriptor::new("com.acme.StatusServlet").with_field(
            FieldDescriptor::new("status", TypeDescriptor::named("java.lang.String"))
                .with_final(true)
                .with_annotation(ResourceAnnotation::named("status")),
        ),
    );
    let config = ComponentNamespaceConfig::new(identity("status.war", "StatusServlet")).with_injection_class(servlet);
    let engine = InjectionEngine::with_default_processors(EngineSettings::default()).unwrap();
    let mut saved = SavedBindingTables::new();

    let error = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap_err();
    assert!(matches!(
        error.as_configuration_error(),
        Some(ConfigurationError::IllegalModifier { modifier, .. }) if modifier == "final"
    ));
}

#[test]
fn test_same_class_name_resolves_per_application() {
    init_test_logger();
    let engine = InjectionEngine::with_default_processors(EngineSettings::default()).unwrap();
    let mut bindings = ReferenceBindings::default();
    bindings
        .resource_env_ref
        .insert("res/orders".to_string(), "res/Orders".to_string());

    let mut signatures = Vec::new();
    for (application, parameter) in [("shop", "javax.sql.DataSource"), ("crm", "javax.jms.Queue")] {
        let cart = ClassDescriptor::new("com.acme.Cart")
            .with_method(MethodDescriptor::setter("setOrders", TypeDescriptor::named(parameter)));
        let config = ComponentNamespaceConfig::new(ComponentIdentity::new(application, "cart.war", "Cart"))
            .with_flow(ReferenceFlowKind::Web)
            .with_class_resolver(Arc::new(InMemoryClassResolver::new().with_class(Arc::new(cart.clone()))))
            .with_resource_ref(ResourceRefDecl::resource_env_ref("res/orders").with_target("com.acme.Cart", "orders"))
            .with_bindings(bindings.clone());
        let mut saved = SavedBindingTables::new();

        let metadata = engine
            .process_component(&config, &JavaNamespace::new(), &mut saved)
            .unwrap();

        let targets = metadata.targets_for(&cart);
        assert_eq!(targets.len(), 1);
        match targets[0].member() {
            TargetMember::Method(method) => signatures.push(method.signature()),
            other => panic!("期望 set 方法目标, 实际: {other:?}"),
        }
    }

    assert_eq!(signatures, ["setOrders(javax.sql.DataSource)", "setOrders(javax.jms.Queue)"]);
}

#[test]
fn test_untyped_reference_with_two_setters_is_ambiguous() {
    init_test_logger();
    let listener = ClassDescriptor::new("com.acme.OrderListener")
        .with_method(MethodDescriptor::setter("setQueue", TypeDescriptor::named("javax.jms.Destination")))
        .with_method(MethodDescriptor::setter("setQueue", TypeDescriptor::named("javax.jms.Queue")));
    let config = ComponentNamespaceConfig::new(identity("orders.jar", "OrderListener"))
        .with_flow(ReferenceFlowKind::Ejb)
        .with_class_resolver(resolver_with(listener))
        .with_resource_ref(ResourceRefDecl::resource_env_ref("jms/orders").with_target("com.acme.OrderListener", "queue"))
        .with_bindings(queue_bindings());
    let engine = InjectionEngine::with_default_processors(EngineSettings::default()).unwrap();
    let mut saved = SavedBindingTables::new();

    let error = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap_err();

    match error.as_configuration_error() {
        Some(ConfigurationError::AmbiguousTarget {
            property,
            first,
            second,
            ..
        }) => {
            assert_eq!(property, "queue");
            let mut candidates = [first.as_str(), second.as_str()];
            candidates.sort_unstable();
            assert_eq!(candidates, ["setQueue(javax.jms.Destination)", "setQueue(javax.jms.Queue)"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
