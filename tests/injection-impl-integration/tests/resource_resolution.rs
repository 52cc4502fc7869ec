//! 资源引用解析的端到端测试

mod support;

use injection_abstractions::{
    ClassDescriptor, ComponentNamespaceConfig, EnumConstant, FieldDescriptor, InMemoryClassResolver,
    InjectionTargetContext, ObjectFactoryInfo, OverrideReferenceFactory, OverrideRequest, Reference, ReferenceBindings,
    ReferenceKind, ResourceAnnotation, ResourceDefinitionAnnotation, ResourceDefinitionDecl, ResourceRefDecl,
};
use injection_common::{ConfigurationError, EngineSettings, TypeDescriptor};
use injection_impl::{BindingObject, InjectionEngine, JavaNamespace, SavedBindingTables};
use std::sync::Arc;
use support::{identity, init_test_logger, ConstantFactory, RecordingInstance};

fn engine() -> InjectionEngine {
    InjectionEngine::with_default_processors(EngineSettings::default()).unwrap()
}

fn reference_of(object: &BindingObject) -> &Reference {
    match object {
        BindingObject::Reference(reference) => reference,
        other => panic!("期望引用类型的绑定对象, 实际: {other:?}"),
    }
}

#[test]
fn test_annotated_field_is_bound_and_injected() {
    init_test_logger();
    let engine = engine();
    let factory = ConstantFactory::new("orders-ds");
    engine
        .register_object_factory(
            ReferenceKind::Resource,
            "javax.sql.DataSource",
            ObjectFactoryInfo::new("orders-ds", factory.clone()),
        )
        .unwrap();

    let class = Arc::new(
        ClassDescriptor::new("com.acme.OrderService").with_field(
            FieldDescriptor::new("datasource", TypeDescriptor::named("javax.sql.DataSource"))
                .with_annotation(ResourceAnnotation::named("myDS")),
        ),
    );
    let config = ComponentNamespaceConfig::new(identity("orders.war", "OrderService")).with_injection_class(class.clone());
    let namespace = JavaNamespace::new();
    let mut saved = SavedBindingTables::new();

    let metadata = engine.process_component(&config, &namespace, &mut saved).unwrap();

    let mut context = InjectionTargetContext::new();
    let object = namespace.lookup("java:comp/env/myDS", &mut context).unwrap().unwrap();
    assert_eq!(object.downcast_ref::<String>().map(String::as_str), Some("orders-ds"));
    assert!(namespace.contains("myDS"));

    let mut instance = RecordingInstance::default();
    metadata.inject(&class, &mut instance, &mut context).unwrap();
    assert_eq!(instance.field_str("datasource"), Some("orders-ds"));
    assert_eq!(factory.created(), 2);
    assert!(saved.is_empty());
}

#[test]
fn test_env_entry_without_value_is_not_bound() {
    init_test_logger();
    let engine = engine();
    let config = ComponentNamespaceConfig::new(identity("orders.war", "GreetingServlet"))
        .with_resource_ref(ResourceRefDecl::env_entry("greeting").with_type("java.lang.String"));
    let namespace = JavaNamespace::new();
    let mut saved = SavedBindingTables::new();

    let metadata = engine.process_component(&config, &namespace, &mut saved).unwrap();

    let binding = metadata.binding("java:comp/env/greeting").unwrap();
    assert!(binding.has_null_object());
    assert!(!binding.is_resolved());
    assert!(!namespace.contains("java:comp/env/greeting"));
    assert!(namespace.is_empty());
}

#[test]
fn test_env_entry_values_are_converted() {
    init_test_logger();
    let engine = engine();
    let mut bindings = ReferenceBindings::default();
    bindings.env_entry_values.insert("timeout".to_string(), "7".to_string());

    let config = ComponentNamespaceConfig::new(identity("orders.war", "SettingsServlet"))
        .with_resource_ref(
            ResourceRefDecl::env_entry("answer")
                .with_type("java.lang.Integer")
                .with_value("42"),
        )
        .with_resource_ref(
            ResourceRefDecl::env_entry("timeout")
                .with_type("java.lang.Long")
                .with_value("30"),
        )
        .with_resource_ref(
            ResourceRefDecl::env_entry("enabled")
                .with_type("java.lang.Boolean")
                .with_value("true"),
        )
        .with_resource_ref(
            ResourceRefDecl::env_entry("verbose")
                .with_type("java.lang.Boolean")
                .with_value("yes"),
        )
        .with_resource_ref(
            ResourceRefDecl::env_entry("separator")
                .with_type("java.lang.Character")
                .with_value(";;"),
        )
        .with_resource_ref(
            ResourceRefDecl::env_entry("auditPolicy")
                .with_type("java.lang.Class")
                .with_value("com.acme.AuditPolicy"),
        )
        .with_resource_ref(
            ResourceRefDecl::env_entry("color")
                .with_type("com.acme.Color")
                .with_value("GREEN"),
        )
        .with_class_resolver(Arc::new(
            InMemoryClassResolver::new()
                .with_class(Arc::new(ClassDescriptor::new("com.acme.AuditPolicy")))
                .with_class(Arc::new(
                    ClassDescriptor::new("com.acme.Color").with_enum_constants(["RED", "GREEN"]),
                )),
        ))
        .with_bindings(bindings);
    let namespace = JavaNamespace::new();
    let mut saved = SavedBindingTables::new();

    engine.process_component(&config, &namespace, &mut saved).unwrap();

    let mut context = InjectionTargetContext::new();
    let answer = namespace.lookup("java:comp/env/answer", &mut context).unwrap().unwrap();
    assert_eq!(answer.downcast_ref::<i32>(), Some(&42));

    let timeout = namespace.lookup("timeout", &mut context).unwrap().unwrap();
    assert_eq!(timeout.downcast_ref::<i64>(), Some(&7));

    let enabled = namespace.lookup("enabled", &mut context).unwrap().unwrap();
    assert_eq!(enabled.downcast_ref::<bool>(), Some(&true));

    // 非 true/false 的布尔值按 false 处理
    let verbose = namespace.lookup("verbose", &mut context).unwrap().unwrap();
    assert_eq!(verbose.downcast_ref::<bool>(), Some(&false));

    let separator = namespace.lookup("separator", &mut context).unwrap().unwrap();
    assert_eq!(separator.downcast_ref::<char>(), Some(&';'));

    let policy = namespace.lookup("auditPolicy", &mut context).unwrap().unwrap();
    assert_eq!(
        policy.downcast_ref::<ClassDescriptor>().map(|class| class.name.as_str()),
        Some("com.acme.AuditPolicy")
    );

    let color = namespace.lookup("color", &mut context).unwrap().unwrap();
    assert_eq!(
        color.downcast_ref::<EnumConstant>(),
        Some(&EnumConstant {
            type_name: "com.acme.Color".to_string(),
            name: "GREEN".to_string(),
        })
    );
}

#[test]
fn test_enum_env_entry_rejects_unknown_constant() {
    init_test_logger();
    let engine = engine();
    let config = ComponentNamespaceConfig::new(identity("orders.war", "SettingsServlet"))
        .with_class_resolver(Arc::new(InMemoryClassResolver::new().with_class(Arc::new(
            ClassDescriptor::new("com.acme.Color").with_enum_constants(["RED", "GREEN"]),
        ))))
        .with_resource_ref(
            ResourceRefDecl::env_entry("color")
                .with_type("com.acme.Color")
                .with_value("PURPLE"),
        );
    let mut saved = SavedBindingTables::new();

    let error = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap_err();
    assert!(matches!(
        error.as_configuration_error(),
        Some(ConfigurationError::InvalidEnvEntryValue { value, type_name, .. })
            if value == "PURPLE" && type_name == "com.acme.Color"
    ));
}

#[test]
fn test_class_and_enum_env_entries_are_deferred_without_resolver() {
    init_test_logger();
    let engine = engine();
    let config = ComponentNamespaceConfig::new(identity("client.jar", "Main"))
        .with_resource_ref(
            ResourceRefDecl::env_entry("auditPolicy")
                .with_type("java.lang.Class")
                .with_value("com.acme.AuditPolicy"),
        )
        .with_resource_ref(
            ResourceRefDecl::env_entry("color")
                .with_type("com.acme.Color")
                .with_value("GREEN"),
        );
    let mut saved = SavedBindingTables::new();

    let metadata = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap();

    let policy = reference_of(metadata.binding("java:comp/env/auditPolicy").unwrap().binding_object().unwrap());
    assert_eq!(policy.factory_name, "env-entry");
    assert_eq!(policy.address("class-name"), Some("com.acme.AuditPolicy"));

    let color = reference_of(metadata.binding("java:comp/env/color").unwrap().binding_object().unwrap());
    assert_eq!(color.class_name, "com.acme.Color");
    assert_eq!(color.address("enum-constant"), Some("GREEN"));
}

#[test]
fn test_invalid_env_entry_value_fails_under_strict_settings() {
    init_test_logger();
    let engine = InjectionEngine::with_default_processors(EngineSettings::strict()).unwrap();
    let config = ComponentNamespaceConfig::new(identity("orders.war", "SettingsServlet")).with_resource_ref(
        ResourceRefDecl::env_entry("answer")
            .with_type("int")
            .with_value("forty-two"),
    );
    let mut saved = SavedBindingTables::new();

    let error = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap_err();
    assert!(matches!(
        error.as_configuration_error(),
        Some(ConfigurationError::InvalidEnvEntryValue { value, .. }) if value == "forty-two"
    ));
}

#[test]
fn test_deployer_binding_wins_over_lookup() {
    init_test_logger();
    let engine = engine();
    let mut bindings = ReferenceBindings::default();
    bindings
        .resource_ref
        .insert("jdbc/reports".to_string(), "jdbc/ReportsPool".to_string());

    let config = ComponentNamespaceConfig::new(identity("reports.war", "ReportServlet"))
        .with_resource_ref(
            ResourceRefDecl::resource_ref("jdbc/reports")
                .with_type("javax.sql.DataSource")
                .with_lookup("jdbc/Fallback"),
        )
        .with_resource_ref(ResourceRefDecl::resource_ref("jdbc/archive").with_lookup("jdbc/ArchivePool"))
        .with_bindings(bindings);
    let mut saved = SavedBindingTables::new();

    let metadata = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap();

    let reports = metadata.binding("jdbc/reports").unwrap();
    let reference = reference_of(reports.binding_object().unwrap());
    assert_eq!(reference.factory_name, "resource-ref-lookup");
    assert_eq!(reference.address("binding-name"), Some("jdbc/ReportsPool"));
    assert_eq!(reference.address("shareable"), Some("true"));

    let archive = metadata.binding("jdbc/archive").unwrap();
    let reference = reference_of(archive.binding_object().unwrap());
    assert_eq!(reference.factory_name, "indirect-lookup");
    assert_eq!(reference.address("binding-name"), Some("jdbc/ArchivePool"));
}

struct LegacyOverride;

impl OverrideReferenceFactory for LegacyOverride {
    fn create_reference(&self, request: &OverrideRequest<'_>) -> Option<Reference> {
        request
            .reference_name
            .ends_with("/legacy")
            .then(|| Reference::new("com.acme.LegacyGateway", "legacy-gateway"))
    }
}

#[test]
fn test_override_reference_factory_takes_over() {
    init_test_logger();
    let engine = engine();
    engine.register_override_reference_factory(ReferenceKind::Resource, Arc::new(LegacyOverride));
    engine
        .register_named_factory("legacy-gateway", ConstantFactory::new("legacy"))
        .unwrap();

    let class = Arc::new(
        ClassDescriptor::new("com.acme.Billing").with_field(
            FieldDescriptor::new("gateway", TypeDescriptor::named("com.acme.LegacyGateway"))
                .with_annotation(ResourceAnnotation::named("services/legacy")),
        ),
    );
    let config = ComponentNamespaceConfig::new(identity("billing.jar", "Billing")).with_injection_class(class);
    let namespace = JavaNamespace::new();
    let mut saved = SavedBindingTables::new();

    engine.process_component(&config, &namespace, &mut saved).unwrap();

    let mut context = InjectionTargetContext::new();
    let object = namespace
        .lookup("java:comp/env/services/legacy", &mut context)
        .unwrap()
        .unwrap();
    assert_eq!(object.downcast_ref::<String>().map(String::as_str), Some("legacy"));
}

#[test]
fn test_unresolvable_references_are_reported_together() {
    init_test_logger();
    let engine = engine();
    let config = ComponentNamespaceConfig::new(identity("orders.war", "OrderServlet"))
        .with_resource_ref(ResourceRefDecl::resource_ref("jdbc/a").with_type("javax.sql.DataSource"))
        .with_resource_ref(ResourceRefDecl::resource_env_ref("jms/b").with_type("javax.jms.Queue"));
    let mut saved = SavedBindingTables::new();

    let error = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap_err();
    match error.as_configuration_error() {
        Some(ConfigurationError::MissingBindings { references, .. }) => {
            assert_eq!(references, &["java:comp/env/jdbc/a", "java:comp/env/jms/b"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_definition_properties_must_be_name_value_pairs() {
    init_test_logger();
    let engine = engine();
    let class = Arc::new(
        ClassDescriptor::new("com.acme.Config").with_annotation(
            ResourceDefinitionAnnotation::new("java:app/jdbc/orders", "org.apache.derby.jdbc.ClientDataSource")
                .with_url("jdbc:derby://localhost/orders")
                .with_property("cache=on")
                .with_property("broken"),
        ),
    );
    let config = ComponentNamespaceConfig::new(identity("orders.war", "Config")).with_injection_class(class);
    let mut saved = SavedBindingTables::new();

    let error = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap_err();
    assert!(matches!(
        error.as_configuration_error(),
        Some(ConfigurationError::InvalidProperty { property, .. }) if property == "broken"
    ));
}

#[test]
fn test_definition_descriptor_overrides_annotation() {
    init_test_logger();
    let engine = engine();
    let class = Arc::new(
        ClassDescriptor::new("com.acme.Config").with_annotation(
            ResourceDefinitionAnnotation::new("java:app/jdbc/orders", "org.apache.derby.jdbc.ClientDataSource")
                .with_url("jdbc:derby://localhost/annotated")
                .with_property("cache=on")
                .with_property("fetch=64"),
        ),
    );
    let config = ComponentNamespaceConfig::new(identity("orders.war", "Config"))
        .with_injection_class(class)
        .with_resource_definition(
            ResourceDefinitionDecl::new("java:app/jdbc/orders")
                .with_url("jdbc:derby://db.internal/orders")
                .with_max_pool_size(16)
                .with_property("cache", "off"),
        );
    let mut saved = SavedBindingTables::new();

    let metadata = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap();

    let binding = metadata.binding("java:app/jdbc/orders").unwrap();
    let reference = reference_of(binding.binding_object().unwrap());
    assert_eq!(reference.class_name, "org.apache.derby.jdbc.ClientDataSource");
    assert_eq!(reference.factory_name, "resource-definition");
    assert_eq!(reference.address("url"), Some("jdbc:derby://db.internal/orders"));
    assert_eq!(reference.address("max-pool-size"), Some("16"));
    assert_eq!(reference.address("transactional"), Some("true"));

    let properties: Vec<&str> = reference.addresses_of("property").collect();
    assert_eq!(properties, ["cache=off", "fetch=64"]);
}

#[test]
fn test_unlinkable_reference_type_fails_under_strict_settings() {
    init_test_logger();
    let engine = InjectionEngine::with_default_processors(EngineSettings::strict()).unwrap();
    let resolver = InMemoryClassResolver::new().with_broken_class("com.acme.Broken", "缺少依赖 com.acme.Base");
    let config = ComponentNamespaceConfig::new(identity("orders.jar", "OrderBean"))
        .with_class_resolver(Arc::new(resolver))
        .with_resource_ref(ResourceRefDecl::resource_ref("res/broken").with_type("com.acme.Broken"));
    let mut saved = SavedBindingTables::new();

    let error = engine
        .process_component(&config, &JavaNamespace::new(), &mut saved)
        .unwrap_err();

    match error.as_configuration_error() {
        Some(ConfigurationError::ClassLinkage { class_name, message, .. }) => {
            assert_eq!(class_name, "com.acme.Broken");
            assert!(message.contains("com.acme.Base"));
        }
        other => panic!("期望类链接错误, 实际: {other:?}"),
    }
}
