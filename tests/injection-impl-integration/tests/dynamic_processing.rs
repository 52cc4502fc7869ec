//! 组件运行期新类的动态处理

mod support;

use injection_abstractions::{
    ClassDescriptor, ComponentNamespaceConfig, FieldDescriptor, InjectionTargetContext, MethodDescriptor,
    ObjectFactoryInfo, ReferenceKind, ResourceAnnotation, ResourceDefinitionAnnotation,
};
use injection_common::{ConfigurationError, EngineSettings, TypeDescriptor};
use injection_impl::{ComponentInjectionMetadata, InjectionEngine, JavaNamespace, SavedBindingTables};
use std::sync::Arc;
use support::{identity, init_test_logger, ConstantFactory, RecordingInstance};

struct Fixture {
    engine: InjectionEngine,
    config: ComponentNamespaceConfig,
    namespace: JavaNamespace,
    saved: SavedBindingTables,
    metadata: ComponentInjectionMetadata,
}

fn data_source() -> TypeDescriptor {
    TypeDescriptor::named("javax.sql.DataSource")
}

fn fixture() -> Fixture {
    init_test_logger();
    let engine = InjectionEngine::with_default_processors(EngineSettings::default()).unwrap();
    engine
        .register_object_factory(
            ReferenceKind::Resource,
            "javax.sql.DataSource",
            ObjectFactoryInfo::new("orders-ds", ConstantFactory::new("orders-pool")),
        )
        .unwrap();

    let cart = Arc::new(
        ClassDescriptor::new("com.acme.Cart")
            .with_field(FieldDescriptor::new("orders", data_source()).with_annotation(ResourceAnnotation::named("jdbc/orders"))),
    );
    let config = ComponentNamespaceConfig::new(identity("shop.war", "CartServlet")).with_injection_class(cart);
    let namespace = JavaNamespace::new();
    let mut saved = SavedBindingTables::new();
    let metadata = engine.process_component(&config, &namespace, &mut saved).unwrap();

    Fixture {
        engine,
        config,
        namespace,
        saved,
        metadata,
    }
}

#[test]
fn test_new_class_contributes_targets_and_references() {
    let mut fixture = fixture();
    let checkout = Arc::new(
        ClassDescriptor::new("com.acme.Checkout")
            .with_field(FieldDescriptor::new("orders", data_source()).with_annotation(ResourceAnnotation::named("jdbc/orders")))
            .with_method(
                MethodDescriptor::setter("setAudit", data_source()).with_annotation(ResourceAnnotation::named("jdbc/audit")),
            ),
    );
    let classes = vec![checkout.clone()];
    assert!(fixture.metadata.is_process_dynamic_needed(&classes));

    fixture
        .engine
        .process_dynamic(
            &mut fixture.metadata,
            &fixture.config,
            &classes,
            &fixture.namespace,
            &mut fixture.saved,
        )
        .unwrap();

    assert!(!fixture.metadata.is_process_dynamic_needed(&classes));
    assert_eq!(fixture.metadata.targets_for(&checkout).len(), 2);
    assert_eq!(
        fixture.metadata.reference_names(),
        ["java:comp/env/jdbc/orders", "java:comp/env/jdbc/audit"]
    );
    assert!(fixture.namespace.contains("java:comp/env/jdbc/audit"));
    assert_eq!(fixture.namespace.len(), 2);

    let mut instance = RecordingInstance::default();
    let mut context = InjectionTargetContext::new();
    fixture.metadata.inject(&checkout, &mut instance, &mut context).unwrap();
    assert_eq!(instance.field_str("orders"), Some("orders-pool"));
    assert_eq!(instance.calls, [("setAudit".to_string(), 1)]);
}

#[test]
fn test_known_classes_do_not_need_processing() {
    let fixture = fixture();
    let cart = fixture.config.injection_classes.clone();
    assert!(!fixture.metadata.is_process_dynamic_needed(&cart));

    let plain = vec![Arc::new(ClassDescriptor::new("com.acme.Plain"))];
    assert!(!fixture.metadata.is_process_dynamic_needed(&plain));
}

#[test]
fn test_subclass_inherits_completed_targets() {
    let mut fixture = fixture();
    let cart = fixture.config.injection_classes[0].clone();
    let express = Arc::new(ClassDescriptor::new("com.acme.ExpressCart").extends(cart));
    let classes = vec![express.clone()];

    assert!(!fixture.metadata.is_process_dynamic_needed(&classes));
    fixture
        .engine
        .process_dynamic(
            &mut fixture.metadata,
            &fixture.config,
            &classes,
            &fixture.namespace,
            &mut fixture.saved,
        )
        .unwrap();
    assert_eq!(fixture.metadata.targets_for(&express).len(), 1);
}

#[test]
fn test_dynamic_annotation_must_match_completed_reference() {
    let mut fixture = fixture();
    let conflicting = Arc::new(
        ClassDescriptor::new("com.acme.Refund").with_field(
            FieldDescriptor::new("orders", data_source())
                .with_annotation(ResourceAnnotation::named("jdbc/orders").with_shareable(false)),
        ),
    );

    let error = fixture
        .engine
        .process_dynamic(
            &mut fixture.metadata,
            &fixture.config,
            &[conflicting],
            &fixture.namespace,
            &mut fixture.saved,
        )
        .unwrap_err();

    match error.as_configuration_error() {
        Some(ConfigurationError::MergeConflict { attribute, .. }) => assert_eq!(attribute, "shareable"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_conflicting_names_publish_nothing() {
    let mut fixture = fixture();
    let reports = Arc::new(
        ClassDescriptor::new("com.acme.Reports")
            .with_annotation(ResourceDefinitionAnnotation::new("jdbc/reports", "org.h2.jdbcx.JdbcDataSource"))
            .with_field(FieldDescriptor::new("audit", data_source()).with_annotation(ResourceAnnotation::named("jdbc/audit")))
            .with_field(
                FieldDescriptor::new("reports", data_source()).with_annotation(ResourceAnnotation::named("jdbc/reports")),
            ),
    );

    let error = fixture
        .engine
        .process_dynamic(
            &mut fixture.metadata,
            &fixture.config,
            &[reports],
            &fixture.namespace,
            &mut fixture.saved,
        )
        .unwrap_err();

    match error.as_configuration_error() {
        Some(ConfigurationError::DuplicateReference { reference, .. }) => assert_eq!(reference, "jdbc/reports"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fixture.namespace.len(), 1);
    assert!(!fixture.namespace.contains("java:comp/env/jdbc/audit"));
    assert_eq!(fixture.metadata.reference_names(), ["java:comp/env/jdbc/orders"]);
}

#[test]
fn test_completed_name_cannot_change_kind() {
    let mut fixture = fixture();
    let definition = Arc::new(
        ClassDescriptor::new("com.acme.Migration")
            .with_annotation(ResourceDefinitionAnnotation::new("jdbc/orders", "org.h2.jdbcx.JdbcDataSource")),
    );

    let error = fixture
        .engine
        .process_dynamic(
            &mut fixture.metadata,
            &fixture.config,
            &[definition],
            &fixture.namespace,
            &mut fixture.saved,
        )
        .unwrap_err();

    assert!(matches!(
        error.as_configuration_error(),
        Some(ConfigurationError::DuplicateReference { .. })
    ));
    assert_eq!(fixture.namespace.len(), 1);
}
