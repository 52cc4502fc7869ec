//! 通过组合层构建引擎并处理组件

mod support;

use injection_abstractions::{
    Annotation, AnnotationOverride, ClassDescriptor, ComponentNamespaceConfig, ContextAnnotation, FieldDescriptor,
    InjectionTargetContext, Member, MetadataCreatedEvent, MetadataListener, ObjectFactoryInfo, ReferenceKind,
    ResourceAnnotation,
};
use injection_common::{ComponentIdentity, TypeDescriptor};
use injection_composition::EngineBuilder;
use injection_impl::{JavaNamespace, SavedBindingTables};
use std::sync::{Arc, Mutex};
use support::{identity, init_test_logger, ConstantFactory, RecordingInstance};

#[derive(Default)]
struct RecordingListener {
    events: Mutex<Vec<(ComponentIdentity, Vec<String>, usize)>>,
}

impl MetadataListener for RecordingListener {
    fn metadata_created(&self, event: &MetadataCreatedEvent<'_>) {
        self.events.lock().unwrap().push((
            event.identity.clone(),
            event.reference_names.clone(),
            event.target_class_count,
        ));
    }
}

/// 把 `@Resource` 声明的 SessionContext 转换为容器上下文注解
struct SessionContextOverride;

impl AnnotationOverride for SessionContextOverride {
    fn translate(&self, annotation: &Annotation, _class: &ClassDescriptor, member: Option<&Member>) -> Option<Annotation> {
        let Annotation::Resource(resource) = annotation else {
            return None;
        };
        let session = resource
            .resource_type
            .as_ref()
            .is_some_and(|t| t.name() == "javax.ejb.SessionContext");
        (session && member.is_some()).then(|| {
            Annotation::from(ContextAnnotation {
                context_type: resource.resource_type.clone(),
            })
        })
    }
}

#[test]
fn test_builder_registrations_drive_processing() {
    init_test_logger();
    let listener = Arc::new(RecordingListener::default());
    let engine = EngineBuilder::new()
        .with_object_factory(
            ReferenceKind::Resource,
            "javax.sql.DataSource",
            ObjectFactoryInfo::new("orders-ds", ConstantFactory::new("orders-pool")),
        )
        .with_object_factory(
            ReferenceKind::ContainerContext,
            "javax.ejb.SessionContext",
            ObjectFactoryInfo::new("session-context", ConstantFactory::new("session")),
        )
        .with_annotation_override(ReferenceKind::Resource, Arc::new(SessionContextOverride))
        .with_listener(listener.clone())
        .build()
        .unwrap();

    let bean = Arc::new(
        ClassDescriptor::new("com.acme.OrderBean")
            .with_field(
                FieldDescriptor::new("orders", TypeDescriptor::named("javax.sql.DataSource"))
                    .with_annotation(ResourceAnnotation::named("jdbc/orders")),
            )
            .with_field(
                FieldDescriptor::new("context", TypeDescriptor::named("javax.ejb.SessionContext")).with_annotation(
                    ResourceAnnotation::named("").with_type(TypeDescriptor::named("javax.ejb.SessionContext")),
                ),
            ),
    );
    let component = identity("orders.jar", "OrderBean");
    let config = ComponentNamespaceConfig::new(component.clone()).with_injection_class(bean.clone());
    let namespace = JavaNamespace::new();
    let mut saved = SavedBindingTables::new();

    let metadata = engine.process_component(&config, &namespace, &mut saved).unwrap();

    assert_eq!(metadata.reference_names(), ["java:comp/env/jdbc/orders"]);
    assert_eq!(metadata.simple_bindings().len(), 1);
    assert_eq!(metadata.simple_bindings()[0].kind(), ReferenceKind::ContainerContext);

    let events = listener.events.lock().unwrap();
    assert_eq!(*events, [(component, vec!["java:comp/env/jdbc/orders".to_string()], 1)]);

    let mut instance = RecordingInstance::default();
    let mut context = InjectionTargetContext::new();
    metadata.inject(&bean, &mut instance, &mut context).unwrap();
    assert_eq!(instance.field_str("orders"), Some("orders-pool"));
    assert_eq!(instance.field_str("context"), Some("session"));
}
