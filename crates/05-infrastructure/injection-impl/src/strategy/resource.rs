//! 资源引用策略
//!
//! 处理 `@Resource` 注解以及 env-entry、resource-ref、resource-env-ref、
//! message-destination-ref 声明。

use super::{
    address, member_type, unexpected_annotation, unexpected_data, ReferenceStrategy, ResolveOutcome,
    ENV_ENTRY_FACTORY, INDIRECT_LOOKUP_FACTORY, MANAGED_BEAN_LINK_FACTORY, RESOURCE_AUTO_LINK_FACTORY,
    RESOURCE_REF_FACTORY,
};
use crate::binding::{Binding, BindingData};
use crate::context::ProcessorContext;
use crate::merge::Merged;
use crate::processor::BindingTable;
use injection_abstractions::{
    Annotation, AuthenticationType, BoundObject, ClassDescriptor, EnumConstant, Member, ObjectFactoryInfo, Reference,
    ReferenceBindings, ReferenceKind, ResourceXmlType,
};
use injection_common::{
    ConfigurationError, ConfigurationResult, InjectionResult, Primitive, TypeDescriptor, CLASS_TYPE, OBJECT_TYPE,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

const KIND: ReferenceKind = ReferenceKind::Resource;

/// 资源引用的绑定数据
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    pub xml_type: Merged<ResourceXmlType>,
    pub type_name: Merged<String>,
    pub value: Merged<String>,
    pub lookup: Merged<String>,
    pub authentication_type: Merged<AuthenticationType>,
    pub shareable: Merged<bool>,
    pub link: Merged<String>,
    pub mapped_name: Merged<String>,
    pub description: Merged<String>,
    /// 解析时采用的部署者绑定名称
    pub binding_name: Option<String>,
    /// 解析时采用的 env-entry 值覆盖
    pub binding_value: Option<String>,
}

impl ResourceData {
    fn effective_lookup(&self) -> Option<&String> {
        self.lookup.get().filter(|lookup| !lookup.is_empty())
    }
}

/// 资源引用策略
#[derive(Debug, Default)]
pub struct ResourceStrategy;

impl ResourceStrategy {
    /// 创建资源引用策略
    pub const fn new() -> Self {
        Self
    }
}

fn data(binding: &Binding) -> InjectionResult<&ResourceData> {
    match binding.data() {
        BindingData::Resource(data) => Ok(data),
        _ => Err(unexpected_data(KIND, binding.kind())),
    }
}

fn data_mut(binding: &mut Binding) -> InjectionResult<&mut ResourceData> {
    let actual = binding.kind();
    match binding.data_mut() {
        BindingData::Resource(data) => Ok(data),
        _ => Err(unexpected_data(KIND, actual)),
    }
}

fn type_element(xml_type: ResourceXmlType) -> &'static str {
    match xml_type {
        ResourceXmlType::EnvEntry => "env-entry-type",
        ResourceXmlType::ResourceRef => "res-type",
        ResourceXmlType::ResourceEnvRef => "resource-env-ref-type",
        ResourceXmlType::MessageDestinationRef => "message-destination-type",
    }
}

impl ReferenceStrategy for ResourceStrategy {
    fn kind(&self) -> ReferenceKind {
        KIND
    }

    fn process_xml(&self, table: &mut BindingTable, context: &ProcessorContext<'_>) -> InjectionResult<()> {
        let has_resolver = context.config().class_resolver.is_some();

        for declaration in &context.config().resource_refs {
            let lookup = declaration.lookup.as_ref().filter(|lookup| !lookup.is_empty());
            if declaration.xml_type == ResourceXmlType::EnvEntry && declaration.value.is_some() && lookup.is_some() {
                let problem = ConfigurationError::EnvEntryValueAndLookup {
                    identity: context.identity().clone(),
                    reference: declaration.name.clone(),
                };
                error!("{}", problem);
                return Err(problem.into());
            }

            let binding = table.get_or_insert_with(&declaration.name, || {
                Binding::new(
                    KIND,
                    context.identity().clone(),
                    &declaration.name,
                    BindingData::Resource(ResourceData::default()),
                )
            });
            debug!("处理 {} {}", declaration.xml_type, binding.jndi_name());

            let site = binding.merge_site();
            let data = data_mut(binding)?;
            site.merge_xml_value(&mut data.xml_type, "xml-type", Some(&declaration.xml_type))?;
            site.merge_xml_value(
                &mut data.type_name,
                type_element(declaration.xml_type),
                declaration.type_name.as_ref(),
            )?;
            site.merge_xml_value(&mut data.value, "env-entry-value", declaration.value.as_ref())?;
            site.merge_xml_value(&mut data.lookup, "lookup-name", lookup)?;
            site.merge_xml_value(
                &mut data.authentication_type,
                "res-auth",
                declaration.authentication_type.as_ref(),
            )?;
            site.merge_xml_value(&mut data.shareable, "res-sharing-scope", declaration.shareable.as_ref())?;
            site.merge_xml_value(&mut data.link, "message-destination-link", declaration.link.as_ref())?;
            site.merge_xml_value(&mut data.mapped_name, "mapped-name", declaration.mapped_name.as_ref())?;
            site.merge_xml_value(&mut data.description, "description", declaration.description.as_ref())?;

            if let Some(type_name) = &declaration.type_name {
                if has_resolver {
                    binding.set_injection_type(&context.type_descriptor(type_name)?)?;
                } else if binding.injection_type_name().is_none() {
                    binding.set_injection_type_name(type_name.clone())?;
                }
            }

            for target in &declaration.targets {
                binding.add_xml_target(target, context)?;
            }
        }
        Ok(())
    }

    fn validate_empty_name(
        &self,
        annotation: &Annotation,
        class: &ClassDescriptor,
        context: &ProcessorContext<'_>,
    ) -> ConfigurationResult<()> {
        if context.settings().allow_empty_reference_names {
            debug!("忽略类 {} 上未指定名称的 {} 注解", class.name, annotation.kind());
            return Ok(());
        }
        context.policy().report(ConfigurationError::EmptyReferenceName {
            identity: context.identity().clone(),
            annotation: annotation.kind().annotation_name().to_string(),
            class_name: class.name.clone(),
        })
    }

    fn create_binding(
        &self,
        annotation: &Annotation,
        name: &str,
        class: &ClassDescriptor,
        member: Option<&Member>,
        context: &ProcessorContext<'_>,
    ) -> InjectionResult<Binding> {
        let mut binding = Binding::new(
            KIND,
            context.identity().clone(),
            name,
            BindingData::Resource(ResourceData::default()),
        );
        self.merge(&mut binding, annotation, class, member, context)?;
        Ok(binding)
    }

    fn merge(
        &self,
        binding: &mut Binding,
        annotation: &Annotation,
        _class: &ClassDescriptor,
        member: Option<&Member>,
        context: &ProcessorContext<'_>,
    ) -> InjectionResult<()> {
        let Annotation::Resource(resource) = annotation else {
            return Err(unexpected_annotation(KIND, annotation));
        };

        if let Some(declared) = resource.resource_type.as_ref().filter(|t| !t.is_object()) {
            let declared = if declared.ancestors().is_empty() {
                context.type_descriptor(declared.name())?
            } else {
                declared.clone()
            };
            binding.set_injection_type(&declared)?;
        }
        if let Some(member_type) = member.and_then(member_type) {
            binding.set_injection_type(&member_type)?;
        }
        binding.set_source_annotation(annotation.clone());

        let site = binding.merge_site();
        let data = data_mut(binding)?;
        let empty = String::new();
        site.merge_annotation_value(
            &mut data.authentication_type,
            "authenticationType",
            &resource.authentication_type,
            &AuthenticationType::Container,
        )?;
        site.merge_annotation_bool(&mut data.shareable, "shareable", resource.shareable, true)?;
        site.merge_annotation_value(&mut data.mapped_name, "mappedName", &resource.mapped_name, &empty)?;
        site.merge_annotation_value(&mut data.description, "description", &resource.description, &empty)?;
        site.merge_annotation_value(&mut data.lookup, "lookup", &resource.lookup, &empty)?;
        Ok(())
    }

    fn resolve(&self, binding: &mut Binding, context: &ProcessorContext<'_>) -> InjectionResult<ResolveOutcome> {
        let type_name = binding
            .injection_type_name()
            .map(str::to_string)
            .or_else(|| data(binding).ok().and_then(|d| d.type_name.get().cloned()))
            .unwrap_or_else(|| OBJECT_TYPE.to_string());

        let env_entry = match data(binding)?.xml_type.get() {
            Some(ResourceXmlType::EnvEntry) => true,
            Some(_) => false,
            None => binding
                .injection_type()
                .cloned()
                .unwrap_or_else(|| TypeDescriptor::named(type_name.clone()))
                .is_env_entry_type(),
        };

        if env_entry {
            self.resolve_env_entry(binding, &type_name, context)
        } else {
            self.resolve_reference(binding, &type_name, context)
        }
    }

    fn merge_saved(&self, saved: &Binding, binding: &Binding) -> ConfigurationResult<()> {
        let (BindingData::Resource(old), BindingData::Resource(new)) = (saved.data(), binding.data()) else {
            return Ok(());
        };
        let site = binding.merge_site();
        site.merge_saved_value(saved.injection_type_name(), binding.injection_type_name(), "type")?;
        site.merge_saved_value(old.link.get(), new.link.get(), "message-destination-link")?;
        site.merge_saved_value(old.effective_lookup(), new.effective_lookup(), "lookup")?;
        site.merge_saved_value(
            Some(&old.authentication_type.value_or(AuthenticationType::Container)),
            Some(&new.authentication_type.value_or(AuthenticationType::Container)),
            "authenticationType",
        )?;
        site.merge_saved_value(
            Some(&old.shareable.value_or(true)),
            Some(&new.shareable.value_or(true)),
            "shareable",
        )?;
        site.merge_saved_value(old.binding_name.as_ref(), new.binding_name.as_ref(), "binding-name")?;
        site.merge_saved_value(old.binding_value.as_ref(), new.binding_value.as_ref(), "env-entry-value")?;
        Ok(())
    }
}

impl ResourceStrategy {
    fn resolve_env_entry(
        &self,
        binding: &mut Binding,
        type_name: &str,
        context: &ProcessorContext<'_>,
    ) -> InjectionResult<ResolveOutcome> {
        let bindings = &context.config().bindings;
        let normalized = binding.name().to_string();
        let full = binding.jndi_name().to_string();

        if let Some(target) = ReferenceBindings::find(&bindings.env_entry_bindings, &normalized, &full) {
            data_mut(binding)?.binding_name = Some(target.clone());
            binding.bind_reference(indirect_reference(type_name, target), context);
            return Ok(ResolveOutcome::Resolved);
        }

        if let Some(lookup) = data(binding)?.effective_lookup().cloned() {
            binding.bind_reference(indirect_reference(type_name, &lookup), context);
            return Ok(ResolveOutcome::Resolved);
        }

        let value = match ReferenceBindings::find(&bindings.env_entry_values, &normalized, &full) {
            Some(value) => {
                data_mut(binding)?.binding_value = Some(value.clone());
                Some(value.clone())
            }
            None => data(binding)?.value.get().cloned(),
        };

        let Some(value) = value else {
            debug!("env-entry {} 没有配置值", full);
            binding.bind_null(context);
            return Ok(ResolveOutcome::Resolved);
        };

        if type_name == CLASS_TYPE {
            return self.resolve_class_value(binding, &value, context);
        }
        let descriptor = TypeDescriptor::named(type_name);
        if !descriptor.is_env_entry_type() && !descriptor.is_object() {
            return self.resolve_enum_value(binding, type_name, value, context);
        }

        match convert_env_entry(&value, type_name) {
            Ok(object) => binding.bind_value(object, context),
            Err(invalid) => {
                let problem = ConfigurationError::InvalidEnvEntryValue {
                    identity: context.identity().clone(),
                    reference: full,
                    value,
                    type_name: type_name.to_string(),
                };
                if context.policy().is_failable() {
                    error!("{}", problem);
                    return Err(problem.into());
                }
                warn!("{}", problem);
                match invalid.fallback {
                    Some(object) => binding.bind_value(object, context),
                    None => binding.bind_null(context),
                }
            }
        }
        Ok(ResolveOutcome::Resolved)
    }

    /// `java.lang.Class` 类型的 env-entry，值为类名称
    fn resolve_class_value(
        &self,
        binding: &mut Binding,
        value: &str,
        context: &ProcessorContext<'_>,
    ) -> InjectionResult<ResolveOutcome> {
        let class_name = value.trim();
        let Some(resolver) = context.config().class_resolver.as_ref() else {
            let reference =
                Reference::new(CLASS_TYPE, ENV_ENTRY_FACTORY).with_address(address::CLASS_NAME, class_name);
            binding.bind_reference(reference, context);
            return Ok(ResolveOutcome::Resolved);
        };

        let problem = match resolver.load_class(class_name) {
            Ok(Some(class)) => {
                let object: BoundObject = class;
                binding.bind_value(object, context);
                return Ok(ResolveOutcome::Resolved);
            }
            Ok(None) => ConfigurationError::ClassNotFound {
                identity: context.identity().clone(),
                reference: binding.jndi_name().to_string(),
                class_name: class_name.to_string(),
            },
            Err(failure) => ConfigurationError::ClassLinkage {
                identity: context.identity().clone(),
                class_name: failure.class_name,
                message: failure.message,
            },
        };
        context.policy().report(problem)?;
        binding.bind_null(context);
        Ok(ResolveOutcome::Resolved)
    }

    /// 枚举类型的 env-entry，值为常量名称
    ///
    /// 非枚举的其他类型不支持，值被忽略。
    fn resolve_enum_value(
        &self,
        binding: &mut Binding,
        type_name: &str,
        value: String,
        context: &ProcessorContext<'_>,
    ) -> InjectionResult<ResolveOutcome> {
        let Some(resolver) = context.config().class_resolver.as_ref() else {
            let reference = Reference::new(type_name, ENV_ENTRY_FACTORY).with_address(address::ENUM_CONSTANT, value);
            binding.bind_reference(reference, context);
            return Ok(ResolveOutcome::Resolved);
        };

        let class = match resolver.load_class(type_name) {
            Ok(class) => class,
            Err(failure) => {
                context.policy().report(ConfigurationError::ClassLinkage {
                    identity: context.identity().clone(),
                    class_name: failure.class_name,
                    message: failure.message,
                })?;
                None
            }
        };

        match class.filter(|class| class.is_enum()) {
            Some(class) if class.has_enum_constant(&value) => {
                let object: BoundObject = Arc::new(EnumConstant {
                    type_name: class.name.clone(),
                    name: value,
                });
                binding.bind_value(object, context);
            }
            Some(class) => {
                // 枚举常量无效时不受校验级别影响
                let problem = ConfigurationError::InvalidEnvEntryValue {
                    identity: context.identity().clone(),
                    reference: binding.jndi_name().to_string(),
                    value,
                    type_name: class.name.clone(),
                };
                error!("{}", problem);
                return Err(problem.into());
            }
            None => {
                warn!(
                    "env-entry {} 的类型 {} 不支持注入值，忽略值 {}",
                    binding.jndi_name(),
                    type_name,
                    value
                );
                binding.bind_null(context);
            }
        }
        Ok(ResolveOutcome::Resolved)
    }

    fn resolve_reference(
        &self,
        binding: &mut Binding,
        type_name: &str,
        context: &ProcessorContext<'_>,
    ) -> InjectionResult<ResolveOutcome> {
        let registry = context.registry().clone();
        let current = data(binding)?.clone();
        let normalized = binding.name().to_string();
        let full = binding.jndi_name().to_string();

        if let Some(info) = registry.object_factory(KIND, type_name).filter(|info| !info.allow_override) {
            check_override_attributes(binding, type_name, info, &current, context)?;
            let reference = factory_reference(&full, type_name, info, &current);
            binding.bind_reference(reference, context);
            return Ok(ResolveOutcome::Resolved);
        }

        let bindings = &context.config().bindings;
        let tables = match current.xml_type.get() {
            Some(xml_type) => vec![bindings.for_xml_type(*xml_type)],
            None => vec![
                &bindings.resource_ref,
                &bindings.resource_env_ref,
                &bindings.message_destination_ref,
            ],
        };
        if let Some(target) = tables
            .into_iter()
            .find_map(|table| ReferenceBindings::find(table, &normalized, &full))
        {
            data_mut(binding)?.binding_name = Some(target.clone());
            let reference = Reference::new(type_name, RESOURCE_REF_FACTORY).with_address(address::BINDING_NAME, target);
            binding.bind_reference(with_resource_info(reference, &current), context);
            return Ok(ResolveOutcome::Resolved);
        }

        if let Some(lookup) = current.effective_lookup() {
            binding.bind_reference(indirect_reference(type_name, lookup), context);
            return Ok(ResolveOutcome::Resolved);
        }

        if let Some(info) = registry.object_factory(KIND, type_name) {
            binding.bind_reference(factory_reference(&full, type_name, info, &current), context);
            return Ok(ResolveOutcome::Resolved);
        }

        if let Some(link) = current.link.get() {
            binding.bind_reference(indirect_reference(type_name, link), context);
            return Ok(ResolveOutcome::Resolved);
        }

        if context.config().managed_bean_classes.contains(type_name) {
            let reference =
                Reference::new(type_name, MANAGED_BEAN_LINK_FACTORY).with_address(address::MANAGED_BEAN, type_name);
            binding.bind_reference(reference, context);
            return Ok(ResolveOutcome::Resolved);
        }

        if registry.named_factory(RESOURCE_AUTO_LINK_FACTORY).is_some() {
            let reference = Reference::new(type_name, RESOURCE_AUTO_LINK_FACTORY)
                .with_address(address::BINDING_NAME, normalized);
            binding.bind_reference(with_resource_info(reference, &current), context);
            return Ok(ResolveOutcome::Resolved);
        }

        debug!("引用 {} (类型 {}) 无法解析", full, type_name);
        Ok(ResolveOutcome::Missing)
    }
}

fn check_override_attributes(
    binding: &Binding,
    type_name: &str,
    info: &ObjectFactoryInfo,
    data: &ResourceData,
    context: &ProcessorContext<'_>,
) -> ConfigurationResult<()> {
    let invalid = |attribute: &str, value: String| {
        let problem = ConfigurationError::InvalidOverrideAttribute {
            identity: context.identity().clone(),
            reference: binding.jndi_name().to_string(),
            type_name: type_name.to_string(),
            attribute: attribute.to_string(),
            value,
        };
        error!("{}", problem);
        problem
    };

    let authentication_type = data.authentication_type.value_or(AuthenticationType::Container);
    if authentication_type != AuthenticationType::Container && !info.allowed_attributes.contains("authenticationType") {
        return Err(invalid("authenticationType", authentication_type.to_string()));
    }
    let shareable = data.shareable.value_or(true);
    if !shareable && !info.allowed_attributes.contains("shareable") {
        return Err(invalid("shareable", shareable.to_string()));
    }
    Ok(())
}

fn indirect_reference(type_name: &str, target: &str) -> Reference {
    Reference::new(type_name, INDIRECT_LOOKUP_FACTORY).with_address(address::BINDING_NAME, target)
}

fn factory_reference(full_name: &str, type_name: &str, info: &ObjectFactoryInfo, data: &ResourceData) -> Reference {
    let mut reference = Reference::new(type_name, info.factory_name.clone());
    if info.ref_addr_needed {
        reference = reference.with_address(address::REFERENCE_NAME, full_name);
    }
    with_resource_info(reference, data)
}

fn with_resource_info(reference: Reference, data: &ResourceData) -> Reference {
    let reference = reference
        .with_address(
            address::AUTHENTICATION_TYPE,
            data.authentication_type
                .value_or(AuthenticationType::Container)
                .to_string(),
        )
        .with_address(address::SHAREABLE, data.shareable.value_or(true).to_string());
    match data.mapped_name.get() {
        Some(mapped_name) => reference.with_address(address::MAPPED_NAME, mapped_name.clone()),
        None => reference,
    }
}

/// env-entry 值格式不正确
#[derive(Debug, Clone)]
pub struct EnvEntryFormatError {
    /// 校验不导致失败时绑定的值，布尔类型退化为 `false`
    pub fallback: Option<BoundObject>,
}

/// 把 env-entry 的字符串值转换为声明类型
///
/// 字符串与非基本类型保持字符串；数值与布尔值去掉首尾空白后解析，
/// 字符类型取第一个字符。
pub fn convert_env_entry(value: &str, type_name: &str) -> Result<BoundObject, EnvEntryFormatError> {
    let Some(primitive) = TypeDescriptor::named(type_name).primitive_form() else {
        return Ok(Arc::new(value.to_string()));
    };
    let invalid = || EnvEntryFormatError { fallback: None };
    let trimmed = value.trim();
    let object: BoundObject = match primitive {
        Primitive::Boolean => {
            if trimmed.eq_ignore_ascii_case("true") {
                Arc::new(true)
            } else if trimmed.eq_ignore_ascii_case("false") {
                Arc::new(false)
            } else {
                let fallback: BoundObject = Arc::new(false);
                return Err(EnvEntryFormatError {
                    fallback: Some(fallback),
                });
            }
        }
        Primitive::Char => Arc::new(value.chars().next().ok_or_else(invalid)?),
        Primitive::Byte => Arc::new(trimmed.parse::<i8>().map_err(|_| invalid())?),
        Primitive::Short => Arc::new(trimmed.parse::<i16>().map_err(|_| invalid())?),
        Primitive::Int => Arc::new(trimmed.parse::<i32>().map_err(|_| invalid())?),
        Primitive::Long => Arc::new(trimmed.parse::<i64>().map_err(|_| invalid())?),
        Primitive::Float => Arc::new(trimmed.parse::<f32>().map_err(|_| invalid())?),
        Primitive::Double => Arc::new(trimmed.parse::<f64>().map_err(|_| invalid())?),
    };
    Ok(object)
}
