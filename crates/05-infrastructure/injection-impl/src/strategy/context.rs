//! 容器上下文策略
//!
//! 无名称注入容器提供的对象。绑定以 (类, 属性) 为键，不参与合并，
//! 支持多参数初始化方法。

use super::{unexpected_annotation, unexpected_data, ReferenceStrategy, ResolveOutcome};
use crate::binding::{Binding, BindingData, SimpleBindingKey};
use crate::context::ProcessorContext;
use crate::registry::EngineRegistry;
use injection_abstractions::{
    Annotation, ClassDescriptor, ContextAnnotation, Member, ParameterDescriptor, Reference, ReferenceKind,
};
use injection_common::{InjectionResult, TypeDescriptor};
use tracing::debug;

const KIND: ReferenceKind = ReferenceKind::ContainerContext;

/// 参数限定注解的地址项类型
const QUALIFIER: &str = "qualifier";

/// 容器上下文的绑定数据
///
/// 字段与单参数方法只有一个参数，初始化方法按声明顺序列出全部参数。
#[derive(Debug, Clone, Default)]
pub struct ContextData {
    pub parameters: Vec<ParameterDescriptor>,
}

/// 容器上下文策略
#[derive(Debug, Default)]
pub struct ContainerContextStrategy;

impl ContainerContextStrategy {
    /// 创建容器上下文策略
    pub const fn new() -> Self {
        Self
    }
}

fn data(binding: &Binding) -> InjectionResult<&ContextData> {
    match binding.data() {
        BindingData::ContainerContext(data) => Ok(data),
        _ => Err(unexpected_data(KIND, binding.kind())),
    }
}

fn parameters(annotation: &ContextAnnotation, member: Option<&Member>) -> Vec<ParameterDescriptor> {
    if let Some(context_type) = &annotation.context_type {
        return vec![ParameterDescriptor {
            parameter_type: context_type.clone(),
            qualifiers: Vec::new(),
        }];
    }
    match member {
        Some(Member::Field(field)) => vec![ParameterDescriptor {
            parameter_type: field.field_type.clone(),
            qualifiers: Vec::new(),
        }],
        Some(Member::Method(method)) => method.parameters.clone(),
        None => Vec::new(),
    }
}

fn context_binding(binding: Binding, annotation: &Annotation, member: Option<&Member>) -> InjectionResult<Binding> {
    let Annotation::Context(context_annotation) = annotation else {
        return Err(unexpected_annotation(KIND, annotation));
    };
    let mut binding = binding;
    let parameters = parameters(context_annotation, member);
    if let [single] = parameters.as_slice() {
        binding.set_injection_type(&single.parameter_type)?;
    }
    binding.set_source_annotation(annotation.clone());
    if let BindingData::ContainerContext(data) = binding.data_mut() {
        data.parameters = parameters;
    }
    Ok(binding)
}

impl ReferenceStrategy for ContainerContextStrategy {
    fn kind(&self) -> ReferenceKind {
        KIND
    }

    fn default_name(&self, _class: &ClassDescriptor, _member: &Member) -> Option<String> {
        None
    }

    fn supports_initializer_methods(&self) -> bool {
        true
    }

    fn create_binding(
        &self,
        annotation: &Annotation,
        name: &str,
        _class: &ClassDescriptor,
        member: Option<&Member>,
        context: &ProcessorContext<'_>,
    ) -> InjectionResult<Binding> {
        let binding = Binding::new(
            KIND,
            context.identity().clone(),
            name,
            BindingData::ContainerContext(ContextData::default()),
        );
        context_binding(binding, annotation, member)
    }

    fn create_simple_binding(
        &self,
        annotation: &Annotation,
        key: SimpleBindingKey,
        member: &Member,
        context: &ProcessorContext<'_>,
    ) -> InjectionResult<Binding> {
        let binding = Binding::simple(
            KIND,
            context.identity().clone(),
            key,
            BindingData::ContainerContext(ContextData::default()),
        );
        context_binding(binding, annotation, Some(member))
    }

    fn merge(
        &self,
        binding: &mut Binding,
        annotation: &Annotation,
        _class: &ClassDescriptor,
        member: Option<&Member>,
        _context: &ProcessorContext<'_>,
    ) -> InjectionResult<()> {
        let Annotation::Context(context_annotation) = annotation else {
            return Err(unexpected_annotation(KIND, annotation));
        };
        if let [single] = parameters(context_annotation, member).as_slice() {
            binding.set_injection_type(&single.parameter_type)?;
        }
        Ok(())
    }

    fn resolve(&self, binding: &mut Binding, context: &ProcessorContext<'_>) -> InjectionResult<ResolveOutcome> {
        let registry = context.registry().clone();
        let mut references = Vec::new();
        for parameter in &data(binding)?.parameters {
            let Some(reference) = context_reference(&registry, &parameter.parameter_type, &parameter.qualifiers) else {
                debug!("没有为上下文类型 {} 注册对象工厂", parameter.parameter_type);
                return Ok(ResolveOutcome::Missing);
            };
            references.push(reference);
        }

        match references.len() {
            0 => Ok(ResolveOutcome::Missing),
            1 => {
                let reference = references.remove(0);
                binding.bind_reference(reference, context);
                Ok(ResolveOutcome::Resolved)
            }
            _ => {
                binding.bind_composite(references, context);
                Ok(ResolveOutcome::Resolved)
            }
        }
    }
}

fn context_reference(
    registry: &EngineRegistry,
    context_type: &TypeDescriptor,
    qualifiers: &[String],
) -> Option<Reference> {
    let info = registry.object_factory(KIND, context_type.name())?;
    let reference = Reference::new(context_type.name(), info.factory_name.clone());
    Some(
        qualifiers
            .iter()
            .fold(reference, |reference, qualifier| reference.with_address(QUALIFIER, qualifier.clone())),
    )
}
