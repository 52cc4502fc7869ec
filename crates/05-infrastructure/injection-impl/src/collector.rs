//! 注入目标收集
//!
//! 每个绑定持有一个收集器，记录来自注解与部署描述符的注入目标。

use crate::context::DeclaredMethodCache;
use injection_abstractions::{
    setter_name, ClassDescriptor, ClassResolver, FieldDescriptor, InjectionTargetDecl, Member, MemberKey,
    MethodDescriptor,
};
use injection_common::{
    compatibility, ComponentIdentity, ConfigurationError, ConfigurationResult, ReferenceFlowKind, TypeCompatibility,
    TypeDescriptor, ValidationPolicy,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// 注入目标成员
#[derive(Debug, Clone, PartialEq)]
pub enum TargetMember {
    /// 字段
    Field(Arc<FieldDescriptor>),
    /// 单参数 set 方法
    Method(Arc<MethodDescriptor>),
    /// 多参数初始化方法
    Initializer(Arc<MethodDescriptor>),
}

impl TargetMember {
    /// 成员标识
    pub fn key(&self) -> MemberKey {
        match self {
            Self::Field(field) => Member::Field(field.clone()).key(),
            Self::Method(method) | Self::Initializer(method) => Member::Method(method.clone()).key(),
        }
    }

    /// 声明类名称
    pub fn declaring_class(&self) -> &str {
        match self {
            Self::Field(field) => &field.declaring_class,
            Self::Method(method) | Self::Initializer(method) => &method.declaring_class,
        }
    }

    /// 属性名称
    pub fn property_name(&self) -> String {
        match self {
            Self::Field(field) => field.name.clone(),
            Self::Method(method) | Self::Initializer(method) => method.property_name(),
        }
    }

    /// 是否为字段
    pub const fn is_field(&self) -> bool {
        matches!(self, Self::Field(_))
    }

    /// 是否为静态成员
    pub fn is_static(&self) -> bool {
        match self {
            Self::Field(field) => field.is_static,
            Self::Method(method) | Self::Initializer(method) => method.is_static,
        }
    }

    /// 成员类型（初始化方法没有单一类型）
    pub fn member_type(&self) -> Option<&TypeDescriptor> {
        match self {
            Self::Field(field) => Some(&field.field_type),
            Self::Method(method) => method.single_parameter_type(),
            Self::Initializer(_) => None,
        }
    }
}

impl fmt::Display for TargetMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => write!(f, "{}.{}", field.declaring_class, field.name),
            Self::Method(method) | Self::Initializer(method) => {
                write!(f, "{}.{}", method.declaring_class, method.signature())
            }
        }
    }
}

/// 注入目标规格
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpec {
    /// 目标成员
    pub member: TargetMember,
    /// 是否仅由部署描述符声明
    pub from_xml: bool,
}

/// 延迟到客户端运行期处理的注入目标
///
/// 联邦客户端模块没有类解析器，只记录类名称与属性名称。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInjectionTarget {
    /// 目标类名称
    pub class_name: String,
    /// 目标属性名称
    pub target_name: String,
}

/// 收集目标时需要的环境
#[derive(Clone, Copy)]
pub struct TargetEnv<'a> {
    pub identity: &'a ComponentIdentity,
    pub reference: &'a str,
    pub injection_type: Option<&'a TypeDescriptor>,
    pub flow: ReferenceFlowKind,
    pub policy: ValidationPolicy,
    pub class_resolver: Option<&'a dyn ClassResolver>,
    pub methods: &'a DeclaredMethodCache,
}

/// 注入目标收集器
#[derive(Debug, Clone, Default)]
pub struct TargetCollector {
    targets: Vec<TargetSpec>,
    deferred: Vec<ClientInjectionTarget>,
}

impl TargetCollector {
    /// 已收集的注入目标
    pub fn targets(&self) -> &[TargetSpec] {
        &self.targets
    }

    /// 延迟处理的客户端注入目标
    pub fn deferred(&self) -> &[ClientInjectionTarget] {
        &self.deferred
    }

    /// 是否没有任何目标
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.deferred.is_empty()
    }

    /// 清空所有目标
    pub fn clear(&mut self) {
        self.targets.clear();
        self.deferred.clear();
    }

    /// 添加部署描述符中的注入目标
    ///
    /// 按 set 方法优先、字段其次的顺序查找目标成员。
    pub fn add_xml_target(&mut self, declaration: &InjectionTargetDecl, env: &TargetEnv<'_>) -> ConfigurationResult<()> {
        let Some(resolver) = env.class_resolver else {
            let deferred = ClientInjectionTarget {
                class_name: declaration.class_name.clone(),
                target_name: declaration.target_name.clone(),
            };
            if !self.deferred.contains(&deferred) {
                debug!(
                    "没有类解析器, 延迟处理引用 {} 的注入目标 {}.{}",
                    env.reference, deferred.class_name, deferred.target_name
                );
                self.deferred.push(deferred);
            }
            return Ok(());
        };

        let class = match resolver.load_class(&declaration.class_name) {
            Ok(Some(class)) => class,
            Ok(None) => {
                return report_linkage(
                    env,
                    ConfigurationError::ClassNotFound {
                        identity: env.identity.clone(),
                        reference: env.reference.to_string(),
                        class_name: declaration.class_name.clone(),
                    },
                )
            }
            Err(failure) => {
                return report_linkage(
                    env,
                    ConfigurationError::ClassLinkage {
                        identity: env.identity.clone(),
                        class_name: failure.class_name,
                        message: failure.message,
                    },
                )
            }
        };

        let target = find_xml_member(&class, &declaration.target_name, env)?;
        if check_modifiers(&target, env)? {
            self.insert(target, true, env)?;
        }
        Ok(())
    }

    /// 添加注解所在成员作为注入目标
    pub fn add_member_target(
        &mut self,
        member: &Member,
        allow_initializer: bool,
        env: &TargetEnv<'_>,
    ) -> ConfigurationResult<()> {
        let target = match member {
            Member::Field(field) => TargetMember::Field(field.clone()),
            Member::Method(method) if method.parameters.len() == 1 => TargetMember::Method(method.clone()),
            Member::Method(method) if allow_initializer => TargetMember::Initializer(method.clone()),
            Member::Method(method) => {
                return Err(ConfigurationError::InvalidInitializerMethod {
                    identity: env.identity.clone(),
                    reference: env.reference.to_string(),
                    class_name: method.declaring_class.clone(),
                    method: method.signature(),
                    count: method.parameters.len(),
                })
            }
        };

        if check_modifiers(&target, env)? {
            self.insert(target, false, env)?;
        }
        Ok(())
    }

    fn insert(&mut self, target: TargetMember, from_xml: bool, env: &TargetEnv<'_>) -> ConfigurationResult<()> {
        let key = target.key();
        if let Some(existing) = self.targets.iter_mut().find(|t| t.member.key() == key) {
            if !from_xml {
                existing.from_xml = false;
            }
            return Ok(());
        }

        // 同一属性不能同时以字段和 set 方法为目标
        let property = target.property_name();
        let counterpart = self.targets.iter().position(|t| {
            !matches!(t.member, TargetMember::Initializer(_))
                && !matches!(target, TargetMember::Initializer(_))
                && t.member.is_field() != target.is_field()
                && t.member.declaring_class() == target.declaring_class()
                && t.member.property_name() == property
        });
        if let Some(position) = counterpart {
            if self.targets[position].from_xml && !from_xml {
                debug!(
                    "注解目标 {} 取代部署描述符目标 {}",
                    target, self.targets[position].member
                );
                self.targets.remove(position);
            } else {
                let problem = ConfigurationError::FieldAndMethodTarget {
                    identity: env.identity.clone(),
                    reference: env.reference.to_string(),
                    class_name: target.declaring_class().to_string(),
                    property,
                };
                error!("{}", problem);
                return Err(problem);
            }
        }

        debug!("引用 {} 添加注入目标 {}", env.reference, target);
        self.targets.push(TargetSpec { member: target, from_xml });
        Ok(())
    }
}

fn report_linkage(env: &TargetEnv<'_>, problem: ConfigurationError) -> ConfigurationResult<()> {
    if env.policy.is_failable() {
        error!("{}", problem);
        return Err(problem);
    }
    warn!("{}", problem);
    Ok(())
}

fn find_xml_member(class: &ClassDescriptor, target_name: &str, env: &TargetEnv<'_>) -> ConfigurationResult<TargetMember> {
    let setter = setter_name(target_name);
    let methods = env.methods.declared_set_methods(env.identity, class, env.flow.is_client());
    let candidates: Vec<&Arc<MethodDescriptor>> = methods
        .iter()
        .filter(|m| m.name == setter && m.parameters.len() == 1)
        .collect();

    if !candidates.is_empty() {
        let grade = |method: &MethodDescriptor| match (method.single_parameter_type(), env.injection_type) {
            (Some(parameter), Some(injection)) => compatibility(parameter, injection),
            _ => TypeCompatibility::Assignable,
        };

        for wanted in [TypeCompatibility::Exact, TypeCompatibility::Boxed] {
            if let Some(method) = candidates.iter().find(|m| grade(m) == wanted) {
                return Ok(TargetMember::Method((*method).clone()));
            }
        }

        let compatible: Vec<&&Arc<MethodDescriptor>> =
            candidates.iter().filter(|m| grade(m).is_compatible()).collect();
        match compatible.as_slice() {
            [only] => return Ok(TargetMember::Method((**only).clone())),
            [first, second, ..] => {
                let problem = ConfigurationError::AmbiguousTarget {
                    identity: env.identity.clone(),
                    reference: env.reference.to_string(),
                    property: target_name.to_string(),
                    class_name: class.name.clone(),
                    first: first.signature(),
                    second: second.signature(),
                    injection_type: env
                        .injection_type
                        .map_or_else(|| "unknown".to_string(), ToString::to_string),
                };
                error!("{}", problem);
                return Err(problem);
            }
            [] => {}
        }
    }

    if let Some(field) = class.declared_field(target_name) {
        if let Some(injection) = env.injection_type {
            if !compatibility(&field.field_type, injection).is_compatible() {
                env.policy.report(incompatible(env, class, &field.name, &field.field_type, injection))?;
            }
        }
        return Ok(TargetMember::Field(field.clone()));
    }

    if let (Some(method), Some(injection)) = (candidates.first(), env.injection_type) {
        if let Some(parameter) = method.single_parameter_type() {
            env.policy.report(incompatible(env, class, &method.signature(), parameter, injection))?;
        }
        return Ok(TargetMember::Method((*method).clone()));
    }

    let problem = ConfigurationError::TargetNotFound {
        identity: env.identity.clone(),
        reference: env.reference.to_string(),
        class_name: class.name.clone(),
        setter,
        property: target_name.to_string(),
    };
    error!("{}", problem);
    Err(problem)
}

fn incompatible(
    env: &TargetEnv<'_>,
    class: &ClassDescriptor,
    member: &str,
    member_type: &TypeDescriptor,
    injection: &TypeDescriptor,
) -> ConfigurationError {
    ConfigurationError::IncompatibleTarget {
        identity: env.identity.clone(),
        reference: env.reference.to_string(),
        class_name: class.name.clone(),
        member: member.to_string(),
        member_type: member_type.to_string(),
        injection_type: injection.to_string(),
    }
}

/// 检查成员修饰符，返回 `false` 表示跳过该目标
fn check_modifiers(target: &TargetMember, env: &TargetEnv<'_>) -> ConfigurationResult<bool> {
    let illegal = |modifier: &str| ConfigurationError::IllegalModifier {
        identity: env.identity.clone(),
        reference: env.reference.to_string(),
        class_name: target.declaring_class().to_string(),
        member: target.to_string(),
        modifier: modifier.to_string(),
    };

    if let TargetMember::Field(field) = target {
        if field.is_final {
            let problem = illegal("final");
            error!("{}", problem);
            return Err(problem);
        }
    }

    let producer = matches!(target, TargetMember::Field(field) if field.producer);
    match env.flow {
        ReferenceFlowKind::Client if !target.is_static() => {
            let problem = ConfigurationError::ClientTargetNotStatic {
                identity: env.identity.clone(),
                reference: env.reference.to_string(),
                class_name: target.declaring_class().to_string(),
                member: target.to_string(),
            };
            error!("{}", problem);
            Err(problem)
        }
        ReferenceFlowKind::Ejb | ReferenceFlowKind::Web | ReferenceFlowKind::ManagedBean
            if target.is_static() && !producer =>
        {
            env.policy.report(illegal("static"))?;
            Ok(false)
        }
        _ => Ok(true),
    }
}
