//! 注入绑定
//!
//! 一个绑定对应组件中的一个引用名称。扫描阶段合并声明，解析阶段得到绑定对象，
//! 运行期由绑定对象创建注入对象。

use crate::collector::TargetCollector;
use crate::context::ProcessorContext;
use crate::merge::MergeSite;
use crate::registry::EngineRegistry;
use crate::strategy::{ContextData, DefinitionData, ResourceData};
use injection_abstractions::{
    Annotation, BoundObject, FactoryError, InitializerArguments, InjectionTargetContext, InjectionTargetDecl, Member,
    NamespaceEntry, ObjectFactory, Reference, ReferenceKind,
};
use injection_common::{
    compatibility, most_specific, ComponentIdentity, ConfigurationError, ConfigurationResult, InjectionError,
    InjectionResult, NamespaceScope, TypeDescriptor, OBJECT_TYPE,
};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

/// 每种引用类型各自的绑定数据
#[derive(Debug, Clone)]
pub enum BindingData {
    Resource(ResourceData),
    ResourceDefinition(DefinitionData),
    ContainerContext(ContextData),
}

/// 无名称绑定的键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleBindingKey {
    /// 声明类名称
    pub class_name: String,
    /// 属性名称
    pub property: String,
}

/// 解析得到的绑定对象
#[derive(Clone)]
pub enum BindingObject {
    /// 直接可用的值
    Value(BoundObject),
    /// 由工厂创建对象的引用
    Reference(Reference),
    /// 初始化方法的每个参数各一个引用
    Composite(Vec<Reference>),
}

impl fmt::Debug for BindingObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Value(..)"),
            Self::Reference(reference) => f.debug_tuple("Reference").field(reference).finish(),
            Self::Composite(references) => f.debug_tuple("Composite").field(references).finish(),
        }
    }
}

/// 解析结果
///
/// 同一作用域名称在多个组件之间共享同一个解析结果。
pub struct ResolvedObject {
    binding_object: Option<BindingObject>,
    factory: OnceCell<Arc<dyn ObjectFactory>>,
    registry: Arc<EngineRegistry>,
}

impl ResolvedObject {
    fn new(binding_object: Option<BindingObject>, registry: Arc<EngineRegistry>) -> Self {
        Self {
            binding_object,
            factory: OnceCell::new(),
            registry,
        }
    }

    /// 绑定对象，`None` 表示空绑定
    pub const fn binding_object(&self) -> Option<&BindingObject> {
        self.binding_object.as_ref()
    }

    fn factory(&self, reference: &Reference) -> InjectionResult<&Arc<dyn ObjectFactory>> {
        self.factory.get_or_try_init(|| {
            self.registry
                .named_factory(&reference.factory_name)
                .cloned()
                .ok_or_else(|| InjectionError::FactoryNotFound {
                    factory: reference.factory_name.clone(),
                })
        })
    }

    fn create_object(&self, context: &mut InjectionTargetContext, name: &str) -> InjectionResult<Option<BoundObject>> {
        let creation_failed = |source: FactoryError| InjectionError::ObjectCreationFailed {
            reference: name.to_string(),
            source,
        };
        match &self.binding_object {
            None => Ok(None),
            Some(BindingObject::Value(value)) => Ok(Some(value.clone())),
            Some(BindingObject::Reference(reference)) => self
                .factory(reference)?
                .get_object_instance(reference, context)
                .map_err(creation_failed),
            Some(BindingObject::Composite(references)) => {
                let mut arguments = Vec::with_capacity(references.len());
                for reference in references {
                    let factory = self.registry.named_factory(&reference.factory_name).ok_or_else(|| {
                        InjectionError::FactoryNotFound {
                            factory: reference.factory_name.clone(),
                        }
                    })?;
                    match factory.get_object_instance(reference, context).map_err(creation_failed)? {
                        Some(argument) => arguments.push(argument),
                        None => return Ok(None),
                    }
                }
                Ok(Some(Arc::new(InitializerArguments(arguments)) as BoundObject))
            }
        }
    }
}

impl fmt::Debug for ResolvedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedObject")
            .field("binding_object", &self.binding_object)
            .field("factory_cached", &self.factory.get().is_some())
            .finish_non_exhaustive()
    }
}

/// 注入绑定
#[derive(Debug, Clone)]
pub struct Binding {
    id: u64,
    kind: ReferenceKind,
    identity: ComponentIdentity,
    jndi_name: String,
    normalized_name: String,
    scope: Option<NamespaceScope>,
    simple_key: Option<SimpleBindingKey>,
    injection_type: Option<TypeDescriptor>,
    injection_type_name: Option<String>,
    source_annotation: Option<Annotation>,
    data: BindingData,
    targets: TargetCollector,
    resolve_attempted: bool,
    resolved: Option<Arc<ResolvedObject>>,
    complete: bool,
    derived: bool,
    first_in_scope: bool,
}

impl Binding {
    /// 创建命名绑定
    pub fn new(kind: ReferenceKind, identity: ComponentIdentity, name: &str, data: BindingData) -> Self {
        let normalized_name = NamespaceScope::normalize(name).to_string();
        Self {
            id: NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            identity,
            jndi_name: NamespaceScope::denormalize(&normalized_name).into_owned(),
            scope: NamespaceScope::match_name(&normalized_name),
            normalized_name,
            simple_key: None,
            injection_type: None,
            injection_type_name: None,
            source_annotation: None,
            data,
            targets: TargetCollector::default(),
            resolve_attempted: false,
            resolved: None,
            complete: false,
            derived: false,
            first_in_scope: false,
        }
    }

    /// 创建无名称绑定，不会绑定到命名空间
    pub fn simple(kind: ReferenceKind, identity: ComponentIdentity, key: SimpleBindingKey, data: BindingData) -> Self {
        let name = format!("{}/{}", key.class_name, key.property);
        let mut binding = Self::new(kind, identity, &name, data);
        binding.scope = None;
        binding.jndi_name = name;
        binding.simple_key = Some(key);
        binding
    }

    /// 绑定标识，用于递归注入检测
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// 引用类型
    pub const fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// 组件标识
    pub const fn identity(&self) -> &ComponentIdentity {
        &self.identity
    }

    /// 完整引用名称
    pub fn jndi_name(&self) -> &str {
        &self.jndi_name
    }

    /// 归一化引用名称
    pub fn name(&self) -> &str {
        &self.normalized_name
    }

    /// 无名称绑定的键
    pub const fn simple_key(&self) -> Option<&SimpleBindingKey> {
        self.simple_key.as_ref()
    }

    /// 是否为无名称绑定
    pub const fn is_simple(&self) -> bool {
        self.simple_key.is_some()
    }

    /// 命名空间作用域，未显式指定时为 `java:comp`
    pub fn scope(&self) -> NamespaceScope {
        self.scope.unwrap_or(NamespaceScope::Comp)
    }

    /// 名称是否位于组件环境（`java:comp/env`）中
    pub const fn is_comp_env(&self) -> bool {
        self.scope.is_none()
    }

    /// 相对于作用域根的名称
    pub fn namespace_relative_name(&self) -> String {
        match self.scope {
            Some(scope) => scope
                .relative_name(&self.normalized_name)
                .unwrap_or(&self.normalized_name)
                .to_string(),
            None => format!("env/{}", self.normalized_name),
        }
    }

    /// 注入类型
    pub const fn injection_type(&self) -> Option<&TypeDescriptor> {
        self.injection_type.as_ref()
    }

    /// 注入类型名称
    pub fn injection_type_name(&self) -> Option<&str> {
        self.injection_type
            .as_ref()
            .map(TypeDescriptor::name)
            .or(self.injection_type_name.as_deref())
    }

    /// 首次发现该引用的注解
    pub const fn source_annotation(&self) -> Option<&Annotation> {
        self.source_annotation.as_ref()
    }

    pub(crate) fn set_source_annotation(&mut self, annotation: Annotation) {
        if self.source_annotation.is_none() {
            self.source_annotation = Some(annotation);
        }
    }

    /// 绑定数据
    pub const fn data(&self) -> &BindingData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut BindingData {
        &mut self.data
    }

    /// 注入目标
    pub const fn targets(&self) -> &TargetCollector {
        &self.targets
    }

    /// 元数据处理是否已完成
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// 是否由已完成的绑定派生（动态处理）
    pub const fn is_derived(&self) -> bool {
        self.derived
    }

    /// 是否为作用域名称在保存表中的第一个绑定
    pub const fn is_first_in_scope(&self) -> bool {
        self.first_in_scope
    }

    pub(crate) fn set_first_in_scope(&mut self) {
        self.first_in_scope = true;
    }

    /// 是否已尝试解析
    pub const fn is_resolve_attempted(&self) -> bool {
        self.resolve_attempted
    }

    pub(crate) fn mark_resolve_attempted(&mut self) {
        self.resolve_attempted = true;
    }

    /// 是否已得到非空的绑定对象
    pub fn is_resolved(&self) -> bool {
        self.binding_object().is_some()
    }

    /// 解析完成但绑定对象为空（例如没有值的 env-entry）
    pub fn has_null_object(&self) -> bool {
        self.resolved
            .as_ref()
            .is_some_and(|resolved| resolved.binding_object.is_none())
    }

    /// 绑定对象
    pub fn binding_object(&self) -> Option<&BindingObject> {
        self.resolved.as_ref().and_then(|resolved| resolved.binding_object())
    }

    /// 解析结果
    pub const fn resolved_object(&self) -> Option<&Arc<ResolvedObject>> {
        self.resolved.as_ref()
    }

    /// 合并现场
    pub fn merge_site(&self) -> MergeSite {
        MergeSite::new(self.identity.clone(), self.jndi_name.clone(), self.complete)
    }

    /// 校验引用名称
    ///
    /// 以 `java:` 开头但不属于任何已知作用域的名称无效。
    pub fn resolve_jndi_name(&self) -> ConfigurationResult<()> {
        if self.simple_key.is_none()
            && self.scope.is_none()
            && NamespaceScope::is_qualified(&self.normalized_name)
        {
            let problem = ConfigurationError::InvalidReferenceName {
                identity: self.identity.clone(),
                reference: self.jndi_name.clone(),
            };
            error!("{}", problem);
            return Err(problem);
        }
        Ok(())
    }

    /// 合并注入类型
    ///
    /// 新类型必须与已有类型兼容，保留两者中更具体的一个。
    pub fn set_injection_type(&mut self, candidate: &TypeDescriptor) -> ConfigurationResult<()> {
        if candidate.is_object() && self.injection_type.is_some() {
            return Ok(());
        }
        let next = match &self.injection_type {
            None => candidate.clone(),
            Some(current) => {
                if !compatibility(current, candidate).is_compatible() {
                    let problem = ConfigurationError::IncompatibleType {
                        identity: self.identity.clone(),
                        reference: self.jndi_name.clone(),
                        declared_type: current.to_string(),
                        other_type: candidate.to_string(),
                    };
                    error!("{}", problem);
                    return Err(problem);
                }
                most_specific(current, candidate).clone()
            }
        };
        self.injection_type = Some(next);
        Ok(())
    }

    /// 设置注入类型名称（没有类解析器时使用）
    ///
    /// 只能设置一次，重复设置属于引擎缺陷。
    pub fn set_injection_type_name(&mut self, type_name: impl Into<String>) -> InjectionResult<()> {
        if self.injection_type_name.is_some() {
            return Err(InjectionError::illegal_state(format!(
                "引用 {} 的注入类型名称已经设置",
                self.jndi_name
            )));
        }
        self.injection_type_name = Some(type_name.into());
        Ok(())
    }

    /// 添加部署描述符中的注入目标
    pub fn add_xml_target(&mut self, declaration: &InjectionTargetDecl, context: &ProcessorContext<'_>) -> ConfigurationResult<()> {
        let env = context.target_env(&self.identity, &self.jndi_name, self.injection_type.as_ref());
        self.targets.add_xml_target(declaration, &env)
    }

    /// 添加注解所在成员作为注入目标
    pub fn add_member_target(
        &mut self,
        member: &Member,
        allow_initializer: bool,
        context: &ProcessorContext<'_>,
    ) -> ConfigurationResult<()> {
        let env = context.target_env(&self.identity, &self.jndi_name, self.injection_type.as_ref());
        self.targets.add_member_target(member, allow_initializer, &env)
    }

    /// 解析为可直接使用的值
    pub fn bind_value(&mut self, value: BoundObject, context: &ProcessorContext<'_>) {
        self.set_binding_object(Some(BindingObject::Value(value)), context);
    }

    /// 解析为引用
    pub fn bind_reference(&mut self, reference: Reference, context: &ProcessorContext<'_>) {
        debug!("引用 {} 解析为工厂 {} 的引用", self.jndi_name, reference.factory_name);
        self.set_binding_object(Some(BindingObject::Reference(reference)), context);
    }

    /// 解析为多个参数引用
    pub fn bind_composite(&mut self, references: Vec<Reference>, context: &ProcessorContext<'_>) {
        self.set_binding_object(Some(BindingObject::Composite(references)), context);
    }

    /// 解析为空绑定对象
    pub fn bind_null(&mut self, context: &ProcessorContext<'_>) {
        debug!("引用 {} 没有绑定对象", self.jndi_name);
        self.set_binding_object(None, context);
    }

    fn set_binding_object(&mut self, object: Option<BindingObject>, context: &ProcessorContext<'_>) {
        self.resolved = Some(Arc::new(ResolvedObject::new(object, context.registry().clone())));
    }

    /// 获取注入对象
    ///
    /// 值类型的绑定对象直接返回；引用类型经由工厂创建。递归注入只在最先发现它的一层记录一次日志。
    pub fn injection_object(&self, context: &mut InjectionTargetContext) -> InjectionResult<BoundObject> {
        let resolved = self.resolved.as_ref().ok_or_else(|| self.unresolved())?;
        if let Some(BindingObject::Value(value)) = &resolved.binding_object {
            return Ok(value.clone());
        }

        let created = match context.enter(self.id, &self.jndi_name) {
            Ok(()) => {
                let created = resolved.create_object(context, &self.jndi_name);
                context.leave();
                created
            }
            Err(recursive) => Err(recursive),
        };

        match created {
            Ok(Some(object)) => Ok(object),
            Ok(None) => {
                let problem = self.unresolved();
                error!("{}", problem);
                Err(problem)
            }
            Err(failure) => Err(translate_failure(failure)),
        }
    }

    fn unresolved(&self) -> InjectionError {
        InjectionError::UnresolvedObject {
            identity: self.identity.clone(),
            reference: self.jndi_name.clone(),
            type_name: self.injection_type_name().unwrap_or(OBJECT_TYPE).to_string(),
        }
    }

    /// 保存到跨组件绑定表中的副本
    pub(crate) fn saved_copy(&self) -> Self {
        let mut saved = self.clone();
        saved.targets.clear();
        saved.complete = true;
        saved
    }

    /// 采用已保存绑定的解析结果
    pub(crate) fn adopt_resolution(&mut self, saved: &Self) {
        self.resolved = saved.resolved.clone();
    }

    /// 由已完成的绑定派生，用于动态处理
    pub(crate) fn derive_from_completed(completed: &Self) -> Self {
        let mut derived = completed.clone();
        derived.targets.clear();
        derived.complete = true;
        derived.resolve_attempted = true;
        derived.derived = true;
        derived
    }

    /// 元数据处理完成
    pub(crate) fn metadata_processing_complete(&mut self) {
        self.complete = true;
    }
}

impl NamespaceEntry for Binding {
    fn reference_name(&self) -> String {
        self.jndi_name.clone()
    }

    fn object(&self, context: &mut InjectionTargetContext) -> InjectionResult<Option<BoundObject>> {
        if self.has_null_object() {
            return Ok(None);
        }
        self.injection_object(context).map(Some)
    }
}

fn translate_failure(failure: InjectionError) -> InjectionError {
    match InjectionError::find_recursive(&failure) {
        Some((reference, chain, logged)) => {
            if !logged {
                error!("检测到递归注入: 引用 {}, 注入链: {}", reference, chain.join(" -> "));
            }
            InjectionError::RecursiveInjection {
                reference,
                chain,
                logged: true,
            }
        }
        None => failure,
    }
}
