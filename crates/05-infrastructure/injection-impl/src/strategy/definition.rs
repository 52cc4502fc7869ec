//! 资源定义策略
//!
//! 类级 `@DataSourceDefinition` 注解与 data-source 部署描述符声明。

use super::{unexpected_annotation, unexpected_data, ReferenceStrategy, ResolveOutcome, RESOURCE_DEFINITION_FACTORY};
use crate::binding::{Binding, BindingData};
use crate::context::ProcessorContext;
use crate::merge::{MergeSite, Merged};
use crate::processor::BindingTable;
use injection_abstractions::{
    Annotation, ClassDescriptor, Member, Reference, ReferenceKind, ResourceDefinitionAnnotation, ResourceDefinitionDecl,
};
use injection_common::{ConfigurationError, ConfigurationResult, InjectionResult};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::debug;

const KIND: ReferenceKind = ReferenceKind::ResourceDefinition;

/// 未指定实现类时使用的类型
const DEFAULT_CLASS_NAME: &str = "javax.sql.DataSource";

/// 事务隔离级别名称，用于错误信息
pub const ISOLATION_LEVELS: &[(i32, &str)] = &[
    (0, "TRANSACTION_NONE"),
    (1, "TRANSACTION_READ_UNCOMMITTED"),
    (2, "TRANSACTION_READ_COMMITTED"),
    (4, "TRANSACTION_REPEATABLE_READ"),
    (8, "TRANSACTION_SERIALIZABLE"),
];

/// 资源定义的绑定数据
#[derive(Clone, Default)]
pub struct DefinitionData {
    pub class_name: Merged<String>,
    pub description: Merged<String>,
    pub url: Merged<String>,
    pub user: Merged<String>,
    pub password: Merged<String>,
    pub database_name: Merged<String>,
    pub server_name: Merged<String>,
    pub port_number: Merged<i32>,
    pub isolation_level: Merged<i32>,
    pub initial_pool_size: Merged<i32>,
    pub max_pool_size: Merged<i32>,
    pub min_pool_size: Merged<i32>,
    pub transactional: Merged<bool>,
    pub properties: BTreeMap<String, String>,
    /// 来自部署描述符的属性名称
    pub xml_properties: HashSet<String>,
}

impl fmt::Debug for DefinitionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionData")
            .field("class_name", &self.class_name.get())
            .field("url", &self.url.get())
            .field("user", &self.user.get())
            .field("password", &self.password.get().map(|_| "********"))
            .field("database_name", &self.database_name.get())
            .field("server_name", &self.server_name.get())
            .field("port_number", &self.port_number.get())
            .field("isolation_level", &self.isolation_level.get())
            .field("transactional", &self.transactional.get())
            .field("max_pool_size", &self.max_pool_size.get())
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// 资源定义策略
#[derive(Debug, Default)]
pub struct ResourceDefinitionStrategy;

impl ResourceDefinitionStrategy {
    /// 创建资源定义策略
    pub const fn new() -> Self {
        Self
    }
}

fn data(binding: &Binding) -> InjectionResult<&DefinitionData> {
    match binding.data() {
        BindingData::ResourceDefinition(data) => Ok(data),
        _ => Err(unexpected_data(KIND, binding.kind())),
    }
}

fn data_mut(binding: &mut Binding) -> InjectionResult<&mut DefinitionData> {
    let actual = binding.kind();
    match binding.data_mut() {
        BindingData::ResourceDefinition(data) => Ok(data),
        _ => Err(unexpected_data(KIND, actual)),
    }
}

fn merge_xml(site: &MergeSite, data: &mut DefinitionData, decl: &ResourceDefinitionDecl) -> ConfigurationResult<()> {
    site.merge_xml_value(&mut data.class_name, "class-name", decl.class_name.as_ref())?;
    site.merge_xml_value(&mut data.description, "description", decl.description.as_ref())?;
    site.merge_xml_value(&mut data.url, "url", decl.url.as_ref())?;
    site.merge_xml_value(&mut data.user, "user", decl.user.as_ref())?;
    site.merge_xml_value(&mut data.password, "password", decl.password.as_ref())?;
    site.merge_xml_value(&mut data.database_name, "database-name", decl.database_name.as_ref())?;
    site.merge_xml_value(&mut data.server_name, "server-name", decl.server_name.as_ref())?;
    site.merge_xml_value(&mut data.port_number, "port-number", decl.port_number.as_ref())?;
    site.merge_xml_value(&mut data.isolation_level, "isolation-level", decl.isolation_level.as_ref())?;
    site.merge_xml_value(&mut data.initial_pool_size, "initial-pool-size", decl.initial_pool_size.as_ref())?;
    site.merge_xml_value(&mut data.max_pool_size, "max-pool-size", decl.max_pool_size.as_ref())?;
    site.merge_xml_value(&mut data.min_pool_size, "min-pool-size", decl.min_pool_size.as_ref())?;
    site.merge_xml_value(&mut data.transactional, "transactional", decl.transactional.as_ref())?;
    site.merge_xml_properties(&mut data.properties, &mut data.xml_properties, &decl.properties)
}

fn merge_annotation(
    site: &MergeSite,
    data: &mut DefinitionData,
    annotation: &ResourceDefinitionAnnotation,
) -> ConfigurationResult<()> {
    let empty = String::new();
    site.merge_annotation_value(&mut data.class_name, "className", &annotation.class_name, &empty)?;
    site.merge_annotation_value(&mut data.description, "description", &annotation.description, &empty)?;
    site.merge_annotation_value(&mut data.url, "url", &annotation.url, &empty)?;
    site.merge_annotation_value(&mut data.user, "user", &annotation.user, &empty)?;
    site.merge_annotation_value(&mut data.password, "password", &annotation.password, &empty)?;
    site.merge_annotation_value(&mut data.database_name, "databaseName", &annotation.database_name, &empty)?;
    site.merge_annotation_value(&mut data.server_name, "serverName", &annotation.server_name, &empty)?;
    site.merge_annotation_integer(&mut data.port_number, "portNumber", annotation.port_number, -1, None)?;
    site.merge_annotation_integer(
        &mut data.isolation_level,
        "isolationLevel",
        annotation.isolation_level,
        -1,
        Some(ISOLATION_LEVELS),
    )?;
    site.merge_annotation_integer(
        &mut data.initial_pool_size,
        "initialPoolSize",
        annotation.initial_pool_size,
        -1,
        None,
    )?;
    site.merge_annotation_integer(&mut data.max_pool_size, "maxPoolSize", annotation.max_pool_size, -1, None)?;
    site.merge_annotation_integer(&mut data.min_pool_size, "minPoolSize", annotation.min_pool_size, -1, None)?;
    site.merge_annotation_bool(&mut data.transactional, "transactional", annotation.transactional, true)?;
    site.merge_annotation_properties(&mut data.properties, &data.xml_properties, &annotation.properties)
}

impl ReferenceStrategy for ResourceDefinitionStrategy {
    fn kind(&self) -> ReferenceKind {
        KIND
    }

    fn process_xml(&self, table: &mut BindingTable, context: &ProcessorContext<'_>) -> InjectionResult<()> {
        for declaration in &context.config().resource_definitions {
            let binding = table.get_or_insert_with(&declaration.name, || {
                Binding::new(
                    KIND,
                    context.identity().clone(),
                    &declaration.name,
                    BindingData::ResourceDefinition(DefinitionData::default()),
                )
            });
            debug!("处理 data-source {}", binding.jndi_name());
            let site = binding.merge_site();
            merge_xml(&site, data_mut(binding)?, declaration)?;
        }
        Ok(())
    }

    fn validate_empty_name(
        &self,
        annotation: &Annotation,
        class: &ClassDescriptor,
        context: &ProcessorContext<'_>,
    ) -> ConfigurationResult<()> {
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
            BindingData::ResourceDefinition(DefinitionData::default()),
        );
        self.merge(&mut binding, annotation, class, member, context)?;
        Ok(binding)
    }

    fn merge(
        &self,
        binding: &mut Binding,
        annotation: &Annotation,
        _class: &ClassDescriptor,
        _member: Option<&Member>,
        _context: &ProcessorContext<'_>,
    ) -> InjectionResult<()> {
        let Annotation::ResourceDefinition(definition) = annotation else {
            return Err(unexpected_annotation(KIND, annotation));
        };
        binding.set_source_annotation(annotation.clone());
        let site = binding.merge_site();
        merge_annotation(&site, data_mut(binding)?, definition)?;
        Ok(())
    }

    fn resolve(&self, binding: &mut Binding, context: &ProcessorContext<'_>) -> InjectionResult<ResolveOutcome> {
        let reference = definition_reference(data(binding)?);
        binding.bind_reference(reference, context);
        Ok(ResolveOutcome::Resolved)
    }

    fn merge_saved(&self, saved: &Binding, binding: &Binding) -> ConfigurationResult<()> {
        let (BindingData::ResourceDefinition(old), BindingData::ResourceDefinition(new)) = (saved.data(), binding.data())
        else {
            return Ok(());
        };
        let site = binding.merge_site();
        site.merge_saved_value(old.class_name.get(), new.class_name.get(), "className")?;
        site.merge_saved_value(old.description.get(), new.description.get(), "description")?;
        site.merge_saved_value(old.url.get(), new.url.get(), "url")?;
        site.merge_saved_value(old.user.get(), new.user.get(), "user")?;
        if old.password.get() != new.password.get() {
            let masked = |password: Option<&String>| password.map_or("null", |_| "********");
            return Err(site.saved_conflict("password", masked(old.password.get()), masked(new.password.get())));
        }
        site.merge_saved_value(old.database_name.get(), new.database_name.get(), "databaseName")?;
        site.merge_saved_value(old.server_name.get(), new.server_name.get(), "serverName")?;
        site.merge_saved_value(old.port_number.get(), new.port_number.get(), "portNumber")?;
        site.merge_saved_value(old.isolation_level.get(), new.isolation_level.get(), "isolationLevel")?;
        site.merge_saved_value(old.initial_pool_size.get(), new.initial_pool_size.get(), "initialPoolSize")?;
        site.merge_saved_value(old.max_pool_size.get(), new.max_pool_size.get(), "maxPoolSize")?;
        site.merge_saved_value(old.min_pool_size.get(), new.min_pool_size.get(), "minPoolSize")?;
        site.merge_saved_value(
            Some(&old.transactional.value_or(true)),
            Some(&new.transactional.value_or(true)),
            "transactional",
        )?;
        for (name, value) in &old.properties {
            site.merge_saved_value(Some(value), new.properties.get(name), &format!("{name} property"))?;
        }
        for (name, value) in &new.properties {
            if !old.properties.contains_key(name) {
                site.merge_saved_value(None, Some(value), &format!("{name} property"))?;
            }
        }
        Ok(())
    }
}

/// 生成资源定义引用，每个已设置的属性一个地址项
fn definition_reference(data: &DefinitionData) -> Reference {
    let class_name = data.class_name.get().map_or(DEFAULT_CLASS_NAME, String::as_str);
    let mut reference = Reference::new(class_name, RESOURCE_DEFINITION_FACTORY);

    let strings = [
        ("description", &data.description),
        ("url", &data.url),
        ("user", &data.user),
        ("password", &data.password),
        ("database-name", &data.database_name),
        ("server-name", &data.server_name),
    ];
    for (kind, slot) in strings {
        if let Some(value) = slot.get() {
            reference = reference.with_address(kind, value.clone());
        }
    }

    let integers = [
        ("port-number", &data.port_number),
        ("isolation-level", &data.isolation_level),
        ("initial-pool-size", &data.initial_pool_size),
        ("max-pool-size", &data.max_pool_size),
        ("min-pool-size", &data.min_pool_size),
    ];
    for (kind, slot) in integers {
        if let Some(value) = slot.get() {
            reference = reference.with_address(kind, value.to_string());
        }
    }

    reference = reference.with_address("transactional", data.transactional.value_or(true).to_string());
    for (name, value) in &data.properties {
        reference = reference.with_address("property", format!("{name}={value}"));
    }
    reference
}
