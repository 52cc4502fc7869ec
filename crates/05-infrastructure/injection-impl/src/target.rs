//! 注入目标
//!
//! 运行期把绑定的注入对象写入组件实例的字段或传给注入方法。

use crate::binding::Binding;
use crate::collector::{TargetMember, TargetSpec};
use injection_abstractions::{FactoryError, InitializerArguments, InjectableInstance, InjectionTargetContext};
use injection_common::{InjectionError, InjectionResult};
use std::sync::Arc;
use tracing::debug;

/// 注入目标
#[derive(Debug, Clone)]
pub struct InjectionTarget {
    spec: TargetSpec,
    binding: Arc<Binding>,
}

impl InjectionTarget {
    /// 创建注入目标
    pub fn new(spec: TargetSpec, binding: Arc<Binding>) -> Self {
        Self { spec, binding }
    }

    /// 目标成员
    pub const fn member(&self) -> &TargetMember {
        &self.spec.member
    }

    /// 是否仅由部署描述符声明
    pub const fn is_from_xml(&self) -> bool {
        self.spec.from_xml
    }

    /// 目标所属的绑定
    pub const fn binding(&self) -> &Arc<Binding> {
        &self.binding
    }

    /// 向实例注入
    ///
    /// 绑定对象为空时不注入，保留成员的初始值。
    pub fn inject(&self, instance: &mut dyn InjectableInstance, context: &mut InjectionTargetContext) -> InjectionResult<()> {
        if self.binding.has_null_object() {
            debug!("引用 {} 没有绑定对象, 跳过 {}", self.binding.jndi_name(), self.spec.member);
            return Ok(());
        }
        let object = self.binding.injection_object(context)?;

        let result = match &self.spec.member {
            TargetMember::Field(field) => instance.set_field(field, object),
            TargetMember::Method(method) => instance.invoke_method(method, vec![object]),
            TargetMember::Initializer(method) => match object.downcast_ref::<InitializerArguments>() {
                Some(InitializerArguments(arguments)) if arguments.len() == method.parameters.len() => {
                    instance.invoke_method(method, arguments.clone())
                }
                Some(InitializerArguments(arguments)) => Err(FactoryError::from(format!(
                    "初始化方法需要 {} 个参数, 实际得到 {} 个",
                    method.parameters.len(),
                    arguments.len()
                ))),
                None => Err(FactoryError::from("初始化方法的注入对象不是参数列表")),
            },
        };

        result.map_err(|source| InjectionError::TargetInjectionFailed {
            reference: self.binding.jndi_name().to_string(),
            target: self.spec.member.to_string(),
            source,
        })
    }
}
