//! 可注入实例
//!
//! 字段赋值与方法调用由容器的反射层实现。

use crate::factory::{BoundObject, FactoryError};
use crate::member::{FieldDescriptor, MethodDescriptor};

/// 可注入实例 trait
pub trait InjectableInstance {
    /// 为字段赋值
    fn set_field(&mut self, field: &FieldDescriptor, value: BoundObject) -> Result<(), FactoryError>;

    /// 调用注入方法
    fn invoke_method(&mut self, method: &MethodDescriptor, arguments: Vec<BoundObject>) -> Result<(), FactoryError>;
}
