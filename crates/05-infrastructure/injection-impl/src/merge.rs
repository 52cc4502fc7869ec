//! 合并规则
//!
//! 同一引用可能在多个注解与部署描述符中声明。合并结果要么完全一致，
//! 要么产生携带组件标识、引用名称、属性名称与两个冲突值的配置错误。

use injection_common::{ComponentIdentity, ConfigurationError, ConfigurationResult};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::error;

/// 已合并的属性值
///
/// `from_xml` 为真时，注解不能再覆盖该值。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged<T> {
    value: Option<T>,
    from_xml: bool,
}

impl<T> Default for Merged<T> {
    fn default() -> Self {
        Self {
            value: None,
            from_xml: false,
        }
    }
}

impl<T> Merged<T> {
    /// 当前值
    pub const fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// 当前值是否来自部署描述符
    pub const fn is_from_xml(&self) -> bool {
        self.from_xml
    }

    /// 是否已经设置
    pub const fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

impl<T: Clone> Merged<T> {
    /// 当前值，未设置时返回默认值
    pub fn value_or(&self, default: T) -> T {
        self.value.clone().unwrap_or(default)
    }
}

/// 合并现场
///
/// 从绑定中复制出的标识信息，合并时与绑定数据的可变借用互不干扰。
#[derive(Debug, Clone)]
pub struct MergeSite {
    identity: ComponentIdentity,
    reference: String,
    complete: bool,
}

impl MergeSite {
    /// 创建合并现场
    pub fn new(identity: ComponentIdentity, reference: impl Into<String>, complete: bool) -> Self {
        Self {
            identity,
            reference: reference.into(),
            complete,
        }
    }

    /// 绑定是否已经完成（完成后任何改变都是冲突）
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// 生成合并冲突错误
    pub fn conflict(&self, attribute: &str, old_value: impl fmt::Display, new_value: impl fmt::Display) -> ConfigurationError {
        let problem = ConfigurationError::MergeConflict {
            identity: self.identity.clone(),
            reference: self.reference.clone(),
            attribute: attribute.to_string(),
            old_value: old_value.to_string(),
            new_value: new_value.to_string(),
        };
        error!("{}", problem);
        problem
    }

    /// 合并注解中的布尔属性
    ///
    /// 布尔值无法区分"未设置"，因此默认值从不产生冲突。
    pub fn merge_annotation_bool(
        &self,
        slot: &mut Merged<bool>,
        attribute: &str,
        new_value: bool,
        default: bool,
    ) -> ConfigurationResult<()> {
        if new_value == default || slot.from_xml {
            return Ok(());
        }
        match slot.value {
            Some(old) if old == new_value => Ok(()),
            Some(old) if old != default => Err(self.conflict(attribute, old, new_value)),
            _ if self.complete => Err(self.conflict(attribute, slot.value.unwrap_or(default), new_value)),
            _ => {
                slot.value = Some(new_value);
                Ok(())
            }
        }
    }

    /// 合并注解中的字符串或枚举属性
    pub fn merge_annotation_value<T>(
        &self,
        slot: &mut Merged<T>,
        attribute: &str,
        new_value: &T,
        default: &T,
    ) -> ConfigurationResult<()>
    where
        T: PartialEq + Clone + fmt::Display,
    {
        if new_value == default || slot.from_xml {
            return Ok(());
        }
        let conflicting = slot
            .value
            .as_ref()
            .map_or(self.complete, |old| old != new_value);
        if conflicting {
            let old = slot.value.as_ref().unwrap_or(default);
            return Err(self.conflict(attribute, old, new_value));
        }
        slot.value = Some(new_value.clone());
        Ok(())
    }

    /// 合并注解中的整数属性
    ///
    /// `names` 用于在错误信息中把数值显示为可读名称。
    pub fn merge_annotation_integer(
        &self,
        slot: &mut Merged<i32>,
        attribute: &str,
        new_value: i32,
        default: i32,
        names: Option<&[(i32, &str)]>,
    ) -> ConfigurationResult<()> {
        if new_value == default || slot.from_xml {
            return Ok(());
        }
        let conflicting = slot.value.map_or(self.complete, |old| old != new_value);
        if conflicting {
            let old = slot.value.unwrap_or(default);
            return Err(self.conflict(
                attribute,
                value_name(old, names),
                value_name(new_value, names),
            ));
        }
        slot.value = Some(new_value);
        Ok(())
    }

    /// 合并注解中 `name=value` 形式的属性
    ///
    /// 格式错误的条目逐个报告但不中断其余条目的合并，来自部署描述符的属性不会被覆盖。
    /// 全部条目处理完后返回遇到的第一个错误。
    pub fn merge_annotation_properties(
        &self,
        properties: &mut BTreeMap<String, String>,
        xml_names: &HashSet<String>,
        entries: &[String],
    ) -> ConfigurationResult<()> {
        let mut first_problem = None;
        for entry in entries {
            let Some((name, value)) = entry.split_once('=') else {
                let problem = ConfigurationError::InvalidProperty {
                    identity: self.identity.clone(),
                    reference: self.reference.clone(),
                    property: entry.clone(),
                };
                error!("{}", problem);
                first_problem.get_or_insert(problem);
                continue;
            };
            if xml_names.contains(name) {
                continue;
            }
            let conflicting = properties
                .get(name)
                .map_or(self.complete, |old| old != value);
            if conflicting {
                let old = properties.get(name).map_or("", String::as_str);
                let problem = self.conflict(&format!("{name} property"), old, value);
                first_problem.get_or_insert(problem);
                continue;
            }
            properties.insert(name.to_string(), value.to_string());
        }
        first_problem.map_or(Ok(()), Err)
    }

    /// 合并部署描述符中的值
    ///
    /// 新值为空时不做任何改变，两个不同的非空值冲突。
    pub fn merge_xml_value<T>(&self, slot: &mut Merged<T>, element: &str, new_value: Option<&T>) -> ConfigurationResult<()>
    where
        T: PartialEq + Clone + fmt::Display,
    {
        let Some(new_value) = new_value else {
            return Ok(());
        };
        if let Some(old) = slot.value.as_ref() {
            if old != new_value && (slot.from_xml || self.complete) {
                return Err(self.conflict(element, old, new_value));
            }
        }
        slot.value = Some(new_value.clone());
        slot.from_xml = true;
        Ok(())
    }

    /// 合并部署描述符中的属性
    pub fn merge_xml_properties(
        &self,
        properties: &mut BTreeMap<String, String>,
        xml_names: &mut HashSet<String>,
        entries: &[(String, String)],
    ) -> ConfigurationResult<()> {
        for (name, value) in entries {
            if xml_names.contains(name) {
                if let Some(old) = properties.get(name) {
                    if old != value {
                        return Err(self.conflict(&format!("{name} property"), old, value));
                    }
                }
            }
            properties.insert(name.clone(), value.clone());
            xml_names.insert(name.clone());
        }
        Ok(())
    }

    /// 与其他组件保存的绑定比较属性值
    pub fn merge_saved_value<T>(&self, saved: Option<&T>, current: Option<&T>, attribute: &str) -> ConfigurationResult<()>
    where
        T: PartialEq + fmt::Display + ?Sized,
    {
        if saved == current {
            return Ok(());
        }
        Err(self.saved_conflict(
            attribute,
            saved.map_or_else(|| "null".to_string(), ToString::to_string),
            current.map_or_else(|| "null".to_string(), ToString::to_string),
        ))
    }

    /// 生成跨组件冲突错误
    pub fn saved_conflict(
        &self,
        attribute: &str,
        old_value: impl fmt::Display,
        new_value: impl fmt::Display,
    ) -> ConfigurationError {
        let problem = ConfigurationError::SavedConflict {
            identity: self.identity.clone(),
            reference: self.reference.clone(),
            attribute: attribute.to_string(),
            old_value: old_value.to_string(),
            new_value: new_value.to_string(),
        };
        error!("{}", problem);
        problem
    }
}

fn value_name(value: i32, names: Option<&[(i32, &str)]>) -> String {
    names
        .and_then(|names| names.iter().find(|(v, _)| *v == value))
        .map_or_else(|| value.to_string(), |(_, name)| (*name).to_string())
}
