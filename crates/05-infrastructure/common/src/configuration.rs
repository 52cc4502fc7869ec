//! 引擎配置
//!
//! 校验级别、非组件作用域的立即绑定开关与缓存容量。

use crate::errors::{ConfigurationError, SettingsError};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// 校验级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// 不报告校验问题
    #[default]
    Off,
    /// 只记录日志
    Warn,
    /// 记录日志并失败
    Fail,
}

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// 校验级别
    pub validation: ValidationLevel,
    /// 是否立即绑定非组件作用域的引用
    pub bind_non_comp_eagerly: bool,
    /// set 方法缓存容量（按类计）
    pub declared_methods_cache_capacity: u64,
    /// 是否允许类级注解不指定引用名称
    pub allow_empty_reference_names: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            validation: ValidationLevel::Off,
            bind_non_comp_eagerly: false,
            declared_methods_cache_capacity: 256,
            allow_empty_reference_names: true,
        }
    }
}

impl EngineSettings {
    /// 从 TOML 文本解析配置
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// 严格校验配置，用于测试与开发环境
    pub fn strict() -> Self {
        Self {
            validation: ValidationLevel::Fail,
            allow_empty_reference_names: false,
            ..Self::default()
        }
    }

    /// 计算某个组件的校验策略
    ///
    /// 组件开启应用配置检查时，`Off` 提升为 `Warn`。
    pub fn validation_policy(&self, check_application_configuration: bool) -> ValidationPolicy {
        let level = match self.validation {
            ValidationLevel::Off if check_application_configuration => ValidationLevel::Warn,
            level => level,
        };
        ValidationPolicy { level }
    }
}

/// 单个组件的校验策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    level: ValidationLevel,
}

impl ValidationPolicy {
    /// 按级别创建校验策略
    pub const fn new(level: ValidationLevel) -> Self {
        Self { level }
    }

    /// 是否记录校验问题
    pub const fn is_loggable(self) -> bool {
        !matches!(self.level, ValidationLevel::Off)
    }

    /// 校验问题是否导致失败
    pub const fn is_failable(self) -> bool {
        matches!(self.level, ValidationLevel::Fail)
    }

    /// 报告校验问题
    ///
    /// 失败模式下返回错误，其余模式只记录日志。
    pub fn report(self, problem: ConfigurationError) -> Result<(), ConfigurationError> {
        match self.level {
            ValidationLevel::Fail => {
                error!("{}", problem);
                Err(problem)
            }
            ValidationLevel::Warn => {
                warn!("{}", problem);
                Ok(())
            }
            ValidationLevel::Off => {
                debug!("忽略校验问题: {}", problem);
                Ok(())
            }
        }
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::new(ValidationLevel::Off)
    }
}
