//! 组合层错误

use injection_common::InjectionError;
use thiserror::Error;

/// 组合层错误
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("引擎启动失败: {message}")]
    BootstrapFailed { message: String },

    #[error("引擎配置加载失败: {source}")]
    Settings {
        #[from]
        source: config::ConfigError,
    },

    #[error("注册失败: {source}")]
    Registration {
        #[from]
        source: InjectionError,
    },
}
