//! # 注入引擎组合层
//!
//! 负责把配置加载、日志初始化与默认注册组合成一个可用的 [`InjectionEngine`]。
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use injection_composition::{EngineBuilder, LoggingConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = EngineBuilder::new()
//!         .with_settings_file("config/injection.toml")?
//!         .with_env_prefix("INJECTION")
//!         .with_logging(LoggingConfig::development())
//!         .build()?;
//!
//!     println!("已注册 {} 个处理器", engine.registry().strategies().count());
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod error;

pub use builder::{EngineBuilder, LoggingConfig};
pub use error::CompositionError;
pub use injection_impl::InjectionEngine;
