//! 注入引擎构建器

use crate::error::CompositionError;
use injection_abstractions::{
    AnnotationOverride, MetadataListener, ObjectFactory, ObjectFactoryInfo, OverrideReferenceFactory, ReferenceKind,
};
use injection_common::EngineSettings;
use injection_impl::InjectionEngine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// 构建时执行的注册
enum Registration {
    ObjectFactory {
        kind: ReferenceKind,
        type_name: String,
        info: ObjectFactoryInfo,
    },
    NamedFactory {
        name: String,
        factory: Arc<dyn ObjectFactory>,
    },
    OverrideReferenceFactory {
        kind: ReferenceKind,
        factory: Arc<dyn OverrideReferenceFactory>,
    },
    AnnotationOverride {
        kind: ReferenceKind,
        processor: Arc<dyn AnnotationOverride>,
    },
    Listener(Arc<dyn MetadataListener>),
}

/// 注入引擎构建器
///
/// 配置按默认值、显式设置、配置文件、环境变量的顺序叠加，后者覆盖前者。
pub struct EngineBuilder {
    /// 显式设置的引擎配置
    settings: EngineSettings,
    /// 配置文件
    settings_file: Option<PathBuf>,
    /// 环境变量前缀
    env_prefix: Option<String>,
    /// 日志配置，未设置时不初始化订阅器
    logging: Option<LoggingConfig>,
    registrations: Vec<Registration>,
}

impl EngineBuilder {
    /// 创建新的引擎构建器
    pub fn new() -> Self {
        Self {
            settings: EngineSettings::default(),
            settings_file: None,
            env_prefix: None,
            logging: None,
            registrations: Vec::new(),
        }
    }

    /// 设置引擎配置
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 从 TOML 配置文件加载引擎配置
    pub fn with_settings_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, CompositionError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CompositionError::BootstrapFailed {
                message: format!("配置文件不存在: {}", path.display()),
            });
        }

        info!("添加引擎配置文件: {}", path.display());
        self.settings_file = Some(path.to_path_buf());
        Ok(self)
    }

    /// 从环境变量加载引擎配置，例如前缀 `INJECTION` 对应 `INJECTION_VALIDATION=fail`
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        let prefix = prefix.into();
        info!("添加环境变量配置源，前缀: {}", prefix);
        self.env_prefix = Some(prefix);
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// 注册对象工厂
    pub fn with_object_factory(mut self, kind: ReferenceKind, type_name: impl Into<String>, info: ObjectFactoryInfo) -> Self {
        self.registrations.push(Registration::ObjectFactory {
            kind,
            type_name: type_name.into(),
            info,
        });
        self
    }

    /// 注册命名对象工厂
    pub fn with_named_factory(mut self, name: impl Into<String>, factory: Arc<dyn ObjectFactory>) -> Self {
        self.registrations.push(Registration::NamedFactory {
            name: name.into(),
            factory,
        });
        self
    }

    /// 注册覆盖引用工厂
    pub fn with_override_reference_factory(mut self, kind: ReferenceKind, factory: Arc<dyn OverrideReferenceFactory>) -> Self {
        self.registrations
            .push(Registration::OverrideReferenceFactory { kind, factory });
        self
    }

    /// 注册注解覆盖处理器
    pub fn with_annotation_override(mut self, kind: ReferenceKind, processor: Arc<dyn AnnotationOverride>) -> Self {
        self.registrations
            .push(Registration::AnnotationOverride { kind, processor });
        self
    }

    /// 注册元数据监听器
    pub fn with_listener(mut self, listener: Arc<dyn MetadataListener>) -> Self {
        self.registrations.push(Registration::Listener(listener));
        self
    }

    /// 构建注入引擎
    pub fn build(self) -> Result<InjectionEngine, CompositionError> {
        if let Some(logging) = &self.logging {
            logging.install()?;
        }
        info!("开始构建注入引擎");

        let settings = self.load_settings()?;
        debug!("引擎配置: {:?}", settings);

        let engine = InjectionEngine::with_default_processors(settings)?;
        let count = self.registrations.len();
        for registration in self.registrations {
            match registration {
                Registration::ObjectFactory { kind, type_name, info } => {
                    engine.register_object_factory(kind, &type_name, info)?;
                }
                Registration::NamedFactory { name, factory } => engine.register_named_factory(&name, factory)?,
                Registration::OverrideReferenceFactory { kind, factory } => {
                    engine.register_override_reference_factory(kind, factory);
                }
                Registration::AnnotationOverride { kind, processor } => {
                    engine.register_annotation_override(kind, processor);
                }
                Registration::Listener(listener) => engine.register_listener(listener),
            }
        }

        info!("注入引擎构建完成，执行了 {} 项注册", count);
        Ok(engine)
    }

    /// 叠加各配置源
    fn load_settings(&self) -> Result<EngineSettings, CompositionError> {
        if self.settings_file.is_none() && self.env_prefix.is_none() {
            return Ok(self.settings.clone());
        }

        let mut builder = config::Config::builder().add_source(config::Config::try_from(&self.settings)?);
        if let Some(path) = &self.settings_file {
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }
        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(config::Environment::with_prefix(prefix).try_parsing(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志配置
///
/// `RUST_LOG` 存在时优先使用其中的过滤指令，否则按 `level` 过滤。
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 默认日志级别
    pub level: tracing::Level,
    /// 输出事件目标
    pub show_target: bool,
    /// 输出线程ID
    pub show_thread_ids: bool,
    /// 输出源文件
    pub show_file: bool,
    /// 输出行号
    pub show_line_number: bool,
    /// JSON 行格式输出
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 开发环境：DEBUG 级别并带源码位置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            ..Self::default()
        }
    }

    /// 生产环境：INFO 级别 JSON 输出
    pub fn production() -> Self {
        Self {
            show_target: false,
            json_format: true,
            ..Self::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
    }

    /// 安装全局订阅器，重复安装视为启动失败
    fn install(&self) -> Result<(), CompositionError> {
        let format = tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_file(self.show_file)
            .with_line_number(self.show_line_number);
        let installed = if self.json_format {
            format.json().try_init()
        } else {
            format.try_init()
        };
        installed.map_err(|e| CompositionError::BootstrapFailed {
            message: format!("日志订阅器安装失败: {e}"),
        })?;

        info!(level = %self.level, json = self.json_format, "日志订阅器已安装");
        Ok(())
    }
}
