//! Configuration management for apix services
//! apix服务的配置管理
//!
//! Every binary loads its configuration through the same layers:
//! - Default values / 默认值
//! - Configuration file (TOML) / 配置文件（TOML）
//! - Environment variables / 环境变量
//! - Command line arguments / 命令行参数
//!
//! Later layers override earlier ones. Module configs (`GeoIpConfig`,
//! `NsqdOptions`, ...) are plain serde structs embedded in the
//! per-binary configuration.
//!
//! 后面的层覆盖前面的层。模块配置是嵌入在各个二进制配置中的普通serde结构。

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Base configuration shared by all applications / 所有应用程序共享的基础配置
pub mod base;
pub use base::*;


/// Layered configuration trait / 分层配置特征
/// All application configurations should implement this trait
/// 所有应用程序配置都应该实现此特征
pub trait AppConfig:
    for<'de> Deserialize<'de> + Serialize + Default + Clone + std::fmt::Debug
{
    /// Environment variable prefix, e.g. `APIX_GEOIP2_` / 环境变量前缀
    const ENV_PREFIX: &'static str;

    /// Build the layered figment without CLI overrides
    /// 构建不含CLI覆盖的分层figment
    ///
    /// Nested keys use a double underscore in the environment:
    /// `APIX_GEOIP2_SERVER__ADDR=0.0.0.0:3355`.
    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(Self::ENV_PREFIX).split("__"))
    }

    /// Load configuration from file and environment / 从文件和环境变量加载配置
    fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(path)
            .extract()
            .context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file / 从特定文件加载配置
    fn load_from_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("configuration file not found: {}", path.display());
        }
        Self::load(Some(path.as_path()))
    }

    /// Validate the configuration / 验证配置
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Common logging configuration / 通用日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) / 日志级别
    pub level: String,
    /// Log format (json, compact, pretty) / 日志格式
    pub format: String,
    /// Enable file logging / 启用文件日志
    pub file_enabled: bool,
    /// Log file path / 日志文件路径
    pub file_path: Option<PathBuf>,
}

static FILE_LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_enabled: false,
            file_path: None,
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn format_layer<W>(format: &str, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(ansi)
        .with_timer(fmt::time::uptime())
        .with_writer(writer);
    match format {
        "json" => layer.json().boxed(),
        "compact" => layer.compact().boxed(),
        _ => layer.pretty().boxed(),
    }
}

/// Initialize tracing based on logging configuration
/// 基于日志配置初始化跟踪
///
/// `RUST_LOG` takes precedence over the configured level. The file layer
/// never uses the pretty format.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config.level.trim().is_empty() {
            EnvFilter::new("info")
        } else {
            EnvFilter::new(config.level.clone())
        }
    });

    let mut layers: Vec<BoxedLayer> = vec![format_layer(&config.format, std::io::stdout, true)];

    if config.file_enabled {
        if let Some(path) = config.file_path.as_ref() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create log dir: {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file: {}", path.display()))?;
            let (file_writer, guard) = tracing_appender::non_blocking(file);
            let _ = FILE_LOG_GUARD.set(guard);
            let file_format = if config.format == "json" { "json" } else { "compact" };
            layers.push(format_layer(file_format, file_writer, false));
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .context("tracing subscriber already installed")?;

    Ok(())
}
