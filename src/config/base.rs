//! Base configuration structures and utilities
//! 基础配置结构和工具

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Base server configuration / 基础服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address / 服务器绑定地址
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub addr: SocketAddr,
    /// Enable TLS / 启用TLS
    pub enable_tls: bool,
    /// TLS certificate path / TLS证书路径
    pub cert_path: Option<String>,
    /// TLS private key path / TLS私钥路径
    pub key_path: Option<String>,
    /// Graceful shutdown deadline in seconds / 优雅关闭期限（秒）
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            enable_tls: false,
            cert_path: None,
            key_path: None,
            shutdown_timeout: 3,
        }
    }
}

impl ServerConfig {
    /// Plain HTTP config bound to `addr` / 绑定到`addr`的HTTP配置
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            addr,
            ..Self::default()
        }
    }

    /// Certificate and key paths when TLS is enabled / 启用TLS时的证书和私钥路径
    pub fn tls_paths(&self) -> Option<(PathBuf, PathBuf)> {
        if !self.enable_tls {
            return None;
        }
        Some((
            PathBuf::from(self.cert_path.clone().unwrap_or_default()),
            PathBuf::from(self.key_path.clone().unwrap_or_default()),
        ))
    }
}

fn deserialize_socket_addr<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

/// Base logging configuration / 基础日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level / 日志级别
    pub level: String,
    /// Log format / 日志格式
    pub format: String,
    /// Log output file / 日志输出文件
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

impl LogConfig {
    /// Convert to the common LoggingConfig used by init_tracing
    /// 转换为init_tracing使用的通用LoggingConfig
    pub fn to_logging_config(&self) -> crate::config::LoggingConfig {
        crate::config::LoggingConfig {
            level: self.level.clone(),
            format: self.format.clone(),
            file_enabled: self.file.is_some(),
            file_path: self.file.as_ref().map(PathBuf::from),
        }
    }
}
