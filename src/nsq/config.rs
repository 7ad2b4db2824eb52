//! Daemon options and `nsq-service` configuration / 守护进程选项与`nsq-service`配置
//!
//! Defaults follow the daemons' own defaults, see
//! <https://nsq.io/components/nsqd.html>.

use crate::config::{AppConfig, LogConfig};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// nsqlookupd options / nsqlookupd选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupdOptions {
    /// Executable to run / 可执行文件
    pub binary: PathBuf,
    pub tcp_address: String,
    pub http_address: String,
    pub broadcast_address: Option<String>,
    pub log_level: String,
}

impl Default for LookupdOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("nsqlookupd"),
            tcp_address: "0.0.0.0:4160".to_string(),
            http_address: "0.0.0.0:4161".to_string(),
            broadcast_address: None,
            log_level: "warn".to_string(),
        }
    }
}

impl LookupdOptions {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("-tcp-address={}", self.tcp_address),
            format!("-http-address={}", self.http_address),
            format!("-log-level={}", self.log_level),
        ];
        if let Some(addr) = &self.broadcast_address {
            args.push(format!("-broadcast-address={}", addr));
        }
        args
    }
}

/// nsqd options / nsqd选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NsqdOptions {
    pub binary: PathBuf,
    pub tcp_address: String,
    pub http_address: String,
    /// Empty means a fresh temporary directory / 为空时使用新的临时目录
    pub data_path: PathBuf,
    /// nsqlookupd TCP addresses to announce to / 需要注册的nsqlookupd TCP地址
    pub lookupd_tcp_addresses: Vec<String>,
    pub broadcast_address: Option<String>,
    pub mem_queue_size: Option<u64>,
    pub log_level: String,
}

impl Default for NsqdOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("nsqd"),
            tcp_address: "0.0.0.0:4150".to_string(),
            http_address: "0.0.0.0:4151".to_string(),
            data_path: PathBuf::new(),
            lookupd_tcp_addresses: Vec::new(),
            broadcast_address: None,
            mem_queue_size: None,
            log_level: "info".to_string(),
        }
    }
}

impl NsqdOptions {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("-tcp-address={}", self.tcp_address),
            format!("-http-address={}", self.http_address),
            format!("-log-level={}", self.log_level),
        ];
        if !self.data_path.as_os_str().is_empty() {
            args.push(format!("-data-path={}", self.data_path.display()));
        }
        for addr in &self.lookupd_tcp_addresses {
            args.push(format!("-lookupd-tcp-address={}", addr));
        }
        if let Some(addr) = &self.broadcast_address {
            args.push(format!("-broadcast-address={}", addr));
        }
        if let Some(size) = self.mem_queue_size {
            args.push(format!("-mem-queue-size={}", size));
        }
        args
    }
}

/// nsqadmin options / nsqadmin选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NsqadminOptions {
    pub binary: PathBuf,
    pub http_address: String,
    pub lookupd_http_addresses: Vec<String>,
    pub nsqd_http_addresses: Vec<String>,
    pub log_level: String,
}

impl Default for NsqadminOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("nsqadmin"),
            http_address: "0.0.0.0:4171".to_string(),
            lookupd_http_addresses: Vec::new(),
            nsqd_http_addresses: Vec::new(),
            log_level: "warn".to_string(),
        }
    }
}

impl NsqadminOptions {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("-http-address={}", self.http_address),
            format!("-log-level={}", self.log_level),
        ];
        for addr in &self.lookupd_http_addresses {
            args.push(format!("-lookupd-http-address={}", addr));
        }
        for addr in &self.nsqd_http_addresses {
            args.push(format!("-nsqd-http-address={}", addr));
        }
        args
    }
}

/// Address a local peer should dial for a listen address / 监听地址对应的本地拨号地址
pub fn dial_address(listen: &str) -> String {
    match listen.rsplit_once(':') {
        Some(("0.0.0.0", port)) | Some(("", port)) => format!("127.0.0.1:{}", port),
        Some(("[::]", port)) => format!("[::1]:{}", port),
        _ => listen.to_string(),
    }
}

/// nsq-service command line arguments / nsq-service命令行参数
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "nsq-service",
    version,
    about = "Run nsqlookupd, nsqd and nsqadmin together\n同时运行nsqlookupd、nsqd与nsqadmin"
)]
pub struct CliArgs {
    /// Configuration file path / 配置文件路径
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the nsq binaries / nsq可执行文件所在目录
    #[arg(long, value_name = "DIR")]
    pub bin_dir: Option<PathBuf>,

    /// nsqd data directory / nsqd数据目录
    #[arg(long, value_name = "PATH")]
    pub data_path: Option<PathBuf>,

    /// Log level / 日志级别
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// nsq-service configuration / nsq-service配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NsqServiceConfig {
    pub log: LogConfig,
    pub lookupd: LookupdOptions,
    pub nsqd: NsqdOptions,
    pub admin: NsqadminOptions,
}

impl AppConfig for NsqServiceConfig {
    const ENV_PREFIX: &'static str = "APIX_NSQ_";
}

impl NsqServiceConfig {
    /// Load layered configuration then apply CLI overrides
    /// 加载分层配置并应用命令行覆盖
    ///
    /// nsqd announces to the local lookupd and nsqadmin reads from it unless
    /// addresses are configured explicitly.
    pub fn load_with_cli(args: &CliArgs) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load(None)?,
        };

        if let Some(dir) = &args.bin_dir {
            config.lookupd.binary = dir.join("nsqlookupd");
            config.nsqd.binary = dir.join("nsqd");
            config.admin.binary = dir.join("nsqadmin");
        }
        if let Some(path) = &args.data_path {
            config.nsqd.data_path = path.clone();
        }
        if let Some(level) = &args.log_level {
            config.log.level = level.clone();
        }

        if config.nsqd.lookupd_tcp_addresses.is_empty() {
            config
                .nsqd
                .lookupd_tcp_addresses
                .push(dial_address(&config.lookupd.tcp_address));
        }
        if config.admin.lookupd_http_addresses.is_empty() {
            config
                .admin
                .lookupd_http_addresses
                .push(dial_address(&config.lookupd.http_address));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        // Test daemon defaults / 测试守护进程默认参数
        assert_eq!(
            LookupdOptions::default().to_args(),
            vec!["-tcp-address=0.0.0.0:4160", "-http-address=0.0.0.0:4161", "-log-level=warn"]
        );
        assert_eq!(
            NsqdOptions::default().to_args(),
            vec!["-tcp-address=0.0.0.0:4150", "-http-address=0.0.0.0:4151", "-log-level=info"]
        );
        assert_eq!(
            NsqadminOptions::default().to_args(),
            vec!["-http-address=0.0.0.0:4171", "-log-level=warn"]
        );
    }

    #[test]
    fn test_nsqd_args() {
        let opts = NsqdOptions {
            data_path: PathBuf::from("/var/lib/nsq"),
            lookupd_tcp_addresses: vec!["10.0.0.1:4160".into(), "10.0.0.2:4160".into()],
            mem_queue_size: Some(0),
            ..NsqdOptions::default()
        };
        let args = opts.to_args();
        assert!(args.contains(&"-data-path=/var/lib/nsq".to_string()));
        assert!(args.contains(&"-lookupd-tcp-address=10.0.0.2:4160".to_string()));
        assert!(args.contains(&"-mem-queue-size=0".to_string()));
    }

    #[test]
    fn test_dial_address() {
        assert_eq!(dial_address("0.0.0.0:4160"), "127.0.0.1:4160");
        assert_eq!(dial_address(":4161"), "127.0.0.1:4161");
        assert_eq!(dial_address("[::]:4150"), "[::1]:4150");
        assert_eq!(dial_address("10.1.2.3:4160"), "10.1.2.3:4160");
    }

    #[test]
    #[serial_test::serial]
    fn test_load_with_cli_wires_lookupd() {
        // Test lookupd wiring and CLI overrides / 测试lookupd关联与命令行覆盖
        let args = CliArgs {
            bin_dir: Some(PathBuf::from("/opt/nsq/bin")),
            log_level: Some("debug".into()),
            ..CliArgs::default()
        };
        let config = NsqServiceConfig::load_with_cli(&args).unwrap();
        assert_eq!(config.nsqd.binary, PathBuf::from("/opt/nsq/bin/nsqd"));
        assert_eq!(config.nsqd.lookupd_tcp_addresses, vec!["127.0.0.1:4160"]);
        assert_eq!(config.admin.lookupd_http_addresses, vec!["127.0.0.1:4161"]);
        assert_eq!(config.log.level, "debug");
    }
}
