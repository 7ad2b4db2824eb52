//! GeoIP2 client configuration / GeoIP2客户端配置

use crate::config::{AppConfig, LogConfig, ServerConfig};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// MaxMind permalink for an edition; `{license_key}` is substituted at download time
/// MaxMind版本的下载链接，下载时替换`{license_key}`
pub const DEFAULT_ASN_URL: &str = "https://download.maxmind.com/app/geoip_download?edition_id=GeoLite2-ASN&license_key={license_key}&suffix=tar.gz";
pub const DEFAULT_CITY_URL: &str = "https://download.maxmind.com/app/geoip_download?edition_id=GeoLite2-City&license_key={license_key}&suffix=tar.gz";

/// Weekly refresh, Wednesday 02:30 UTC / 每周三02:30（UTC）刷新
pub const DEFAULT_UPDATE_SCHEDULE: &str = "0 30 2 * * Wed";

/// GeoIP2 configuration / GeoIP2配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoIpConfig {
    /// Directory holding the `.mmdb` files / 存放`.mmdb`文件的目录
    pub db_dir: PathBuf,
    /// Per-lookup timeout in seconds / 单次查询超时（秒）
    pub timeout: u64,
    /// Maximum concurrent lookups / 最大并发查询数
    pub max_connect: usize,
    /// MaxMind license key / MaxMind许可证密钥
    pub license_key: String,
    pub asn_url: String,
    pub city_url: String,
    /// Check the archive against its published sha256 / 校验压缩包的sha256
    pub verify_checksum: bool,
    /// Download timeout in seconds / 下载超时（秒）
    pub download_timeout: u64,
    /// Extra attempts after a failed refresh / 刷新失败后的重试次数
    pub update_retries: u32,
    /// First retry delay in milliseconds, doubled on each attempt / 首次重试延迟（毫秒），每次翻倍
    pub retry_backoff_ms: u64,
    /// Cron expression (with seconds) for refreshes / 刷新的cron表达式（含秒）
    pub update_schedule: String,
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            db_dir: PathBuf::from("maxminddb"),
            timeout: 15,
            max_connect: 0x64,
            license_key: String::new(),
            asn_url: DEFAULT_ASN_URL.to_string(),
            city_url: DEFAULT_CITY_URL.to_string(),
            verify_checksum: false,
            download_timeout: 300,
            update_retries: 3,
            retry_backoff_ms: 2000,
            update_schedule: DEFAULT_UPDATE_SCHEDULE.to_string(),
        }
    }
}

impl GeoIpConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout)
    }

    /// Staging directory for downloads / 下载暂存目录
    pub fn download_dir(&self) -> PathBuf {
        self.db_dir.join("download")
    }
}

/// geoip2-server command line arguments / geoip2-server命令行参数
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "geoip2-server",
    version,
    about = "GeoIP2 lookup service\nGeoIP2查询服务",
    long_about = "Serves ASN and City lookups from MaxMind GeoLite2 databases and refreshes them on a schedule.\n基于MaxMind GeoLite2数据库提供ASN与城市查询，并按计划刷新数据库。"
)]
pub struct CliArgs {
    /// Configuration file path / 配置文件路径
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Listen address / 监听地址
    #[arg(long, value_name = "ADDR", help = "Listen address (e.g., 0.0.0.0:3355) / 监听地址")]
    pub addr: Option<SocketAddr>,

    /// Database directory / 数据库目录
    #[arg(long, value_name = "DIR")]
    pub db_dir: Option<PathBuf>,

    /// MaxMind license key / MaxMind许可证密钥
    #[arg(long, value_name = "KEY")]
    pub license_key: Option<String>,

    /// Log level / 日志级别
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Worker threads as a count or percentage of cores / 工作线程数（数量或核数百分比）
    #[arg(long, value_name = "CPU", default_value = "100%")]
    pub cpu: String,
}

/// geoip2-server configuration / geoip2-server配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Geoip2ServerConfig {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub geoip: GeoIpConfig,
}

impl Default for Geoip2ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::with_addr(SocketAddr::from(([0, 0, 0, 0], 3355))),
            log: LogConfig::default(),
            geoip: GeoIpConfig::default(),
        }
    }
}

impl AppConfig for Geoip2ServerConfig {
    const ENV_PREFIX: &'static str = "APIX_GEOIP2_";

    fn validate(&self) -> anyhow::Result<()> {
        if self.geoip.max_connect == 0 {
            anyhow::bail!("geoip.max_connect must be greater than 0");
        }
        super::RefreshScheduler::new(&self.geoip.update_schedule)?;
        Ok(())
    }
}

impl Geoip2ServerConfig {
    /// Load layered configuration then apply CLI overrides
    /// 加载分层配置并应用命令行覆盖
    pub fn load_with_cli(args: &CliArgs) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load(None)?,
        };
        if let Some(addr) = args.addr {
            config.server.addr = addr;
        }
        if let Some(dir) = &args.db_dir {
            config.geoip.db_dir = dir.clone();
        }
        if let Some(key) = &args.license_key {
            config.geoip.license_key = key.clone();
        }
        if let Some(level) = &args.log_level {
            config.log.level = level.clone();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_server_defaults() {
        let config = Geoip2ServerConfig::default();
        assert_eq!(config.server.addr.port(), 3355);
        assert_eq!(config.geoip.max_connect, 100);
        assert_eq!(config.geoip.lookup_timeout(), Duration::from_secs(15));
        assert_eq!(config.geoip.download_dir(), PathBuf::from("maxminddb/download"));
    }

    #[test]
    #[serial_test::serial]
    fn test_load_with_cli() {
        // Test file then CLI layering / 测试文件与命令行的分层覆盖
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[geoip]\ndb_dir = \"/data/geo\"\nmax_connect = 8\n\n[log]\nlevel = \"warn\""
        )
        .unwrap();
        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            addr: Some("127.0.0.1:9000".parse().unwrap()),
            license_key: Some("KEY".into()),
            ..CliArgs::default()
        };
        let config = Geoip2ServerConfig::load_with_cli(&args).unwrap();
        assert_eq!(config.geoip.db_dir, PathBuf::from("/data/geo"));
        assert_eq!(config.geoip.max_connect, 8);
        assert_eq!(config.geoip.license_key, "KEY");
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.server.addr.port(), 9000);
        assert_eq!(config.geoip.timeout, 15);
    }

    #[test]
    #[serial_test::serial]
    fn test_invalid_schedule_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[geoip]\nupdate_schedule = \"whenever\"").unwrap();
        assert!(Geoip2ServerConfig::load_from_file(&file.path().to_path_buf()).is_err());
    }
}
