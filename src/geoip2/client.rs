//! GeoIP2 lookup client with hot database swap
//! 支持数据库热替换的GeoIP2查询客户端
//!
//! Both readers live behind one lock as a pair, so a lookup always sees
//! either the old ASN+City pair or the new one.
//! 两个读取器作为一对放在同一把锁后，查询总是看到旧的一对或新的一对。

use super::download::{download_mmdb, resolve_url};
use super::types::AsnRecord;
use super::{DbMeta, Edition, GeoIpConfig, GeoIpError, GeoIpResult, LookupResult};
use crate::http::{Client, ClientOptions};
use crate::utils::{ensure_dir, is_exist};
use maxminddb::{MaxMindDBError, Reader};
use memmap2::Mmap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

type MmdbReader = Reader<Mmap>;

/// Loaded ASN and City databases / 已加载的ASN与City数据库
pub(crate) struct Databases {
    asn: MmdbReader,
    city: MmdbReader,
}

impl Databases {
    fn lookup(&self, ip: IpAddr) -> GeoIpResult<LookupResult> {
        let asn: Option<AsnRecord> = lookup_record(&self.asn, ip)?;
        let city: Option<LookupResult> = lookup_record(&self.city, ip)?;
        if asn.is_none() && city.is_none() {
            return Err(GeoIpError::NotFound(ip.to_string()));
        }
        Ok(LookupResult::merge(city, asn))
    }

    fn meta(&self) -> Vec<DbMeta> {
        vec![
            DbMeta::from_metadata(&self.asn.metadata),
            DbMeta::from_metadata(&self.city.metadata),
        ]
    }
}

fn lookup_record<T: DeserializeOwned>(reader: &MmdbReader, ip: IpAddr) -> GeoIpResult<Option<T>> {
    match reader.lookup::<T>(ip) {
        Ok(record) => Ok(Some(record)),
        Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
        Err(e) => Err(GeoIpError::Decode(e.to_string())),
    }
}

/// Open `path` memory-mapped and check it is `edition`
/// 以内存映射方式打开`path`并检查其版本
pub(crate) fn open_reader(path: &Path, edition: Edition) -> GeoIpResult<MmdbReader> {
    let file = std::fs::File::open(path)?;
    // SAFETY: database files are replaced by rename, never modified in place
    let mmap = unsafe { Mmap::map(&file)? };
    let reader = Reader::from_source(mmap)
        .map_err(|e| GeoIpError::Verify(format!("{}: {}", path.display(), e)))?;

    if !edition.accepts(&reader.metadata.database_type) {
        return Err(GeoIpError::Verify(format!(
            "{}: expected {} but found {}",
            path.display(),
            edition,
            reader.metadata.database_type
        )));
    }

    // Probe the search tree and data section once
    let probe: IpAddr = if reader.metadata.ip_version == 6 {
        IpAddr::from([0x2001, 0x4860, 0, 0, 0, 0, 0, 0x8888])
    } else {
        IpAddr::from([8, 8, 8, 8])
    };
    match reader.lookup::<serde::de::IgnoredAny>(probe) {
        Ok(_) | Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(reader),
        Err(e) => Err(GeoIpError::Verify(format!("{}: {}", path.display(), e))),
    }
}

/// GeoIP2 client / GeoIP2客户端
pub struct GeoIpClient {
    config: GeoIpConfig,
    http: Client,
    pub(super) limiter: Semaphore,
    databases: RwLock<Option<Arc<Databases>>>,
}

impl GeoIpClient {
    /// Create a client; databases are loaded by [`GeoIpClient::init`]
    /// 创建客户端；数据库由`init`加载
    pub fn new(config: GeoIpConfig) -> GeoIpResult<Self> {
        let http = Client::new(ClientOptions {
            timeout: config.download_timeout(),
            cookie_store: false,
            ..ClientOptions::default()
        })?;
        Ok(Self {
            limiter: Semaphore::new(config.max_connect.max(1)),
            config,
            http,
            databases: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &GeoIpConfig {
        &self.config
    }

    /// Final location of an edition / 数据库文件的最终位置
    pub fn db_path(&self, edition: Edition) -> PathBuf {
        self.config.db_dir.join(edition.file_name())
    }

    fn url(&self, edition: Edition) -> String {
        let template = match edition {
            Edition::Asn => &self.config.asn_url,
            Edition::City => &self.config.city_url,
        };
        resolve_url(template, &self.config.license_key)
    }

    /// Whether databases are loaded / 数据库是否已加载
    pub fn is_ready(&self) -> bool {
        self.databases.read().is_some()
    }

    /// Lookups that can start right now / 当前可立即开始的查询数
    pub fn available_lookups(&self) -> usize {
        self.limiter.available_permits()
    }

    fn snapshot(&self) -> Option<Arc<Databases>> {
        self.databases.read().clone()
    }

    fn swap(&self, databases: Databases) {
        *self.databases.write() = Some(Arc::new(databases));
    }

    async fn download(&self, edition: Edition) -> GeoIpResult<PathBuf> {
        download_mmdb(
            &self.http,
            &self.url(edition),
            edition,
            &self.config.download_dir(),
            self.config.verify_checksum,
        )
        .await
    }

    fn cleanup_downloads(&self) {
        let dir = self.config.download_dir();
        if is_exist(&dir) {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                warn!("Failed to remove {}: {}", dir.display(), e);
            }
        }
    }

    async fn prepare(&self, edition: Edition) -> GeoIpResult<MmdbReader> {
        let location = self.db_path(edition);
        if !is_exist(&location) {
            let downloaded = self.download(edition).await?;
            tokio::fs::rename(&downloaded, &location).await?;
        }
        open_reader(&location, edition).inspect_err(|_| {
            if let Err(e) = std::fs::remove_file(&location) {
                warn!("Failed to remove {}: {}", location.display(), e);
            }
        })
    }

    /// Load both databases, downloading any that are missing
    /// 加载两个数据库，缺失时先下载
    ///
    /// A file that fails to open or verify is removed so the next call downloads it again.
    pub async fn init(&self) -> GeoIpResult<()> {
        ensure_dir(&self.config.db_dir)?;
        let result = tokio::try_join!(self.prepare(Edition::Asn), self.prepare(Edition::City));
        self.cleanup_downloads();

        match result {
            Ok((asn, city)) => {
                self.swap(Databases { asn, city });
                info!("GeoIP2 initialization complete");
                Ok(())
            }
            Err(e) => {
                error!("GeoIP2 initialization failed: {}", e);
                Err(e)
            }
        }
    }

    /// Download and verify an edition, leaving it in the download dir
    /// 下载并校验数据库，文件留在下载目录
    async fn stage(&self, edition: Edition) -> GeoIpResult<PathBuf> {
        let downloaded = self.download(edition).await?;
        drop(open_reader(&downloaded, edition)?);
        Ok(downloaded)
    }

    async fn install(&self, asn: PathBuf, city: PathBuf) -> GeoIpResult<()> {
        tokio::fs::rename(&asn, self.db_path(Edition::Asn)).await?;
        tokio::fs::rename(&city, self.db_path(Edition::City)).await?;

        let asn = open_reader(&self.db_path(Edition::Asn), Edition::Asn)?;
        let city = open_reader(&self.db_path(Edition::City), Edition::City)?;
        self.swap(Databases { asn, city });
        Ok(())
    }

    /// Files on disk are replaced only once both editions verify
    async fn try_update(&self) -> GeoIpResult<()> {
        ensure_dir(&self.config.db_dir)?;
        let staged = tokio::try_join!(self.stage(Edition::Asn), self.stage(Edition::City));
        let result = match staged {
            Ok((asn, city)) => self.install(asn, city).await,
            Err(e) => Err(e),
        };
        self.cleanup_downloads();
        result
    }

    /// Refresh both databases from upstream, retrying with backoff
    /// 从上游刷新两个数据库，失败时退避重试
    ///
    /// Until a refresh succeeds the previously loaded pair keeps serving.
    pub async fn update_db(&self) -> GeoIpResult<()> {
        info!("Update database at {}", chrono::Utc::now());
        let mut delay = Duration::from_millis(self.config.retry_backoff_ms);
        let mut attempt = 0;
        loop {
            match self.try_update().await {
                Ok(()) => {
                    info!("Update database complete");
                    return Ok(());
                }
                Err(e) if attempt < self.config.update_retries => {
                    attempt += 1;
                    warn!(
                        "Update database failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt, self.config.update_retries, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(300));
                }
                Err(e) => {
                    error!("Update database failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Metadata of the ASN and City databases / ASN与City数据库的元数据
    pub fn db_meta(&self) -> GeoIpResult<Vec<DbMeta>> {
        self.snapshot()
            .map(|dbs| dbs.meta())
            .ok_or(GeoIpError::NoDatabase)
    }

    /// Geo information for `ip` / 查询`ip`的地理信息
    pub async fn lookup(&self, ip: &str) -> GeoIpResult<LookupResult> {
        let _permit = self
            .limiter
            .try_acquire()
            .map_err(|_| GeoIpError::TooManyLookups)?;

        let addr: IpAddr = ip
            .trim()
            .parse()
            .map_err(|_| GeoIpError::InvalidIp(ip.to_string()))?;
        let databases = self.snapshot().ok_or(GeoIpError::NoDatabase)?;

        let task = tokio::task::spawn_blocking(move || databases.lookup(addr));
        match tokio::time::timeout(self.config.lookup_timeout(), task).await {
            Err(_) => Err(GeoIpError::Timeout),
            Ok(Err(e)) => Err(GeoIpError::Internal(format!("Task join error: {}", e))),
            Ok(Ok(result)) => result,
        }
    }

    /// Unload both databases / 卸载两个数据库
    pub fn close(&self) -> GeoIpResult<()> {
        match self.databases.write().take() {
            Some(_) => {
                info!("GeoIP2 databases closed");
                Ok(())
            }
            None => Err(GeoIpError::NoDatabase),
        }
    }
}
