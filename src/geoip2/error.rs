use thiserror::Error;

/// GeoIP2 error types / GeoIP2错误类型
#[derive(Error, Debug)]
pub enum GeoIpError {
    /// Databases are not loaded / 数据库未加载
    #[error("no database")]
    NoDatabase,

    #[error("invalid ip address: {0}")]
    InvalidIp(String),

    /// Address present in neither database / 地址不在任何数据库中
    #[error("not found: {0}")]
    NotFound(String),

    /// Admission limit reached / 达到并发查询上限
    #[error("no more lookup operation for now, wait a minute")]
    TooManyLookups,

    #[error("lookup timeout")]
    Timeout,

    #[error("database decode error: {0}")]
    Decode(String),

    /// File is not the expected edition / 文件不是预期的数据库版本
    #[error("database verification failed: {0}")]
    Verify(String),

    /// Archive has no `.mmdb` for the edition / 压缩包中没有对应的`.mmdb`
    #[error("not found db file in archive: {0}")]
    MissingDatabase(String),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("download failed: {0}")]
    Download(#[from] crate::http::HttpClientError),

    #[error("download failed with status {0}")]
    DownloadStatus(u16),

    #[error("invalid update schedule: {0}")]
    Schedule(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for GeoIP2 operations / GeoIP2操作的结果类型别名
pub type GeoIpResult<T> = Result<T, GeoIpError>;
