use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// COS error types / COS错误类型
#[derive(Error, Debug)]
pub enum CosError {
    #[error("empty app ID")]
    EmptyAppId,

    #[error("empty secret ID")]
    EmptySecretId,

    #[error("empty secret key")]
    EmptySecretKey,

    #[error("bucket name is needed but none exists")]
    EmptyBucketName,

    #[error("bucket region is needed but none exists")]
    EmptyRegion,

    /// Account owns no bucket / 账户下没有存储桶
    #[error("no bucket exists")]
    NoBucket,

    #[error("BucketAlreadyExists")]
    BucketAlreadyExists,

    #[error("BucketNotEmpty")]
    BucketNotEmpty,

    #[error("AccessDenied")]
    AccessDenied,

    #[error("NoSuchBucket")]
    NoSuchBucket,

    #[error("empty object key")]
    EmptyKey,

    /// Key or file name contains a forbidden character / 键或文件名包含非法字符
    #[error("invalid key {0:?}: forbidden character or whitespace")]
    InvalidKey(String),

    #[error("ObjectAlreadyExists: {0} (enable force to overwrite)")]
    ObjectAlreadyExists(String),

    /// Rename target already taken / 重命名目标已存在
    #[error("this action conflicts with other files: {0}")]
    Conflict(String),

    #[error("NoSuchObject: {0}")]
    NoSuchObject(String),

    #[error("NotModified: {0}")]
    NotModified(String),

    /// Service or transport failure / 服务端或传输错误
    #[error("{code}({message})")]
    Op { code: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for COS operations / COS操作的结果类型别名
pub type CosResult<T> = Result<T, CosError>;

/// HTTP status of a failed call, when a response arrived / 失败调用的HTTP状态码
pub(crate) fn status_of<E>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    err.raw_response().map(|resp| resp.status().as_u16())
}

/// Convert an SDK error into [`CosError::Op`] / 将SDK错误转换为`CosError::Op`
///
/// Service errors keep their code and message; transport errors carry the
/// full error chain as message.
pub(crate) fn op_error<E>(err: SdkError<E, HttpResponse>) -> CosError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match err.code() {
        Some(code) => CosError::Op {
            code: code.to_string(),
            message: err.message().unwrap_or_default().to_string(),
        },
        None => CosError::Op {
            code: status_of(&err).map(|s| s.to_string()).unwrap_or_default(),
            message: DisplayErrorContext(&err).to_string(),
        },
    }
}
