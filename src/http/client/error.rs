use std::path::PathBuf;
use thiserror::Error;

/// HTTP client error types / HTTP客户端错误类型
#[derive(Error, Debug)]
pub enum HttpClientError {
    /// Transport or protocol error / 传输或协议错误
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// Response body type cannot be decoded / 无法解码的响应类型
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("target directory ({0}) can't be found")]
    DirectoryNotFound(PathBuf),

    #[error("target directory ({0}): permission denied")]
    PermissionDenied(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for HTTP client operations / HTTP客户端操作的结果类型别名
pub type HttpClientResult<T> = Result<T, HttpClientError>;
