use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// HTTP server error types / HTTP服务端错误类型
#[derive(Error, Debug)]
pub enum ServerError {
    /// Request body is empty / 请求体为空
    #[error("request body is empty")]
    NoBody,

    /// Request content type is not JSON / 请求内容类型不是JSON
    #[error("request body is not JSON")]
    NotJsonBody,

    #[error("invalid redirect status code")]
    InvalidRedirectCode,

    /// A route filter rejected the request / 路由过滤器拒绝了请求
    #[error("filter not passed")]
    FilterNotPassed,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("too many requests: {0}")]
    TooManyRequests(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("gateway timeout: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Entrypoint started without routes / 入口点启动时没有路由
    #[error("entrypoint requires a router")]
    NoRouter,

    #[error("entrypoint already started")]
    AlreadyStarted,

    #[error("entrypoint not started")]
    NotStarted,

    /// Cert or key file missing or unreadable / 证书或私钥文件缺失或不可读
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// HTTP status for this error / 此错误对应的HTTP状态码
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NoBody
            | ServerError::NotJsonBody
            | ServerError::BadRequest(_)
            | ServerError::Json(_) => StatusCode::BAD_REQUEST,
            ServerError::FilterNotPassed => StatusCode::FORBIDDEN,
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        error_response(self.status(), &self.to_string())
    }
}

/// JSON error body `{"error": message}` / JSON错误响应体
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Result type alias for HTTP server operations / HTTP服务端操作的结果类型别名
pub type ServerResult<T> = Result<T, ServerError>;
