use super::Middleware;
use crate::http::server::error::error_response;
use axum::{http::StatusCode, response::Response};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;

/// Turn handler panics into `500` responses / 将处理器panic转换为500响应
pub fn recover() -> Middleware {
    Box::new(|router| router.layer(CatchPanicLayer::custom(panic_response)))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Recovered from handler panic: {}", message);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}
