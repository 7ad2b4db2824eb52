use super::Middleware;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

/// Log method, URI, status and latency of every request / 记录每个请求的方法、URI、状态和耗时
pub fn logger() -> Middleware {
    Box::new(|router| router.layer(axum::middleware::from_fn(log_request)))
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    info!(
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "{} {}",
        method,
        uri
    );
    response
}
