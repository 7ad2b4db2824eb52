//! HTTP endpoints for the GeoIP2 client / GeoIP2客户端的HTTP端点

use super::{GeoIpClient, GeoIpError};
use crate::http::{Context, Router, ServerError};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Body of `POST /geo` / `POST /geo`的请求体
#[derive(Debug, Deserialize)]
pub struct Query {
    pub ip: String,
}

impl From<GeoIpError> for ServerError {
    fn from(err: GeoIpError) -> Self {
        match err {
            GeoIpError::InvalidIp(_) => ServerError::BadRequest(err.to_string()),
            GeoIpError::NotFound(_) => ServerError::NotFound(err.to_string()),
            GeoIpError::TooManyLookups => ServerError::TooManyRequests(err.to_string()),
            GeoIpError::Timeout => ServerError::Timeout(err.to_string()),
            GeoIpError::NoDatabase => ServerError::Unavailable(err.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

/// Create GeoIP2 routes / 创建GeoIP2路由
///
/// - `GET /health`
/// - `GET /meta`: metadata of both databases
/// - `POST /geo`: `{"ip": "..."}` lookup
pub fn routes(client: Arc<GeoIpClient>) -> Router {
    let mut router = Router::new();

    let health_client = client.clone();
    router.get(
        "/health",
        move |ctx: Context| {
            let client = health_client.clone();
            async move {
                ctx.serve_json(
                    StatusCode::OK,
                    &json!({ "status": "ok", "ready": client.is_ready() }),
                )
            }
        },
        vec![],
    );

    let meta_client = client.clone();
    router.get(
        "/meta",
        move |ctx: Context| {
            let client = meta_client.clone();
            async move {
                let meta = client.db_meta()?;
                ctx.serve_json(StatusCode::OK, &meta)
            }
        },
        vec![],
    );

    router.post(
        "/geo",
        move |ctx: Context| {
            let client = client.clone();
            async move {
                let query: Query = ctx.json_body()?;
                let result = client.lookup(&query.ip).await.inspect_err(|e| {
                    warn!("Lookup {} failed: {}", query.ip, e);
                })?;
                ctx.serve_json(StatusCode::OK, &result)
            }
        },
        vec![],
    );

    router
}
