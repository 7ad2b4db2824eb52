//! Bearer-token authentication / Bearer令牌认证

use super::Middleware;
use crate::http::server::error::error_response;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Returns true for paths that bypass authentication / 返回true的路径跳过认证
pub type Skipper = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Builds the rejection response from a reason / 根据原因构建拒绝响应
pub type JwtErrorHandler = Arc<dyn Fn(&str) -> Response + Send + Sync>;

/// Verified token claims, inserted into request extensions
/// 验证后的令牌声明，插入到请求扩展中
#[derive(Debug, Clone, PartialEq)]
pub struct JwtClaims(pub serde_json::Value);

/// JWT middleware options / JWT中间件选项
#[derive(Clone)]
pub struct JwtOptions {
    /// HMAC secret / HMAC密钥
    pub key: String,
    /// HS256, HS384 or HS512 / 签名算法
    pub algorithm: Algorithm,
    pub skipper: Option<Skipper>,
    pub error_handler: Option<JwtErrorHandler>,
}

impl JwtOptions {
    /// HS256 options with no skipper / 使用HS256且不跳过任何路径
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            algorithm: Algorithm::HS256,
            skipper: None,
            error_handler: None,
        }
    }

    pub fn with_skipper<F>(mut self, skipper: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.skipper = Some(Arc::new(skipper));
        self
    }

    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }
}

struct JwtState {
    key: DecodingKey,
    validation: Validation,
    skipper: Option<Skipper>,
    error_handler: Option<JwtErrorHandler>,
}

impl JwtState {
    fn reject(&self, reason: &str) -> Response {
        match &self.error_handler {
            Some(handler) => handler(reason),
            None => error_response(StatusCode::UNAUTHORIZED, reason),
        }
    }
}

/// Require a valid `Authorization: Bearer <token>` / 要求有效的Bearer令牌
pub fn jwt(options: JwtOptions) -> Middleware {
    let algorithm = match options.algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => options.algorithm,
        other => {
            warn!("JWT algorithm {:?} is not HMAC, falling back to HS256", other);
            Algorithm::HS256
        }
    };
    let mut validation = Validation::new(algorithm);
    // `exp` is checked when present but not mandatory
    validation.required_spec_claims.clear();

    let state = Arc::new(JwtState {
        key: DecodingKey::from_secret(options.key.as_bytes()),
        validation,
        skipper: options.skipper,
        error_handler: options.error_handler,
    });
    Box::new(move |router| router.layer(axum::middleware::from_fn_with_state(state, authenticate)))
}

async fn authenticate(State(state): State<Arc<JwtState>>, mut request: Request, next: Next) -> Response {
    if let Some(skipper) = &state.skipper {
        if skipper(request.uri().path()) {
            return next.run(request).await;
        }
    }

    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => match value.to_str() {
            Ok(s) => s.to_string(),
            Err(_) => return state.reject("invalid Authorization header"),
        },
        None => return state.reject("required authorization token not found"),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) if !t.trim().is_empty() => t.trim(),
        _ => return state.reject("authorization header format must be Bearer {token}"),
    };

    match decode::<serde_json::Value>(token, &state.key, &state.validation) {
        Ok(data) => {
            request.extensions_mut().insert(JwtClaims(data.claims));
            next.run(request).await
        }
        Err(e) => {
            warn!("JWT validation failed: {}", e);
            state.reject("invalid or expired token")
        }
    }
}

/// Sign `claims` with an HMAC key / 使用HMAC密钥签名声明
pub fn sign_token<T: Serialize>(
    claims: &T,
    key: &str,
    algorithm: Algorithm,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(algorithm),
        claims,
        &EncodingKey::from_secret(key.as_bytes()),
    )
}
