use super::Middleware;
use axum::http::{HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// CORS policy options / CORS策略选项
///
/// `"*"` in `allowed_origins` or `allowed_headers` means any value.
#[derive(Debug, Clone, Default)]
pub struct CorsOptions {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds / 预检缓存时间（秒）
    pub max_age: Option<u64>,
}

const SIMPLE_METHODS: [Method; 6] = [
    Method::HEAD,
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// Allow any origin, the common methods and any header / 允许所有来源、常用方法和任意头部
pub fn cors_allow_all() -> Middleware {
    let layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(SIMPLE_METHODS.to_vec())
        .allow_headers(Any);
    Box::new(move |router| router.layer(layer))
}

/// CORS layer built from `options` / 根据选项构建的CORS层
pub fn cors(options: CorsOptions) -> Middleware {
    let layer = build_layer(&options);
    Box::new(move |router| router.layer(layer))
}

fn build_layer(options: &CorsOptions) -> CorsLayer {
    let wildcard = |items: &[String]| items.iter().any(|s| s == "*");

    let mut layer = CorsLayer::new();

    layer = if wildcard(&options.allowed_origins) {
        // Credentials forbid a literal `*`, so echo the request origin instead
        if options.allow_credentials {
            layer.allow_origin(AllowOrigin::mirror_request())
        } else {
            layer.allow_origin(Any)
        }
    } else {
        let origins: Vec<HeaderValue> = options
            .allowed_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        layer.allow_origin(origins)
    };

    let methods: Vec<Method> = if options.allowed_methods.is_empty() {
        vec![Method::GET, Method::POST, Method::HEAD]
    } else {
        options
            .allowed_methods
            .iter()
            .filter_map(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
            .collect()
    };
    layer = layer.allow_methods(methods);

    if wildcard(&options.allowed_headers) && !options.allow_credentials {
        layer = layer.allow_headers(Any);
    } else if wildcard(&options.allowed_headers) {
        layer = layer.allow_headers(tower_http::cors::AllowHeaders::mirror_request());
    } else {
        let headers: Vec<HeaderName> = options
            .allowed_headers
            .iter()
            .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok())
            .collect();
        layer = layer.allow_headers(headers);
    }

    let exposed: Vec<HeaderName> = options
        .exposed_headers
        .iter()
        .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok())
        .collect();
    layer = layer.expose_headers(exposed).allow_credentials(options.allow_credentials);

    if let Some(secs) = options.max_age {
        layer = layer.max_age(Duration::from_secs(secs));
    }
    layer
}
