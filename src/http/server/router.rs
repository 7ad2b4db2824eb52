//! Route table with per-route filters and a shared error handler
//! 带路由过滤器和统一错误处理器的路由表

use super::{error::error_response, Context, ServerError, ServerResult};
use axum::{
    body::Body,
    extract::{FromRequestParts, Path, Request},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter},
};
use futures::future::BoxFuture;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Largest buffered request body / 最大缓冲请求体
pub const MAX_BODY_BYTES: usize = 32 << 20;

/// Route filter; returning false stops the request / 路由过滤器，返回false时终止请求
pub type Filter = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Maps a handler error to a response / 将处理器错误映射为响应
pub type ErrorHandler = Arc<dyn Fn(&ServerError) -> Response + Send + Sync>;

type BoxHandler = Arc<dyn Fn(Context) -> BoxFuture<'static, ServerResult<Response>> + Send + Sync>;

/// Wrap a closure as a [`Filter`] / 将闭包包装为过滤器
pub fn filter<F>(f: F) -> Filter
where
    F: Fn(&Context) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

struct Route {
    method: Method,
    pattern: String,
    handler: BoxHandler,
    filters: Vec<Filter>,
}

/// HTTP router / HTTP路由器
///
/// Patterns accept both `{name}` and `:name` segments.
pub struct Router {
    routes: Vec<Route>,
    error_handler: ErrorHandler,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create an empty router / 创建空路由器
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            error_handler: Arc::new(|err: &ServerError| err_to_response(err)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Replace the error handler / 替换错误处理器
    pub fn set_error_handler<F>(&mut self, f: F)
    where
        F: Fn(&ServerError) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(f);
    }

    /// Register a handler for `method` and `pattern` / 为方法和路径注册处理器
    pub fn handle<H, Fut>(&mut self, method: Method, pattern: &str, handler: H, filters: Vec<Filter>) -> &mut Self
    where
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServerResult<Response>> + Send + 'static,
    {
        let handler: BoxHandler =
            Arc::new(move |ctx: Context| -> BoxFuture<'static, ServerResult<Response>> {
                Box::pin(handler(ctx))
            });
        self.routes.push(Route {
            method,
            pattern: normalize_pattern(pattern),
            handler,
            filters,
        });
        self
    }

    pub fn get<H, Fut>(&mut self, pattern: &str, handler: H, filters: Vec<Filter>) -> &mut Self
    where
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServerResult<Response>> + Send + 'static,
    {
        self.handle(Method::GET, pattern, handler, filters)
    }

    pub fn post<H, Fut>(&mut self, pattern: &str, handler: H, filters: Vec<Filter>) -> &mut Self
    where
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServerResult<Response>> + Send + 'static,
    {
        self.handle(Method::POST, pattern, handler, filters)
    }

    pub fn put<H, Fut>(&mut self, pattern: &str, handler: H, filters: Vec<Filter>) -> &mut Self
    where
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServerResult<Response>> + Send + 'static,
    {
        self.handle(Method::PUT, pattern, handler, filters)
    }

    pub fn patch<H, Fut>(&mut self, pattern: &str, handler: H, filters: Vec<Filter>) -> &mut Self
    where
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServerResult<Response>> + Send + 'static,
    {
        self.handle(Method::PATCH, pattern, handler, filters)
    }

    pub fn delete<H, Fut>(&mut self, pattern: &str, handler: H, filters: Vec<Filter>) -> &mut Self
    where
        H: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServerResult<Response>> + Send + 'static,
    {
        self.handle(Method::DELETE, pattern, handler, filters)
    }

    /// Build the axum router / 构建axum路由器
    pub fn into_axum(self) -> axum::Router {
        let mut table: BTreeMap<String, MethodRouter> = BTreeMap::new();

        for route in self.routes {
            let method_filter = match MethodFilter::try_from(route.method.clone()) {
                Ok(filter) => filter,
                Err(_) => {
                    warn!("Skipping route with unsupported method {} {}", route.method, route.pattern);
                    continue;
                }
            };

            let handler = route.handler;
            let filters = Arc::new(route.filters);
            let on_error = self.error_handler.clone();
            let endpoint = move |req: Request| {
                let handler = handler.clone();
                let filters = filters.clone();
                let on_error = on_error.clone();
                async move { dispatch(req, handler, filters, on_error).await }
            };

            let entry = table.remove(&route.pattern).unwrap_or_else(MethodRouter::new);
            table.insert(route.pattern, entry.on(method_filter, endpoint));
        }

        table
            .into_iter()
            .fold(axum::Router::new(), |app, (pattern, method_router)| {
                app.route(&pattern, method_router.fallback(method_not_allowed))
            })
            .fallback(not_found)
    }
}

async fn dispatch(
    req: Request,
    handler: BoxHandler,
    filters: Arc<Vec<Filter>>,
    on_error: ErrorHandler,
) -> Response {
    let (mut parts, body) = req.into_parts();
    let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
        .await
        .map(|Path(p)| p)
        .unwrap_or_default();

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => return on_error(&ServerError::BadRequest(e.to_string())),
    };

    let ctx = Context::new(parts, body, params);
    if filters.iter().any(|f| !f(&ctx)) {
        debug!("Filter rejected {} {}", ctx.method(), ctx.path());
        return on_error(&ServerError::FilterNotPassed);
    }

    match handler(ctx).await {
        Ok(resp) => resp,
        Err(err) => on_error(&err),
    }
}

fn err_to_response(err: &ServerError) -> Response {
    error_response(err.status(), &err.to_string())
}

/// Rewrite `:name` segments into `{name}` / 将`:name`段改写为`{name}`
fn normalize_pattern(pattern: &str) -> String {
    let pattern = if pattern.starts_with('/') {
        pattern.to_string()
    } else {
        format!("/{}", pattern)
    };
    pattern
        .split('/')
        .map(|seg| match seg.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{}}}", name),
            _ => seg.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Body::from("404 page not found")).into_response()
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, Body::from("405 method not allowed")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pattern() {
        assert_eq!(normalize_pattern("/users/:id"), "/users/{id}");
        assert_eq!(normalize_pattern("users/{id}/x"), "/users/{id}/x");
        assert_eq!(normalize_pattern("/"), "/");
    }
}
