//! Per-request context handed to route handlers and filters
//! 传递给路由处理器和过滤器的请求上下文

use super::{ServerError, ServerResult};
use crate::http::constants::{
    is_json_content_type, MIME_APPLICATION_FORM, MIME_APPLICATION_JSON_CHARSET_UTF8,
    MIME_TEXT_PLAIN_CHARSET_UTF8,
};
use axum::{
    body::Body,
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri,
    },
    response::Response,
};
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

/// Request context / 请求上下文
///
/// Holds the request head, the buffered body, matched path parameters,
/// a key/value store and the headers queued for the response.
#[derive(Debug)]
pub struct Context {
    parts: Parts,
    body: Bytes,
    params: HashMap<String, String>,
    store: HashMap<String, serde_json::Value>,
    response_headers: HeaderMap,
}

impl Context {
    /// Create a context from request parts and body / 从请求头和请求体创建上下文
    pub fn new(parts: Parts, body: Bytes, params: HashMap<String, String>) -> Self {
        Self {
            parts,
            body,
            params,
            store: HashMap::new(),
            response_headers: HeaderMap::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Raw request body / 原始请求体
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Typed request extension set by a middleware / 中间件设置的请求扩展
    pub fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.parts.extensions.get::<T>().cloned()
    }

    /// Request header by name, empty when absent / 按名称获取请求头，不存在时为空
    pub fn header(&self, key: &str) -> String {
        self.parts
            .headers
            .get(key)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    /// Path parameter captured by the route pattern / 路由模式捕获的路径参数
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Decode the JSON request body / 解码JSON请求体
    pub fn json_body<T: DeserializeOwned>(&self) -> ServerResult<T> {
        if self.body.is_empty() {
            return Err(ServerError::NoBody);
        }
        if !is_json_content_type(&self.header(CONTENT_TYPE.as_str())) {
            return Err(ServerError::NotJsonBody);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// All request cookies in header order / 按头部顺序返回所有Cookie
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().trim_matches('"').to_string()))
            })
            .collect()
    }

    /// Cookie by name / 按名称获取Cookie
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Query parameters merged with an url-encoded body; query values come first
    /// 查询参数与url编码请求体合并，查询参数在前
    pub fn form_params(&self) -> ServerResult<Vec<(String, String)>> {
        let mut params: Vec<(String, String)> = match self.parts.uri.query() {
            Some(query) => serde_urlencoded::from_str(query)
                .map_err(|e| ServerError::BadRequest(e.to_string()))?,
            None => Vec::new(),
        };
        if self.header(CONTENT_TYPE.as_str()).starts_with(MIME_APPLICATION_FORM) {
            let body: Vec<(String, String)> = serde_urlencoded::from_bytes(&self.body)
                .map_err(|e| ServerError::BadRequest(e.to_string()))?;
            params.extend(body);
        }
        Ok(params)
    }

    /// First form value for `name`, empty when absent / `name`的第一个表单值
    pub fn form_value(&self, name: &str) -> String {
        self.form_params()
            .unwrap_or_default()
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
            .unwrap_or_default()
    }

    /// Store a value for later handlers / 存储值
    pub fn set<V: Into<serde_json::Value>>(&mut self, key: &str, value: V) {
        self.store.insert(key.to_string(), value.into());
    }

    /// Stored value / 获取存储的值
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.store.get(key)
    }

    /// Queue a response header, replacing earlier values / 设置响应头
    pub fn set_header(&mut self, key: &str, value: &str) -> ServerResult<()> {
        let name = HeaderName::try_from(key).map_err(|e| ServerError::BadRequest(e.to_string()))?;
        let value =
            HeaderValue::try_from(value).map_err(|e| ServerError::BadRequest(e.to_string()))?;
        self.response_headers.insert(name, value);
        Ok(())
    }

    /// Queue a `Set-Cookie` header / 添加`Set-Cookie`响应头
    pub fn set_cookie(&mut self, name: &str, value: &str) -> ServerResult<()> {
        let cookie = HeaderValue::try_from(format!("{}={}", name, value))
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;
        self.response_headers.append(SET_COOKIE, cookie);
        Ok(())
    }

    fn respond(&self, status: StatusCode, content_type: Option<&str>, body: Body) -> ServerResult<Response> {
        let mut response = Response::new(body);
        *response.status_mut() = status;
        let headers = response.headers_mut();
        for (name, value) in &self.response_headers {
            headers.append(name.clone(), value.clone());
        }
        if let Some(ctype) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(ctype).map_err(|e| ServerError::Internal(e.to_string()))?);
        }
        Ok(response)
    }

    /// JSON response with `application/json; charset=UTF-8` / JSON响应
    pub fn serve_json<T: Serialize + ?Sized>(&self, status: StatusCode, value: &T) -> ServerResult<Response> {
        let body = serde_json::to_vec(value)?;
        self.respond(status, Some(MIME_APPLICATION_JSON_CHARSET_UTF8), Body::from(body))
    }

    /// Plain text response / 纯文本响应
    pub fn text(&self, status: StatusCode, body: impl Into<String>) -> ServerResult<Response> {
        self.respond(status, Some(MIME_TEXT_PLAIN_CHARSET_UTF8), Body::from(body.into()))
    }

    /// Redirect to `url`; only 300..=308 are accepted / 重定向，仅接受300..=308
    pub fn redirect(&mut self, status: StatusCode, url: &str) -> ServerResult<Response> {
        if !(300..=308).contains(&status.as_u16()) {
            return Err(ServerError::InvalidRedirectCode);
        }
        self.set_header(LOCATION.as_str(), url)?;
        self.respond(status, None, Body::empty())
    }
}
