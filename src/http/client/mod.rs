//! HTTP client / HTTP客户端
//!
//! A reqwest client carrying default headers (bearer token), a cookie
//! store and an optional proxy, plus request/response wrappers with
//! content-type aware decoding and download-to-directory support.
//!
//! 携带默认头部（Bearer令牌）、Cookie存储和可选代理的reqwest客户端，
//! 以及支持按内容类型解码和下载到目录的请求/响应封装。

mod error;
mod request;
mod response;

pub use error::{HttpClientError, HttpClientResult};
pub use request::Request;
pub use response::Response;


use crate::http::constants::{bearer, HEADER_AUTHORIZATION, MIME_APPLICATION_FORM, MIME_APPLICATION_JSON};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Default request timeout / 默认请求超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client construction options / 客户端构造选项
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Proxy URL, all schemes / 代理URL（所有协议）
    pub proxy: Option<String>,
    /// Whole-request timeout / 请求总超时
    pub timeout: Duration,
    /// Keep cookies between requests / 在请求间保留Cookie
    pub cookie_store: bool,
    /// User-Agent header / User-Agent头部
    pub user_agent: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: DEFAULT_TIMEOUT,
            cookie_store: true,
            user_agent: None,
        }
    }
}

/// HTTP client with default headers / 带默认头部的HTTP客户端
#[derive(Debug, Clone)]
pub struct Client {
    inner: reqwest::Client,
    headers: HeaderMap,
}

impl Client {
    /// Create a new client / 创建新客户端
    pub fn new(options: ClientOptions) -> HttpClientResult<Self> {
        let timeout = if options.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            options.timeout
        };

        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .cookie_store(options.cookie_store);

        if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.is_empty()) {
            let url = url::Url::parse(proxy)?;
            builder = builder.proxy(reqwest::Proxy::all(url)?);
        }
        if let Some(agent) = options.user_agent {
            builder = builder.user_agent(agent);
        }

        Ok(Self {
            inner: builder.build()?,
            headers: HeaderMap::new(),
        })
    }

    /// Create a client behind `proxy`; an empty string means no proxy
    /// 创建使用代理的客户端；空字符串表示不使用代理
    pub fn with_proxy(proxy: &str) -> HttpClientResult<Self> {
        Self::new(ClientOptions {
            proxy: Some(proxy.to_string()),
            ..ClientOptions::default()
        })
    }

    /// Default headers sent with every request / 每个请求都会发送的默认头部
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Set a default header, replacing previous values / 设置默认头部（替换旧值）
    pub fn set_header(&mut self, key: &str, value: &str) -> HttpClientResult<()> {
        let name = HeaderName::try_from(key)
            .map_err(|e| HttpClientError::InvalidHeader(format!("{}: {}", key, e)))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| HttpClientError::InvalidHeader(format!("{}: {}", key, e)))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Send `Authorization: Bearer <token>` on every request
    /// 在每个请求上发送Bearer令牌
    pub fn set_token(&mut self, token: &str) -> HttpClientResult<()> {
        self.set_header(HEADER_AUTHORIZATION, &bearer(token))
    }

    /// Send a prepared request / 发送已构造的请求
    pub async fn do_request(&self, mut req: Request) -> HttpClientResult<Response> {
        req.append_headers(&self.headers);
        let resp = self.inner.execute(req.into_inner()).await?;
        Ok(Response::new(resp))
    }

    /// GET `url` / 发送GET请求
    pub async fn get(&self, url: &str) -> HttpClientResult<Response> {
        let req = Request::new(Method::GET, url, None::<Vec<u8>>)?;
        self.do_request(req).await
    }

    /// GET `url` and save the body under `directory` / GET并将响应保存到目录
    pub async fn get_file<P: AsRef<Path>>(&self, url: &str, directory: P) -> HttpClientResult<u64> {
        let resp = self.get(url).await?;
        resp.save_as_file(directory).await
    }

    /// POST `body` with the given content type / 以指定内容类型POST
    pub async fn post<B: Into<reqwest::Body>>(
        &self,
        url: &str,
        content_type: &str,
        body: B,
    ) -> HttpClientResult<Response> {
        let mut req = Request::new(Method::POST, url, Some(body))?;
        req.set_header(crate::http::constants::HEADER_CONTENT_TYPE, content_type)?;
        self.do_request(req).await
    }

    /// POST url-encoded form data / POST表单数据
    pub async fn post_form<T: Serialize + ?Sized>(
        &self,
        url: &str,
        form: &T,
    ) -> HttpClientResult<Response> {
        let body = serde_urlencoded::to_string(form)
            .map_err(|e| HttpClientError::Encode(e.to_string()))?;
        self.post(url, MIME_APPLICATION_FORM, body).await
    }

    /// POST a JSON document / POST JSON文档
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> HttpClientResult<Response> {
        let body = serde_json::to_vec(body)?;
        self.post(url, MIME_APPLICATION_JSON, body).await
    }
}
