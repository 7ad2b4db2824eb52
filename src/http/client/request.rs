use super::{HttpClientError, HttpClientResult};
use crate::http::constants::{bearer, HEADER_AUTHORIZATION};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;

/// An HTTP request to be sent by [`super::Client`] / 由客户端发送的HTTP请求
#[derive(Debug)]
pub struct Request {
    inner: reqwest::Request,
}

fn header_pair(key: &str, value: &str) -> HttpClientResult<(HeaderName, HeaderValue)> {
    let name = HeaderName::try_from(key)
        .map_err(|e| HttpClientError::InvalidHeader(format!("{}: {}", key, e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| HttpClientError::InvalidHeader(format!("{}: {}", key, e)))?;
    Ok((name, value))
}

impl Request {
    /// Create a request with an optional body / 创建请求（可选请求体）
    pub fn new<B: Into<reqwest::Body>>(
        method: Method,
        url: &str,
        body: Option<B>,
    ) -> HttpClientResult<Self> {
        let url = url::Url::parse(url)?;
        let mut inner = reqwest::Request::new(method, url);
        if let Some(body) = body {
            *inner.body_mut() = Some(body.into());
        }
        Ok(Self { inner })
    }

    /// Append a header value, keeping existing ones / 追加头部值（保留已有值）
    pub fn add_header(&mut self, key: &str, value: &str) -> HttpClientResult<()> {
        let (name, value) = header_pair(key, value)?;
        self.inner.headers_mut().append(name, value);
        Ok(())
    }

    /// Append several headers / 追加多个头部
    pub fn add_headers<'a, I>(&mut self, headers: I) -> HttpClientResult<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in headers {
            self.add_header(key, value)?;
        }
        Ok(())
    }

    pub(crate) fn append_headers(&mut self, headers: &HeaderMap) {
        for (name, value) in headers {
            self.inner.headers_mut().append(name.clone(), value.clone());
        }
    }

    /// Remove every value of `key` / 删除`key`的所有值
    pub fn del_header(&mut self, key: &str) {
        self.inner.headers_mut().remove(key);
    }

    /// First value of `key`, empty when absent / `key`的第一个值，不存在时为空
    pub fn get_header(&self, key: &str) -> String {
        self.inner
            .headers()
            .get(key)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    /// Replace all values of `key` / 替换`key`的所有值
    pub fn set_header(&mut self, key: &str, value: &str) -> HttpClientResult<()> {
        let (name, value) = header_pair(key, value)?;
        self.inner.headers_mut().insert(name, value);
        Ok(())
    }

    /// Set a bearer token / 设置Bearer令牌
    pub fn set_token(&mut self, token: &str) -> HttpClientResult<()> {
        self.set_header(HEADER_AUTHORIZATION, &bearer(token))
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn url(&self) -> &url::Url {
        self.inner.url()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub(crate) fn into_inner(self) -> reqwest::Request {
        self.inner
    }
}
