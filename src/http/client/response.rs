use super::{HttpClientError, HttpClientResult};
use crate::http::constants::{MIME_APPLICATION_JSON, MIME_APPLICATION_XML, MIME_TEXT_XML};
use crate::utils::{file_name, is_dir_exist, is_exist, is_permission_denied};
use futures::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Response of an HTTP request / HTTP请求的响应
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    pub(crate) fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Final URL after redirects / 重定向后的最终URL
    pub fn url(&self) -> &url::Url {
        self.inner.url()
    }

    fn content_type(&self) -> String {
        self.inner
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    /// Read the whole body / 读取完整响应体
    pub async fn to_bytes(self) -> HttpClientResult<bytes::Bytes> {
        Ok(self.inner.bytes().await?)
    }

    /// Read the body as text / 以文本读取响应体
    pub async fn to_text(self) -> HttpClientResult<String> {
        Ok(self.inner.text().await?)
    }

    /// Decode the body according to its `Content-Type`
    /// 根据`Content-Type`解码响应体
    ///
    /// JSON and XML are supported; anything else is `UnsupportedMediaType`.
    pub async fn to_object<T: DeserializeOwned>(self) -> HttpClientResult<T> {
        let ctype = self.content_type();
        if ctype.starts_with(MIME_APPLICATION_JSON) {
            let body = self.inner.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        } else if ctype.starts_with(MIME_APPLICATION_XML) || ctype.starts_with(MIME_TEXT_XML) {
            let body = self.inner.text().await?;
            Ok(quick_xml::de::from_str(&body)?)
        } else {
            Err(HttpClientError::UnsupportedMediaType(ctype))
        }
    }

    /// Target path for a download into `directory` / 下载到目录时的目标路径
    ///
    /// `name.ext`, then `name(1).ext`, `name(2).ext` ... until a free name is found.
    fn target_path(&self, directory: &Path) -> PathBuf {
        let url = self.inner.url();
        let name = file_name(url.path());
        let ext = Path::new(url.path())
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .or_else(|| {
                let ctype = self.content_type();
                let essence = ctype.split(';').next().unwrap_or_default().trim();
                mime_guess::get_mime_extensions_str(essence)
                    .and_then(|exts| exts.first())
                    .map(|e| format!(".{}", e))
            })
            .unwrap_or_default();

        let mut target = directory.join(format!("{}{}", name, ext));
        let mut i = 1;
        while is_exist(&target) {
            target = directory.join(format!("{}({}){}", name, i, ext));
            i += 1;
        }
        target
    }

    /// Stream the body into a fresh file under `directory`
    /// 将响应体流式写入目录下的新文件
    pub async fn save_as_file<P: AsRef<Path>>(self, directory: P) -> HttpClientResult<u64> {
        let directory = std::path::absolute(directory.as_ref())?;
        if is_permission_denied(&directory) {
            return Err(HttpClientError::PermissionDenied(directory));
        }
        if !is_dir_exist(&directory) {
            return Err(HttpClientError::DirectoryNotFound(directory));
        }

        let target = self.target_path(&directory);
        debug!("Saving {} to {}", self.inner.url(), target.display());

        let mut file = tokio::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&target)
            .await?;
        let mut written = 0u64;
        let mut stream = self.inner.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}
