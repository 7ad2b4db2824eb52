//! Object operations / 对象操作

use super::error::{op_error, status_of};
use super::service::to_chrono;
use super::{BucketClient, CosError, CosResult};
use crate::utils::ensure_dir;
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

/// Head-object result / 对象头信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub content_length: i64,
    pub content_type: String,
    pub etag: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Reject empty keys and keys containing `^ & |` or whitespace
/// 拒绝空键以及包含`^ & |`或空白字符的键
pub fn validate_object_key(key: &str) -> CosResult<()> {
    if key.is_empty() {
        return Err(CosError::EmptyKey);
    }
    if key.chars().any(|c| matches!(c, '^' | '&' | '|') || c.is_whitespace()) {
        return Err(CosError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Reject file names containing `\ ^ & / |` or whitespace
/// 拒绝包含`\ ^ & / |`或空白字符的文件名
pub fn validate_file_name(name: &str) -> CosResult<()> {
    if name.is_empty() {
        return Err(CosError::EmptyKey);
    }
    if name
        .chars()
        .any(|c| matches!(c, '\\' | '^' | '&' | '/' | '|') || c.is_whitespace())
    {
        return Err(CosError::InvalidKey(name.to_string()));
    }
    Ok(())
}

/// Split a key into its "directory" (with trailing `/`) and file name
/// 将键拆分为“目录”（带`/`结尾）和文件名
pub fn split_key(key: &str) -> (&str, &str) {
    match key.rfind('/') {
        Some(idx) => key.split_at(idx + 1),
        None => ("", key),
    }
}

fn copy_source(bucket: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| url::form_urlencoded::byte_serialize(segment.as_bytes()).collect())
        .collect();
    format!("{}/{}", bucket, encoded.join("/"))
}

impl BucketClient {
    async fn exists(&self, key: &str) -> CosResult<bool> {
        match self.head_object(key, None).await {
            Ok(_) => Ok(true),
            Err(CosError::NoSuchObject(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn fetch(&self, key: &str) -> CosResult<GetObjectOutput> {
        if key.is_empty() {
            return Err(CosError::EmptyKey);
        }
        self.client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match status_of(&e) {
                Some(404) => CosError::NoSuchObject(key.to_string()),
                _ => op_error(e),
            })
    }

    /// Whole object content / 对象完整内容
    pub async fn get_object(&self, key: &str) -> CosResult<Bytes> {
        let output = self.fetch(key).await?;
        let data = output.body.collect().await.map_err(|e| CosError::Op {
            code: String::new(),
            message: e.to_string(),
        })?;
        Ok(data.into_bytes())
    }

    /// Upload an object, creating its parent "directory" placeholder
    /// 上传对象，并创建其父“目录”占位对象
    pub async fn put_object(&self, key: &str, body: impl Into<Bytes>, force: bool) -> CosResult<()> {
        validate_object_key(key)?;
        if !force && self.exists(key).await? {
            return Err(CosError::ObjectAlreadyExists(key.to_string()));
        }

        let (dir, _) = split_key(key);
        if !dir.is_empty() {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(dir)
                .body(ByteStream::from_static(b""))
                .send()
                .await
                .map_err(op_error)?;
        }

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body.into()))
            .send()
            .await
            .map_err(op_error)?;
        info!("Put object \"{}\" in bucket \"{}\"", key, self.bucket);
        Ok(())
    }

    /// Copy `src` to `dst` within the bucket / 在存储桶内复制对象
    ///
    /// Refuses to overwrite a destination with the same file name unless `force`.
    pub async fn copy(&self, src: &str, dst: &str, force: bool) -> CosResult<()> {
        if src.is_empty() || dst.is_empty() {
            return Err(CosError::EmptyKey);
        }
        if !self.exists(src).await? {
            return Err(CosError::NoSuchObject(src.to_string()));
        }
        let same_name = split_key(src).1 == split_key(dst).1;
        if !force && same_name && self.exists(dst).await? {
            return Err(CosError::ObjectAlreadyExists(dst.to_string()));
        }

        self.client
            .copy_object()
            .bucket(&self.bucket)
            .key(dst)
            .copy_source(copy_source(&self.bucket, src))
            .send()
            .await
            .map_err(op_error)?;
        info!("Copy object \"{}\" to \"{}\" in bucket \"{}\"", src, dst, self.bucket);
        Ok(())
    }

    /// Copy then delete the source / 复制后删除源对象
    pub async fn move_object(&self, src: &str, dst: &str, force: bool) -> CosResult<()> {
        self.copy(src, dst, force).await?;
        self.delete_object(src).await?;
        info!("Move object \"{}\" to \"{}\" in bucket \"{}\"", src, dst, self.bucket);
        Ok(())
    }

    /// Rename the file part of `src`, keeping its directory
    /// 重命名`src`的文件名部分，目录不变
    pub async fn rename(&self, src: &str, new_name: &str) -> CosResult<String> {
        validate_file_name(new_name)?;
        let dst = format!("{}{}", split_key(src).0, new_name);
        if self.exists(&dst).await? {
            return Err(CosError::Conflict(dst));
        }
        self.copy(src, &dst, false).await?;
        self.delete_object(src).await?;
        info!("Rename object \"{}\" to \"{}\" in bucket \"{}\"", src, dst, self.bucket);
        Ok(dst)
    }

    pub async fn delete_object(&self, key: &str) -> CosResult<()> {
        if key.is_empty() {
            return Err(CosError::EmptyKey);
        }
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(op_error)?;
        info!("Delete object \"{}\" in bucket \"{}\"", key, self.bucket);
        Ok(())
    }

    /// Object metadata; `NotModified` when unchanged since `if_modified_since`
    /// 对象元数据；自`if_modified_since`后未变化时返回`NotModified`
    pub async fn head_object(
        &self,
        key: &str,
        if_modified_since: Option<DateTime<Utc>>,
    ) -> CosResult<ObjectMeta> {
        if key.is_empty() {
            return Err(CosError::EmptyKey);
        }
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .set_if_modified_since(
                if_modified_since.map(|t| aws_sdk_s3::primitives::DateTime::from_secs(t.timestamp())),
            )
            .send()
            .await
            .map_err(|e| match status_of(&e) {
                Some(404) => CosError::NoSuchObject(key.to_string()),
                Some(304) => CosError::NotModified(key.to_string()),
                _ => op_error(e),
            })?;

        Ok(ObjectMeta {
            content_length: output.content_length().unwrap_or_default(),
            content_type: output.content_type().unwrap_or_default().to_string(),
            etag: output.e_tag().unwrap_or_default().to_string(),
            last_modified: output.last_modified().and_then(to_chrono),
        })
    }

    /// Download URL of an existing object / 已存在对象的下载地址
    pub async fn object_download_url(&self, key: &str) -> CosResult<String> {
        if !self.exists(key).await? {
            return Err(CosError::NoSuchObject(key.to_string()));
        }
        Ok(self.download_url(key))
    }

    /// Static-website URL of an existing object / 已存在对象的静态网站地址
    pub async fn object_static_url(&self, key: &str) -> CosResult<String> {
        if !self.exists(key).await? {
            return Err(CosError::NoSuchObject(key.to_string()));
        }
        Ok(self.website_url(key))
    }

    /// Stream an object into `writer`, returning bytes written
    /// 将对象流式写入`writer`，返回写入字节数
    pub async fn download_object<W>(&self, key: &str, writer: &mut W) -> CosResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let output = self.fetch(key).await?;
        write_body(output.body, writer).await
    }

    /// Save an object as `dir/filename`, creating `dir` / 将对象保存为`dir/filename`
    ///
    /// The file is created only once the object is found and removed again if
    /// the transfer breaks off.
    pub async fn download_to_local(&self, key: &str, dir: &Path, filename: &str) -> CosResult<PathBuf> {
        let output = self.fetch(key).await?;
        ensure_dir(dir)?;
        let target = dir.join(filename);
        let mut file = tokio::fs::File::create(&target).await?;
        if let Err(e) = write_body(output.body, &mut file).await {
            drop(file);
            if let Err(rm) = tokio::fs::remove_file(&target).await {
                warn!("Failed to remove {}: {}", target.display(), rm);
            }
            return Err(e);
        }
        Ok(target)
    }
}

async fn write_body<W>(mut body: ByteStream, writer: &mut W) -> CosResult<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written = 0u64;
    while let Some(chunk) = body.try_next().await.map_err(|e| CosError::Op {
        code: String::new(),
        message: e.to_string(),
    })? {
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_object_key() {
        assert!(validate_object_key("photos/2024/cat.png").is_ok());
        assert!(matches!(validate_object_key(""), Err(CosError::EmptyKey)));
        for bad in ["a b", "a^b", "a&b", "a|b", "tab\tkey", "line\n"] {
            assert!(
                matches!(validate_object_key(bad), Err(CosError::InvalidKey(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("report.pdf").is_ok());
        for bad in ["a/b", "a\\b", "a b", "a^b", "a&b", "a|b"] {
            assert!(matches!(validate_file_name(bad), Err(CosError::InvalidKey(_))));
        }
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("a/b/c.txt"), ("a/b/", "c.txt"));
        assert_eq!(split_key("c.txt"), ("", "c.txt"));
        assert_eq!(split_key("dir/"), ("dir/", ""));
    }

    #[test]
    fn test_copy_source_encoding() {
        assert_eq!(copy_source("b-1", "a/b.txt"), "b-1/a/b.txt");
        assert_eq!(copy_source("b-1", "文件/x+y.txt"), "b-1/%E6%96%87%E4%BB%B6/x%2By.txt");
    }
}
