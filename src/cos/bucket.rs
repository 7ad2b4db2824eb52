//! Bucket-scoped COS client / 存储桶级COS客户端

use super::config::{bucket_url, region_endpoint, static_url};
use super::error::{op_error, status_of};
use super::service::{s3_client, to_chrono};
use super::{BucketConfig, CosError, CosResult};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Object summary from a listing / 列举结果中的对象概要
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: i64,
    pub etag: String,
    pub last_modified: Option<DateTime<Utc>>,
}

impl From<&aws_sdk_s3::types::Object> for ObjectInfo {
    fn from(obj: &aws_sdk_s3::types::Object) -> Self {
        Self {
            key: obj.key().unwrap_or_default().to_string(),
            size: obj.size().unwrap_or_default(),
            etag: obj.e_tag().unwrap_or_default().to_string(),
            last_modified: obj.last_modified().and_then(to_chrono),
        }
    }
}

/// Client bound to one bucket / 绑定单个存储桶的客户端
pub struct BucketClient {
    pub(super) config: BucketConfig,
    pub(super) bucket: String,
    pub(super) client: Client,
}

impl BucketClient {
    /// Check the configuration and build the client without contacting COS
    /// 检查配置并构建客户端，不访问COS
    pub(crate) fn build(config: BucketConfig) -> CosResult<Self> {
        config.check()?;
        let client = s3_client(&config.auth, &config.region, region_endpoint(&config.region));
        Ok(Self {
            bucket: config.full_name(),
            config,
            client,
        })
    }

    /// Create a client and confirm the bucket is reachable / 创建客户端并确认存储桶可访问
    pub async fn create(config: BucketConfig) -> CosResult<Self> {
        let bucket = Self::build(config)?;
        bucket
            .client
            .head_bucket()
            .bucket(&bucket.bucket)
            .send()
            .await
            .map_err(|e| match status_of(&e) {
                Some(404) => CosError::NoSuchBucket,
                Some(403) => CosError::AccessDenied,
                _ => op_error(e),
            })?;
        Ok(bucket)
    }

    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    /// Full bucket name / 完整存储桶名
    pub fn name(&self) -> &str {
        &self.bucket
    }

    /// `https://<bucket>.cos.<region>.myqcloud.com`
    pub fn url(&self) -> String {
        bucket_url(&self.bucket, &self.config.region)
    }

    pub(super) fn download_url(&self, key: &str) -> String {
        format!("{}/{}", self.url(), key)
    }

    pub(super) fn website_url(&self, key: &str) -> String {
        static_url(&self.bucket, &self.config.region, key)
    }

    /// Delete the bucket; it must be empty / 删除存储桶（须为空）
    pub async fn delete(&self) -> CosResult<()> {
        self.client
            .delete_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| match status_of(&e) {
                Some(409) => CosError::BucketNotEmpty,
                Some(403) => CosError::AccessDenied,
                Some(404) => CosError::NoSuchBucket,
                _ => op_error(e),
            })?;
        info!("Delete bucket \"{}\"", self.bucket);
        Ok(())
    }

    /// Objects under `prefix`, following continuation tokens
    /// 列举`prefix`下的对象（自动翻页）
    pub async fn list_objects(&self, prefix: Option<&str>) -> CosResult<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_prefix(prefix.map(str::to_string))
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(op_error)?;
            objects.extend(output.contents().iter().map(ObjectInfo::from));
            match output.next_continuation_token() {
                Some(next) if !next.is_empty() => token = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(objects)
    }
}
