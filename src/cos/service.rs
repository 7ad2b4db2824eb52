//! Account-level COS client / 账户级COS客户端

use super::config::{region_endpoint, DEFAULT_REGION, SERVICE_ENDPOINT};
use super::error::op_error;
use super::{AuthorizationConfig, BucketClient, BucketConfig, CosError, CosResult};
use aws_sdk_s3::config::{
    BehaviorVersion, Credentials, Region, RequestChecksumCalculation, ResponseChecksumValidation,
};
use aws_sdk_s3::Client;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Build an S3-compatible client for COS / 构建COS的S3兼容客户端
///
/// With an endpoint override the bucket goes into the path, otherwise into the host.
/// Checksums are only sent where an operation requires them, COS rejects aws-chunked uploads.
pub(crate) fn s3_client(auth: &AuthorizationConfig, region: &str, default_endpoint: String) -> Client {
    let credentials = Credentials::new(
        auth.secret_id.clone(),
        auth.secret_key.clone(),
        None,
        None,
        "apix-cos",
    );
    let (endpoint, path_style) = match &auth.endpoint {
        Some(endpoint) => (endpoint.clone(), true),
        None => (default_endpoint, false),
    };
    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .endpoint_url(endpoint)
        .credentials_provider(credentials)
        .force_path_style(path_style)
        .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
        .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
        .build();
    Client::from_conf(config)
}

pub(crate) fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(dt.secs(), dt.subsec_nanos()).single()
}

/// Bucket summary / 存储桶概要
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Full name, `<name>-<appid>` / 完整名称
    pub name: String,
    /// Empty when the listing does not report it / 列举结果未提供时为空
    pub region: String,
    pub creation_date: Option<DateTime<Utc>>,
}

/// Authorized account client / 已授权的账户客户端
pub struct AuthorizationClient {
    config: AuthorizationConfig,
    client: Client,
}

impl AuthorizationClient {
    /// Check `config` and confirm the credentials by listing buckets
    /// 检查配置并通过列举存储桶确认凭证
    pub async fn create(config: AuthorizationConfig) -> CosResult<Self> {
        config.check()?;
        let client = s3_client(&config, DEFAULT_REGION, SERVICE_ENDPOINT.to_string());
        client.list_buckets().send().await.map_err(op_error)?;
        debug!("COS authorization confirmed for app {}", config.app_id);
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }

    /// All buckets of the account / 账户下的所有存储桶
    pub async fn list_buckets(&self) -> CosResult<Vec<Bucket>> {
        let output = self.client.list_buckets().send().await.map_err(op_error)?;
        let buckets: Vec<Bucket> = output
            .buckets()
            .iter()
            .map(|b| Bucket {
                name: b.name().unwrap_or_default().to_string(),
                region: String::new(),
                creation_date: b.creation_date().and_then(to_chrono),
            })
            .collect();
        if buckets.is_empty() {
            return Err(CosError::NoBucket);
        }
        Ok(buckets)
    }

    /// Client for an existing bucket; `bucket.region` must be set
    /// 为已有存储桶创建客户端；需设置`bucket.region`
    pub async fn create_bucket_client(&self, bucket: &Bucket) -> CosResult<BucketClient> {
        if bucket.name.is_empty() {
            return Err(CosError::EmptyBucketName);
        }
        if bucket.region.is_empty() {
            return Err(CosError::EmptyRegion);
        }
        let suffix = format!("-{}", self.config.app_id);
        let config = BucketConfig {
            auth: self.config.clone(),
            name: bucket
                .name
                .strip_suffix(&suffix)
                .unwrap_or(&bucket.name)
                .to_string(),
            region: bucket.region.clone(),
        };
        BucketClient::create(config).await
    }
}

/// Create a bucket; `acl` defaults to `public-read`
/// 创建存储桶；`acl`默认为`public-read`
pub async fn put_bucket(config: &BucketConfig, acl: Option<&str>) -> CosResult<()> {
    config.check()?;
    let client = s3_client(&config.auth, &config.region, region_endpoint(&config.region));
    let acl = aws_sdk_s3::types::BucketCannedAcl::from(acl.unwrap_or("public-read"));

    match client
        .create_bucket()
        .bucket(config.full_name())
        .acl(acl)
        .send()
        .await
    {
        Ok(_) => {
            info!("Put bucket \"{}\" in {}", config.full_name(), config.region);
            Ok(())
        }
        Err(e) if super::error::status_of(&e) == Some(409) => Err(CosError::BucketAlreadyExists),
        Err(e) => Err(op_error(e)),
    }
}
