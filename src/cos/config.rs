//! COS credentials and bucket configuration / COS凭证与存储桶配置

use super::{CosError, CosResult};
use serde::{Deserialize, Serialize};

/// Region used for account-level calls / 账户级调用使用的地域
pub const DEFAULT_REGION: &str = "ap-guangzhou";

/// Account-level endpoint for listing buckets / 列举存储桶的账户级端点
pub const SERVICE_ENDPOINT: &str = "https://service.cos.myqcloud.com";

/// Account credentials / 账户凭证
///
/// Keys are managed at <https://console.cloud.tencent.com/cam/capi>.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    pub app_id: String,
    pub secret_id: String,
    pub secret_key: String,
    /// Override the COS endpoint, e.g. a private deployment; uses path-style addressing
    /// 覆盖COS端点（如私有部署），使用路径风格寻址
    pub endpoint: Option<String>,
}

impl AuthorizationConfig {
    pub fn check(&self) -> CosResult<()> {
        if self.app_id.is_empty() {
            return Err(CosError::EmptyAppId);
        }
        if self.secret_id.is_empty() {
            return Err(CosError::EmptySecretId);
        }
        if self.secret_key.is_empty() {
            return Err(CosError::EmptySecretKey);
        }
        Ok(())
    }
}

/// Bucket configuration; `name` excludes the `-<appid>` suffix
/// 存储桶配置；`name`不含`-<appid>`后缀
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    pub auth: AuthorizationConfig,
    pub name: String,
    /// See <https://intl.cloud.tencent.com/document/product/436/6224>
    pub region: String,
}

impl BucketConfig {
    pub fn check(&self) -> CosResult<()> {
        self.auth.check()?;
        if self.name.is_empty() {
            return Err(CosError::EmptyBucketName);
        }
        if self.region.is_empty() {
            return Err(CosError::EmptyRegion);
        }
        Ok(())
    }

    /// Bucket name as COS knows it, `<name>-<appid>` / COS中的完整存储桶名
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.auth.app_id)
    }
}

/// `https://<bucket>.cos.<region>.myqcloud.com`
pub fn bucket_url(full_name: &str, region: &str) -> String {
    format!("https://{}.cos.{}.myqcloud.com", full_name, region)
}

/// `https://<name>-<appid>.cos-website.<region>.myqcloud.com/<key>`
pub fn static_url(full_name: &str, region: &str, key: &str) -> String {
    format!("https://{}.cos-website.{}.myqcloud.com/{}", full_name, region, key)
}

/// Regional endpoint the S3-compatible API is served from / S3兼容API的地域端点
pub(crate) fn region_endpoint(region: &str) -> String {
    format!("https://cos.{}.myqcloud.com", region)
}
