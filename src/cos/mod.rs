//! Tencent Cloud Object Storage client / 腾讯云对象存储客户端
//!
//! COS speaks the S3 protocol, so requests go through `aws-sdk-s3` against
//! the regional `myqcloud.com` endpoints.
//! COS兼容S3协议，请求经由`aws-sdk-s3`发往各地域的`myqcloud.com`端点。

mod bucket;
mod config;
mod error;
mod object;
mod service;

pub use bucket::{BucketClient, ObjectInfo};
pub use config::{bucket_url, static_url, AuthorizationConfig, BucketConfig, DEFAULT_REGION, SERVICE_ENDPOINT};
pub use error::{CosError, CosResult};
pub use object::{split_key, validate_file_name, validate_object_key, ObjectMeta};
pub use service::{put_bucket, AuthorizationClient, Bucket};
