//! Lookup result and database metadata types / 查询结果与数据库元数据类型
//!
//! The same structs decode MMDB records (keys like `zh-CN`) and serialize the
//! HTTP response (keys like `zh-cn`); aliases bridge the two spellings.
//! 同一组结构既用于解码MMDB记录，也用于序列化HTTP响应，别名用于兼容两种拼写。

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Database edition / 数据库版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edition {
    Asn,
    City,
}

impl Edition {
    pub const ALL: [Edition; 2] = [Edition::Asn, Edition::City];

    /// Edition id, e.g. `GeoLite2-ASN` / 版本标识
    pub fn id(&self) -> &'static str {
        match self {
            Edition::Asn => "GeoLite2-ASN",
            Edition::City => "GeoLite2-City",
        }
    }

    /// On-disk file name / 磁盘文件名
    pub fn file_name(&self) -> String {
        format!("{}.mmdb", self.id())
    }

    /// Whether a metadata `database_type` belongs to this edition
    /// 元数据中的`database_type`是否属于该版本
    pub fn accepts(&self, database_type: &str) -> bool {
        match self {
            Edition::Asn => database_type.ends_with("-ASN"),
            Edition::City => database_type.ends_with("-City"),
        }
    }
}

impl std::fmt::Display for Edition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Localized names / 本地化名称
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Names {
    #[serde(rename = "zh-cn", alias = "zh-CN")]
    pub zh_cn: String,
    pub en: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Continent {
    pub code: String,
    pub names: Names,
}

/// Country, registered country or subdivision / 国家、注册国家或行政区
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Region {
    pub iso_code: String,
    pub names: Names,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct City {
    pub names: Names,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub time_zone: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_radius: u32,
}

/// Merged ASN + City lookup result / 合并ASN与City的查询结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupResult {
    pub continent: Continent,
    pub country: Region,
    pub city: City,
    pub subdivisions: Vec<Region>,
    pub location: Location,
    pub registered_country: Region,
    #[serde(alias = "autonomous_system_organization")]
    pub organization: String,
    #[serde(alias = "autonomous_system_number")]
    pub asn: u32,
}

/// ASN database record / ASN数据库记录
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AsnRecord {
    pub autonomous_system_number: u32,
    pub autonomous_system_organization: String,
}

impl LookupResult {
    /// Merge an optional City record with an optional ASN record
    /// 合并可选的City记录与ASN记录
    pub(crate) fn merge(city: Option<LookupResult>, asn: Option<AsnRecord>) -> Self {
        let mut result = city.unwrap_or_default();
        if let Some(asn) = asn {
            result.organization = asn.autonomous_system_organization;
            result.asn = asn.autonomous_system_number;
        }
        result
    }
}

/// Database metadata / 数据库元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbMeta {
    /// Binary format `major.minor` / 二进制格式版本
    pub version: String,
    #[serde(rename = "ipVersion")]
    pub ip_version: String,
    #[serde(rename = "type")]
    pub database_type: String,
    #[serde(rename = "buildEpoch")]
    pub build_epoch: DateTime<Utc>,
}

impl DbMeta {
    pub(crate) fn from_metadata(meta: &maxminddb::Metadata) -> Self {
        Self {
            version: format!(
                "{}.{}",
                meta.binary_format_major_version, meta.binary_format_minor_version
            ),
            ip_version: meta.ip_version.to_string(),
            database_type: meta.database_type.clone(),
            build_epoch: Utc
                .timestamp_opt(meta.build_epoch as i64, 0)
                .single()
                .unwrap_or_default(),
        }
    }
}
