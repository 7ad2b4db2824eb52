//! MaxMind GeoIP2 lookup client / MaxMind GeoIP2查询客户端
//!
//! This product includes GeoLite2 data created by MaxMind, available from
//! <https://www.maxmind.com>.
//!
//! - ASN and City databases are loaded together and swapped together
//! - Lookups are admission-limited and time-bounded
//! - A cron schedule refreshes the databases in the background
//!
//! 数据库成对加载与替换；查询有并发上限和超时；后台按cron计划刷新。

mod client;
mod config;
mod download;
mod error;
mod schedule;
pub mod service;
mod types;

pub use client::GeoIpClient;
pub use config::{
    CliArgs, GeoIpConfig, Geoip2ServerConfig, DEFAULT_ASN_URL, DEFAULT_CITY_URL, DEFAULT_UPDATE_SCHEDULE,
};
pub use download::{checksum_url, resolve_url};
pub use error::{GeoIpError, GeoIpResult};
pub use schedule::RefreshScheduler;
pub use types::{City, Continent, DbMeta, Edition, Location, LookupResult, Names, Region};

#[cfg(test)]
mod client_test;
