//! Tests for the GeoIP2 client / GeoIP2客户端测试

use super::client::open_reader;
use super::download::tests::make_archive;
use super::*;
use crate::utils::is_exist;
use axum::http::{StatusCode, Uri};
use axum::routing::get;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::tempdir;

const EPOCH_OLD: u64 = 1_600_000_000;
const EPOCH_NEW: u64 = 1_700_000_000;

fn push_str(out: &mut Vec<u8>, s: &str) {
    out.push(0x40 | s.len() as u8);
    out.extend_from_slice(s.as_bytes());
}

/// Unsigned int of MMDB type `kind` (5 uint16, 6 uint32, 9 uint64)
fn push_uint(out: &mut Vec<u8>, kind: u8, value: u64) {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let data = &bytes[skip..];
    if kind <= 7 {
        out.push((kind << 5) | data.len() as u8);
    } else {
        out.push(data.len() as u8);
        out.push(kind - 7);
    }
    out.extend_from_slice(data);
}

/// Smallest valid MMDB: empty search tree, metadata only
/// 最小的合法MMDB：空搜索树，仅含元数据
fn make_mmdb(database_type: &str, build_epoch: u64) -> Vec<u8> {
    let mut buf = vec![0u8; 16];
    buf.extend_from_slice(b"\xab\xcd\xefMaxMind.com");
    buf.push(0xE0 | 9);
    push_str(&mut buf, "binary_format_major_version");
    push_uint(&mut buf, 5, 2);
    push_str(&mut buf, "binary_format_minor_version");
    push_uint(&mut buf, 5, 0);
    push_str(&mut buf, "build_epoch");
    push_uint(&mut buf, 9, build_epoch);
    push_str(&mut buf, "database_type");
    push_str(&mut buf, database_type);
    push_str(&mut buf, "description");
    buf.push(0xE0 | 1);
    push_str(&mut buf, "en");
    push_str(&mut buf, "test database");
    push_str(&mut buf, "ip_version");
    push_uint(&mut buf, 5, 6);
    push_str(&mut buf, "languages");
    buf.extend_from_slice(&[1, 4]);
    push_str(&mut buf, "en");
    push_str(&mut buf, "node_count");
    push_uint(&mut buf, 6, 0);
    push_str(&mut buf, "record_size");
    push_uint(&mut buf, 5, 24);
    buf
}

fn asn_archive(epoch: u64) -> Vec<u8> {
    let db = make_mmdb("GeoLite2-ASN", epoch);
    make_archive(&[("GeoLite2-ASN_20240102/GeoLite2-ASN.mmdb", db.as_slice())])
}

fn city_archive(epoch: u64) -> Vec<u8> {
    let db = make_mmdb("GeoLite2-City", epoch);
    make_archive(&[("GeoLite2-City_20240102/GeoLite2-City.mmdb", db.as_slice())])
}

/// Download server whose files can be swapped between calls
/// 可在调用之间替换文件的下载服务
#[derive(Clone, Default)]
struct Upstream(Arc<Mutex<HashMap<String, Vec<u8>>>>);

impl Upstream {
    fn set(&self, path: &str, body: Vec<u8>) {
        self.0.lock().insert(path.to_string(), body);
    }

    fn publish(&self, asn: Vec<u8>, city: Vec<u8>) {
        self.set("/asn.tar.gz", asn);
        self.set("/city.tar.gz", city);
    }

    fn router(&self) -> axum::Router {
        let files = self.clone();
        axum::Router::new().fallback(move |uri: Uri| {
            let files = files.clone();
            async move {
                match files.0.lock().get(uri.path()).cloned() {
                    Some(body) => Ok(body),
                    None => Err(StatusCode::NOT_FOUND),
                }
            }
        })
    }
}

fn epochs(client: &GeoIpClient) -> Vec<(String, i64)> {
    client
        .db_meta()
        .unwrap()
        .into_iter()
        .map(|m| (m.database_type, m.build_epoch.timestamp()))
        .collect()
}

async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn garbage_archives() -> axum::Router {
    let asn = make_archive(&[("GeoLite2-ASN_20240102/GeoLite2-ASN.mmdb", b"not a database")]);
    let city = make_archive(&[("GeoLite2-City_20240102/GeoLite2-City.mmdb", b"not a database")]);
    axum::Router::new()
        .route("/asn.tar.gz", get(move || async move { asn.clone() }))
        .route("/city.tar.gz", get(move || async move { city.clone() }))
        .route(
            "/asn.tar.gz.sha256",
            get(|| async { "0000 GeoLite2-ASN.tar.gz" }),
        )
        .route(
            "/city.tar.gz.sha256",
            get(|| async { "0000 GeoLite2-City.tar.gz" }),
        )
}

fn config_for(base: &str, db_dir: &std::path::Path) -> GeoIpConfig {
    GeoIpConfig {
        db_dir: db_dir.to_path_buf(),
        asn_url: format!("{}/asn.tar.gz", base),
        city_url: format!("{}/city.tar.gz", base),
        update_retries: 0,
        retry_backoff_ms: 10,
        ..GeoIpConfig::default()
    }
}

#[tokio::test]
async fn test_operations_without_database() {
    // Test NoDatabase paths / 测试未加载数据库的情况
    let client = GeoIpClient::new(GeoIpConfig::default()).unwrap();
    assert!(!client.is_ready());
    assert!(matches!(client.db_meta(), Err(GeoIpError::NoDatabase)));
    assert!(matches!(
        client.lookup("1.1.1.1").await,
        Err(GeoIpError::NoDatabase)
    ));
    assert!(matches!(client.close(), Err(GeoIpError::NoDatabase)));
}

#[tokio::test]
async fn test_invalid_ip() {
    let client = GeoIpClient::new(GeoIpConfig::default()).unwrap();
    for ip in ["", "300.1.1.1", "example.com", "::g"] {
        assert!(
            matches!(client.lookup(ip).await, Err(GeoIpError::InvalidIp(_))),
            "{} should be rejected",
            ip
        );
    }
}

#[tokio::test]
async fn test_too_many_lookups() {
    // Test admission limit / 测试并发上限
    let client = GeoIpClient::new(GeoIpConfig {
        max_connect: 1,
        ..GeoIpConfig::default()
    })
    .unwrap();
    assert_eq!(client.available_lookups(), 1);

    let held = client.limiter.try_acquire().unwrap();
    assert!(matches!(
        client.lookup("1.1.1.1").await,
        Err(GeoIpError::TooManyLookups)
    ));
    drop(held);

    // Permit released, so the lookup gets past admission
    assert!(matches!(
        client.lookup("1.1.1.1").await,
        Err(GeoIpError::NoDatabase)
    ));
    assert_eq!(client.available_lookups(), 1);
}

#[tokio::test]
async fn test_init_download_status() {
    // Test upstream 404 / 测试上游返回404
    let base = serve(axum::Router::new()).await;
    let dir = tempdir().unwrap();
    let client = GeoIpClient::new(config_for(&base, dir.path())).unwrap();

    let err = client.init().await.unwrap_err();
    assert!(matches!(err, GeoIpError::DownloadStatus(404)), "{:?}", err);
    assert!(!client.is_ready());
    assert!(!is_exist(&client.config().download_dir()));
}

#[tokio::test]
async fn test_init_rejects_corrupt_database() {
    // Test corrupt archive contents / 测试压缩包内容损坏
    let base = serve(garbage_archives()).await;
    let dir = tempdir().unwrap();
    let client = GeoIpClient::new(config_for(&base, dir.path())).unwrap();

    let err = client.init().await.unwrap_err();
    assert!(matches!(err, GeoIpError::Verify(_)), "{:?}", err);
    assert!(!client.is_ready());
    assert!(!is_exist(&client.config().download_dir()));
}

#[tokio::test]
async fn test_checksum_mismatch() {
    // Test published checksum check / 测试发布校验和检查
    let base = serve(garbage_archives()).await;
    let dir = tempdir().unwrap();
    let client = GeoIpClient::new(GeoIpConfig {
        verify_checksum: true,
        ..config_for(&base, dir.path())
    })
    .unwrap();

    let err = client.init().await.unwrap_err();
    match err {
        GeoIpError::ChecksumMismatch { expected, actual } => {
            assert_eq!(expected, "0000");
            assert_eq!(actual.len(), 64);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_update_db_keeps_state_on_failure() {
    // Test failed refresh leaves client unchanged / 测试刷新失败不改变客户端状态
    let base = serve(garbage_archives()).await;
    let dir = tempdir().unwrap();
    let client = GeoIpClient::new(GeoIpConfig {
        update_retries: 1,
        ..config_for(&base, dir.path())
    })
    .unwrap();

    let err = client.update_db().await.unwrap_err();
    assert!(matches!(err, GeoIpError::Verify(_)), "{:?}", err);
    assert!(!client.is_ready());
    assert!(!is_exist(&client.db_path(Edition::Asn)));
    assert!(!is_exist(&client.db_path(Edition::City)));
}

#[tokio::test]
async fn test_init_and_lookup_with_valid_databases() {
    // Test full load, metadata, lookup and close / 测试加载、元数据、查询与关闭
    let upstream = Upstream::default();
    upstream.publish(asn_archive(EPOCH_OLD), city_archive(EPOCH_OLD));
    let base = serve(upstream.router()).await;
    let dir = tempdir().unwrap();
    let client = GeoIpClient::new(config_for(&base, dir.path())).unwrap();

    client.init().await.unwrap();
    assert!(client.is_ready());
    assert!(is_exist(&client.db_path(Edition::Asn)));
    assert!(is_exist(&client.db_path(Edition::City)));
    assert!(!is_exist(&client.config().download_dir()));

    let meta = client.db_meta().unwrap();
    assert_eq!(meta.len(), 2);
    assert_eq!(meta[0].database_type, "GeoLite2-ASN");
    assert_eq!(meta[1].database_type, "GeoLite2-City");
    assert_eq!(meta[0].version, "2.0");
    assert_eq!(meta[0].ip_version, "6");
    assert_eq!(
        meta[1].build_epoch,
        Utc.timestamp_opt(EPOCH_OLD as i64, 0).unwrap()
    );

    assert!(matches!(
        client.lookup("8.8.8.8").await,
        Err(GeoIpError::NotFound(ref ip)) if ip == "8.8.8.8"
    ));
    assert!(matches!(
        client.lookup("2001:db8::1").await,
        Err(GeoIpError::NotFound(_))
    ));
    assert_eq!(client.available_lookups(), client.config().max_connect);

    client.close().unwrap();
    assert!(!client.is_ready());
    assert!(matches!(client.close(), Err(GeoIpError::NoDatabase)));
}

#[tokio::test]
async fn test_init_uses_files_on_disk() {
    // Test existing files skip the download / 测试已有文件时跳过下载
    let upstream = Upstream::default();
    upstream.publish(asn_archive(EPOCH_OLD), city_archive(EPOCH_OLD));
    let base = serve(upstream.router()).await;
    let dir = tempdir().unwrap();
    GeoIpClient::new(config_for(&base, dir.path()))
        .unwrap()
        .init()
        .await
        .unwrap();

    let offline = serve(axum::Router::new()).await;
    let client = GeoIpClient::new(config_for(&offline, dir.path())).unwrap();
    client.init().await.unwrap();
    assert_eq!(
        epochs(&client),
        vec![
            ("GeoLite2-ASN".to_string(), EPOCH_OLD as i64),
            ("GeoLite2-City".to_string(), EPOCH_OLD as i64),
        ]
    );
}

#[tokio::test]
async fn test_update_db_swaps_pair() {
    // Test refresh replaces both databases / 测试刷新替换两个数据库
    let upstream = Upstream::default();
    upstream.publish(asn_archive(EPOCH_OLD), city_archive(EPOCH_OLD));
    let base = serve(upstream.router()).await;
    let dir = tempdir().unwrap();
    let client = GeoIpClient::new(config_for(&base, dir.path())).unwrap();
    client.init().await.unwrap();

    upstream.publish(asn_archive(EPOCH_NEW), city_archive(EPOCH_NEW));
    client.update_db().await.unwrap();
    assert_eq!(
        epochs(&client),
        vec![
            ("GeoLite2-ASN".to_string(), EPOCH_NEW as i64),
            ("GeoLite2-City".to_string(), EPOCH_NEW as i64),
        ]
    );
    assert!(!is_exist(&client.config().download_dir()));
}

#[tokio::test]
async fn test_failed_update_keeps_old_pair() {
    // Test half-valid refresh changes nothing / 测试部分有效的刷新不做任何改变
    let upstream = Upstream::default();
    upstream.publish(asn_archive(EPOCH_OLD), city_archive(EPOCH_OLD));
    let base = serve(upstream.router()).await;
    let dir = tempdir().unwrap();
    let client = GeoIpClient::new(config_for(&base, dir.path())).unwrap();
    client.init().await.unwrap();

    let broken_city = make_archive(&[("GeoLite2-City_20240109/GeoLite2-City.mmdb", b"not a database")]);
    upstream.publish(asn_archive(EPOCH_NEW), broken_city);
    let err = client.update_db().await.unwrap_err();
    assert!(matches!(err, GeoIpError::Verify(_)), "{:?}", err);

    // Loaded pair keeps serving
    assert!(client.is_ready());
    assert!(matches!(
        client.lookup("1.1.1.1").await,
        Err(GeoIpError::NotFound(_))
    ));
    assert_eq!(
        epochs(&client),
        vec![
            ("GeoLite2-ASN".to_string(), EPOCH_OLD as i64),
            ("GeoLite2-City".to_string(), EPOCH_OLD as i64),
        ]
    );

    // Files on disk are still the old pair
    let asn = open_reader(&client.db_path(Edition::Asn), Edition::Asn).unwrap();
    let city = open_reader(&client.db_path(Edition::City), Edition::City).unwrap();
    assert_eq!(asn.metadata.build_epoch, EPOCH_OLD);
    assert_eq!(city.metadata.build_epoch, EPOCH_OLD);
    assert!(!is_exist(&client.config().download_dir()));
}

#[test]
fn test_open_reader_checks_edition() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("GeoLite2-City.mmdb");
    std::fs::write(&path, make_mmdb("GeoLite2-ASN", EPOCH_OLD)).unwrap();
    assert!(matches!(
        open_reader(&path, Edition::City),
        Err(GeoIpError::Verify(_))
    ));
    assert!(open_reader(&path, Edition::Asn).is_ok());
}

#[test]
fn test_open_reader_rejects_garbage() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("GeoLite2-City.mmdb");
    std::fs::write(&path, b"definitely not maxmind").unwrap();
    assert!(matches!(
        open_reader(&path, Edition::City),
        Err(GeoIpError::Verify(_))
    ));
}

#[test]
fn test_db_path() {
    let client = GeoIpClient::new(GeoIpConfig {
        db_dir: "/var/lib/geo".into(),
        ..GeoIpConfig::default()
    })
    .unwrap();
    assert_eq!(
        client.db_path(Edition::City),
        std::path::PathBuf::from("/var/lib/geo/GeoLite2-City.mmdb")
    );
}
