//! Fetch and unpack MaxMind database archives / 下载并解包MaxMind数据库压缩包

use super::{Edition, GeoIpError, GeoIpResult};
use crate::http::Client;
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Substitute the license key into a download URL / 将许可证密钥替换进下载URL
pub fn resolve_url(template: &str, license_key: &str) -> String {
    template.replace("{license_key}", license_key)
}

/// Location of the published sha256 for an archive URL / 压缩包sha256文件的URL
pub fn checksum_url(url: &str) -> String {
    if url.contains("suffix=tar.gz") && !url.contains("suffix=tar.gz.sha256") {
        url.replacen("suffix=tar.gz", "suffix=tar.gz.sha256", 1)
    } else {
        format!("{}.sha256", url)
    }
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Download the archive for `edition` and extract its `.mmdb` into `dest_dir`
/// 下载`edition`的压缩包并将`.mmdb`解压到`dest_dir`
pub(crate) async fn download_mmdb(
    client: &Client,
    url: &str,
    edition: Edition,
    dest_dir: &Path,
    verify_checksum: bool,
) -> GeoIpResult<PathBuf> {
    info!("Downloading {} ...", edition);
    let resp = client.get(url).await?;
    if !resp.status().is_success() {
        return Err(GeoIpError::DownloadStatus(resp.status().as_u16()));
    }
    let archive = resp.to_bytes().await?;
    info!("Download {} complete, {} bytes", edition, archive.len());

    if verify_checksum {
        let resp = client.get(&checksum_url(url)).await?;
        if !resp.status().is_success() {
            return Err(GeoIpError::DownloadStatus(resp.status().as_u16()));
        }
        let published = resp.to_text().await?;
        let expected = published
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let actual = sha256_hex(&archive);
        if expected != actual {
            return Err(GeoIpError::ChecksumMismatch { expected, actual });
        }
        debug!("Checksum verified for {}", edition);
    }

    let dest_dir = dest_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_mmdb(&archive, edition, &dest_dir))
        .await
        .map_err(|e| GeoIpError::Internal(format!("Task join error: {}", e)))?
}

/// Unpack the first `<edition>.mmdb` entry of a `.tar.gz` archive
/// 解包`.tar.gz`中第一个`<edition>.mmdb`条目
pub(crate) fn extract_mmdb(archive: &[u8], edition: Edition, dest_dir: &Path) -> GeoIpResult<PathBuf> {
    std::fs::create_dir_all(dest_dir)?;
    let wanted = edition.file_name();

    let mut tar = tar::Archive::new(GzDecoder::new(Cursor::new(archive)));
    for entry in tar.entries()? {
        let mut entry = entry?;
        let is_wanted = entry
            .path()?
            .file_name()
            .map(|name| name.to_string_lossy() == wanted.as_str())
            .unwrap_or(false);
        if !is_wanted || !entry.header().entry_type().is_file() {
            continue;
        }
        let target = dest_dir.join(&wanted);
        entry.unpack(&target)?;
        return Ok(target);
    }

    Err(GeoIpError::MissingDatabase(wanted))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use tempfile::tempdir;

    /// Build a `.tar.gz` with the given entries / 构造包含指定条目的`.tar.gz`
    pub(crate) fn make_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_resolve_and_checksum_url() {
        let url = resolve_url(crate::geoip2::DEFAULT_CITY_URL, "KEY");
        assert!(url.contains("license_key=KEY"));
        assert!(checksum_url(&url).ends_with("suffix=tar.gz.sha256"));
        assert_eq!(
            checksum_url("http://x/GeoLite2-ASN.tar.gz"),
            "http://x/GeoLite2-ASN.tar.gz.sha256"
        );
    }

    #[test]
    fn test_extract_mmdb() {
        // Test archive extraction / 测试解压
        let dir = tempdir().unwrap();
        let archive = make_archive(&[
            ("GeoLite2-ASN_20240102/COPYRIGHT.txt", b"c"),
            ("GeoLite2-ASN_20240102/GeoLite2-ASN.mmdb", b"mmdb-bytes"),
        ]);
        let path = extract_mmdb(&archive, Edition::Asn, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("GeoLite2-ASN.mmdb"));
        assert_eq!(std::fs::read(&path).unwrap(), b"mmdb-bytes");
    }

    #[test]
    fn test_extract_missing_edition() {
        let dir = tempdir().unwrap();
        let archive = make_archive(&[("x/GeoLite2-City.mmdb", b"city")]);
        let err = extract_mmdb(&archive, Edition::Asn, dir.path()).unwrap_err();
        assert!(matches!(err, GeoIpError::MissingDatabase(_)));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
