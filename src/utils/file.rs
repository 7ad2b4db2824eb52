//! Filesystem probes / 文件系统探测

use std::io;
use std::path::Path;

/// Path exists, whatever its kind / 路径存在（任意类型）
pub fn is_exist<P: AsRef<Path>>(path: P) -> bool {
    std::fs::metadata(path).is_ok()
}

/// Path exists and is a directory / 路径存在且为目录
pub fn is_dir_exist<P: AsRef<Path>>(path: P) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// Metadata lookup is refused by the OS / 系统拒绝访问元数据
pub fn is_permission_denied<P: AsRef<Path>>(path: P) -> bool {
    matches!(
        std::fs::metadata(path),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied
    )
}

/// Last path segment with its final extension removed
/// 去掉最后一个扩展名的路径末段
///
/// Works on plain paths and on URL paths; query strings and fragments are ignored.
pub fn file_name(name: &str) -> String {
    let name = name.split(['?', '#']).next().unwrap_or_default();
    let base = name.rsplit('/').next().unwrap_or_default();
    match base.rfind('.') {
        Some(idx) if idx > 0 => base[..idx].to_string(),
        _ => base.to_string(),
    }
}

/// Create `path` and its parents if missing / 目录不存在时创建
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let path = path.as_ref();
    if is_dir_exist(path) {
        return Ok(());
    }
    std::fs::create_dir_all(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_name() {
        // Test base name extraction / 测试文件名提取
        assert_eq!(file_name("/a/b/c.tar.gz"), "c.tar");
        assert_eq!(file_name("https://example.com/y/z.png"), "z");
        assert_eq!(file_name("https://example.com/y/z.png?v=1"), "z");
        assert_eq!(file_name("README"), "README");
        assert_eq!(file_name(".hidden"), ".hidden");
    }

    #[test]
    fn test_exist_checks() {
        // Test existence probes / 测试存在性检查
        let dir = tempdir().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, b"x").unwrap();

        assert!(is_exist(&file));
        assert!(!is_dir_exist(&file));
        assert!(is_dir_exist(dir.path()));
        assert!(!is_exist(dir.path().join("missing")));
        assert!(!is_permission_denied(&file));
    }

    #[test]
    fn test_ensure_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_dir(&nested).unwrap();
        assert!(is_dir_exist(&nested));
        // Idempotent / 幂等
        ensure_dir(&nested).unwrap();
    }
}
