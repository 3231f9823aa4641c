//! Built-in single-file copier

use async_trait::async_trait;
use relocp_types::{Error, FileCopier, Result};
use std::path::Path;
use tracing::trace;

/// Copies one file on the local filesystem, preserving its modification
/// time so later skip decisions and metadata verification see the source
/// timestamp on the destination.
#[derive(Debug, Default, Clone)]
pub struct LocalCopier;

impl LocalCopier {
    /// Create a new copier
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileCopier for LocalCopier {
    async fn copy(&self, source: &Path, destination: &Path) -> Result<u64> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| map_io(destination, "create parent directory", e))?;
        }

        let bytes = tokio::fs::copy(source, destination)
            .await
            .map_err(|e| map_io(source, "copy", e))?;

        // Carry the source mtime over so the destination is recognizably
        // the same file on a later pass
        let meta = tokio::fs::metadata(source)
            .await
            .map_err(|e| map_io(source, "read metadata", e))?;
        if let Ok(modified) = meta.modified() {
            let mtime = filetime::FileTime::from_system_time(modified);
            filetime::set_file_mtime(destination, mtime)
                .map_err(|e| map_io(destination, "set mtime", e))?;
        }

        trace!(
            source = %source.display(),
            destination = %destination.display(),
            bytes,
            "copied"
        );
        Ok(bytes)
    }
}

fn map_io(path: &Path, op: &str, e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Error::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Error::Copy {
            path: path.to_path_buf(),
            reason: format!("{} failed: {}", op, e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copy_creates_parents() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("deep/nested/dst.txt");
        tokio::fs::write(&src, b"payload").await.unwrap();

        let copier = LocalCopier::new();
        let bytes = copier.copy(&src, &dst).await.unwrap();

        assert_eq!(bytes, 7);
        assert_eq!(tokio::fs::read(&dst).await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_copy_preserves_mtime() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        tokio::fs::write(&src, b"x").await.unwrap();

        let old = filetime::FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&src, old).unwrap();

        let copier = LocalCopier::new();
        copier.copy(&src, &dst).await.unwrap();

        let dst_meta = std::fs::metadata(&dst).unwrap();
        let dst_mtime = filetime::FileTime::from_last_modification_time(&dst_meta);
        assert_eq!(dst_mtime.unix_seconds(), 1_600_000_000);
    }

    #[tokio::test]
    async fn test_missing_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let copier = LocalCopier::new();
        let result = copier
            .copy(&dir.path().join("gone.txt"), &dir.path().join("dst.txt"))
            .await;
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }
}
