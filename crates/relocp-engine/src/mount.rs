//! Source mounting

use async_trait::async_trait;
use relocp_types::{Error, Mounter, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Validates that a pre-mounted local source path exists and is a
/// directory. Actual network or removable-media mounting is left to the
/// operating system; this implementation only confirms the path is usable.
#[derive(Debug, Default, Clone)]
pub struct LocalMounter;

impl LocalMounter {
    /// Create a new mounter
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mounter for LocalMounter {
    async fn mount(&self, spec: &str) -> Result<PathBuf> {
        let path = PathBuf::from(spec);
        let meta = tokio::fs::metadata(&path).await.map_err(|e| {
            Error::mount(format!("source path {} not available: {}", path.display(), e))
        })?;
        if !meta.is_dir() {
            return Err(Error::mount(format!(
                "source path {} is not a directory",
                path.display()
            )));
        }
        info!(path = %path.display(), "source available");
        Ok(path)
    }

    async fn unmount(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// Mount with bounded retries.
///
/// Network sources can take a while to appear after boot, so a failing
/// mount is retried with a fixed delay before the run is declared failed.
pub async fn mount_with_retries(
    mounter: &dyn Mounter,
    spec: &str,
    retries: u32,
    delay: Duration,
) -> Result<PathBuf> {
    let mut last = None;
    for attempt in 0..=retries {
        match mounter.mount(spec).await {
            Ok(path) => return Ok(path),
            Err(e) => {
                if attempt < retries {
                    warn!(
                        attempt = attempt + 1,
                        error = %e,
                        "mount failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                last = Some(e);
            }
        }
    }
    Err(last.unwrap_or_else(|| Error::mount("mount failed with no attempts")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_mount_existing_directory() {
        let dir = TempDir::new().unwrap();
        let mounter = LocalMounter::new();
        let path = mounter
            .mount(&dir.path().to_string_lossy())
            .await
            .unwrap();
        assert_eq!(path, dir.path());
    }

    #[tokio::test]
    async fn test_mount_missing_path_fails() {
        let mounter = LocalMounter::new();
        let result = mounter.mount("/nonexistent/source").await;
        assert!(matches!(result, Err(Error::Mount { .. })));
    }

    #[tokio::test]
    async fn test_mount_file_fails() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        tokio::fs::write(&file, b"x").await.unwrap();

        let mounter = LocalMounter::new();
        let result = mounter.mount(&file.to_string_lossy()).await;
        assert!(matches!(result, Err(Error::Mount { .. })));
    }

    #[tokio::test]
    async fn test_retry_eventually_succeeds() {
        struct FlakyMounter {
            calls: AtomicU32,
            path: PathBuf,
        }

        #[async_trait]
        impl Mounter for FlakyMounter {
            async fn mount(&self, _spec: &str) -> Result<PathBuf> {
                if self.calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::mount("not ready"))
                } else {
                    Ok(self.path.clone())
                }
            }

            async fn unmount(&self, _path: &Path) -> Result<()> {
                Ok(())
            }
        }

        let dir = TempDir::new().unwrap();
        let mounter = FlakyMounter {
            calls: AtomicU32::new(0),
            path: dir.path().to_path_buf(),
        };

        let path = mount_with_retries(&mounter, "spec", 3, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(path, dir.path());
        assert_eq!(mounter.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_returns_last_error() {
        let mounter = LocalMounter::new();
        let result =
            mount_with_retries(&mounter, "/nonexistent", 1, Duration::from_millis(1)).await;
        assert!(matches!(result, Err(Error::Mount { .. })));
    }
}
