//! Post-copy integrity verification

use crate::hasher::StreamingHasher;
use relocp_types::{Error, HashAlgorithm, Hasher, Result, VerifyMethod};
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

/// Outcome of checking one source/destination pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCheck {
    /// Source and destination agree under the configured method
    Match,
    /// Destination content disagrees with the source
    Mismatch {
        /// Value computed from the source file
        expected: String,
        /// Value computed from the destination file
        actual: String,
    },
    /// Destination file does not exist
    MissingDestination,
}

/// Compares copied files against their sources.
///
/// The comparison method and hash algorithm come from configuration. Hash
/// comparisons are retried a bounded number of times so a transient read
/// problem on either side does not immediately surface as a discrepancy.
pub struct IntegrityVerifier {
    method: VerifyMethod,
    algorithm: HashAlgorithm,
    hash_retries: u32,
    hasher: Arc<dyn Hasher>,
}

impl IntegrityVerifier {
    /// Create a verifier for the given method and algorithm.
    pub fn new(method: VerifyMethod, algorithm: HashAlgorithm, hash_retries: u32) -> Self {
        Self {
            method,
            algorithm,
            hash_retries,
            hasher: Arc::new(StreamingHasher::new()),
        }
    }

    /// Replace the hasher, used by tests to inject failures.
    pub fn with_hasher(mut self, hasher: Arc<dyn Hasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Check one source/destination pair.
    ///
    /// Returns `Ok` with the comparison outcome. An `Err` means the check
    /// itself could not run, for example because the source file vanished.
    pub async fn check_file(&self, source: &Path, destination: &Path) -> Result<FileCheck> {
        match tokio::fs::metadata(destination).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FileCheck::MissingDestination);
            }
            Err(e) => {
                return Err(Error::Hash {
                    path: destination.to_path_buf(),
                    message: format!("metadata failed: {}", e),
                });
            }
        }

        match self.method {
            VerifyMethod::Hash => self.check_hash(source, destination).await,
            VerifyMethod::Size => self.check_size(source, destination).await,
            VerifyMethod::Metadata => self.check_metadata(source, destination).await,
        }
    }

    async fn check_hash(&self, source: &Path, destination: &Path) -> Result<FileCheck> {
        let mut last: Option<FileCheck> = None;
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.hash_retries {
            let outcome = self.hash_pair(source, destination).await;
            match outcome {
                Ok(FileCheck::Match) => return Ok(FileCheck::Match),
                Ok(check) => {
                    if attempt < self.hash_retries {
                        warn!(
                            source = %source.display(),
                            attempt = attempt + 1,
                            "hash mismatch, retrying"
                        );
                    }
                    last = Some(check);
                }
                Err(e) => {
                    if attempt < self.hash_retries {
                        warn!(
                            source = %source.display(),
                            attempt = attempt + 1,
                            error = %e,
                            "hash read failed, retrying"
                        );
                    }
                    last_err = Some(e);
                }
            }
        }

        match (last, last_err) {
            (Some(check), _) => Ok(check),
            (None, Some(e)) => Err(e),
            (None, None) => Ok(FileCheck::Match),
        }
    }

    async fn hash_pair(&self, source: &Path, destination: &Path) -> Result<FileCheck> {
        let expected = self.hasher.digest(source, self.algorithm).await?;
        let actual = self.hasher.digest(destination, self.algorithm).await?;
        if expected.eq_ignore_ascii_case(&actual) {
            debug!(source = %source.display(), "hash verified");
            Ok(FileCheck::Match)
        } else {
            Ok(FileCheck::Mismatch { expected, actual })
        }
    }

    async fn check_size(&self, source: &Path, destination: &Path) -> Result<FileCheck> {
        let src_len = file_len(source).await?;
        let dst_len = file_len(destination).await?;
        if src_len == dst_len {
            Ok(FileCheck::Match)
        } else {
            Ok(FileCheck::Mismatch {
                expected: src_len.to_string(),
                actual: dst_len.to_string(),
            })
        }
    }

    async fn check_metadata(&self, source: &Path, destination: &Path) -> Result<FileCheck> {
        let (src_len, src_mtime) = file_len_mtime(source).await?;
        let (dst_len, dst_mtime) = file_len_mtime(destination).await?;
        if src_len == dst_len && src_mtime == dst_mtime {
            Ok(FileCheck::Match)
        } else {
            Ok(FileCheck::Mismatch {
                expected: format!("size={} mtime={}", src_len, src_mtime),
                actual: format!("size={} mtime={}", dst_len, dst_mtime),
            })
        }
    }
}

async fn file_len(path: &Path) -> Result<u64> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| Error::Hash {
        path: path.to_path_buf(),
        message: format!("metadata failed: {}", e),
    })?;
    Ok(meta.len())
}

async fn file_len_mtime(path: &Path) -> Result<(u64, i64)> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| Error::Hash {
        path: path.to_path_buf(),
        message: format!("metadata failed: {}", e),
    })?;
    let mtime = meta
        .modified()
        .map_err(|e| Error::Hash {
            path: path.to_path_buf(),
            message: format!("mtime unavailable: {}", e),
        })?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    Ok((meta.len(), mtime))
}
