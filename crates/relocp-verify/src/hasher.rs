//! Streaming file hasher collaborator

use async_trait::async_trait;
use relocp_types::{Error, HashAlgorithm, Hasher, Result};
use sha2::Digest;
use std::path::Path;
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 64 * 1024;

/// Chunked-read file hasher supporting BLAKE3 and SHA-256.
///
/// Reads in fixed-size chunks so arbitrarily large files never land in
/// memory whole.
#[derive(Debug, Default, Clone)]
pub struct StreamingHasher;

impl StreamingHasher {
    /// Create a new hasher
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Hasher for StreamingHasher {
    async fn digest(&self, path: &Path, algorithm: HashAlgorithm) -> Result<String> {
        let mut file = tokio::fs::File::open(path).await.map_err(|e| Error::Hash {
            path: path.to_path_buf(),
            message: format!("open failed: {}", e),
        })?;

        let mut buf = vec![0u8; CHUNK_SIZE];
        match algorithm {
            HashAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                loop {
                    let n = file.read(&mut buf).await.map_err(|e| Error::Hash {
                        path: path.to_path_buf(),
                        message: format!("read failed: {}", e),
                    })?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }
                Ok(hasher.finalize().to_hex().to_string())
            }
            HashAlgorithm::Sha256 => {
                let mut hasher = sha2::Sha256::new();
                loop {
                    let n = file.read(&mut buf).await.map_err(|e| Error::Hash {
                        path: path.to_path_buf(),
                        message: format!("read failed: {}", e),
                    })?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }
                Ok(hex::encode(hasher.finalize()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_blake3_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let hasher = StreamingHasher::new();
        let digest = hasher.digest(&path, HashAlgorithm::Blake3).await.unwrap();

        assert_eq!(digest, blake3::hash(b"hello world").to_hex().to_string());
    }

    #[tokio::test]
    async fn test_sha256_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let hasher = StreamingHasher::new();
        let digest = hasher.digest(&path, HashAlgorithm::Sha256).await.unwrap();

        // Well-known SHA-256 of "hello world"
        assert_eq!(
            digest,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn test_identical_files_identical_digests() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        let content = vec![7u8; 200_000]; // spans multiple chunks
        tokio::fs::write(&a, &content).await.unwrap();
        tokio::fs::write(&b, &content).await.unwrap();

        let hasher = StreamingHasher::new();
        let da = hasher.digest(&a, HashAlgorithm::Blake3).await.unwrap();
        let db = hasher.digest(&b, HashAlgorithm::Blake3).await.unwrap();
        assert_eq!(da, db);
    }

    #[tokio::test]
    async fn test_missing_file_is_hash_error() {
        let hasher = StreamingHasher::new();
        let result = hasher
            .digest(Path::new("/nonexistent/file"), HashAlgorithm::Blake3)
            .await;
        assert!(matches!(result, Err(Error::Hash { .. })));
    }
}
