//! Collaborator traits for migration operations
//!
//! The engine orchestrates external collaborators through these seams: a
//! copier moves one file, a hasher digests one file, a mounter makes the
//! source visible. Implementations live in the engine and verify crates;
//! tests substitute their own.

use crate::{HashAlgorithm, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Copies a single file from source to destination.
///
/// Returns the number of bytes copied. Failures carry the reason so the
/// engine can record them without unwinding the tree walk.
#[async_trait]
pub trait FileCopier: Send + Sync {
    /// Copy one file, creating parent directories as needed
    async fn copy(&self, source: &Path, destination: &Path) -> Result<u64>;
}

/// Computes a content digest for a file
#[async_trait]
pub trait Hasher: Send + Sync {
    /// Compute the hex digest of a file with the given algorithm
    async fn digest(&self, path: &Path, algorithm: HashAlgorithm) -> Result<String>;
}

/// Mounts and unmounts the migration source.
///
/// Real network/USB mount logic lives outside the core; the built-in
/// implementation only validates a pre-mounted local path.
#[async_trait]
pub trait Mounter: Send + Sync {
    /// Mount the source described by `spec`, returning the local path
    async fn mount(&self, spec: &str) -> Result<PathBuf>;

    /// Unmount a previously mounted source
    async fn unmount(&self, path: &Path) -> Result<()>;
}
