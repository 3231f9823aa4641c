//! Atomic persistence for the migration state file

use crate::MigrationState;
use relocp_types::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Persists and loads the migration state at a fixed well-known path.
///
/// Writes are atomic with respect to concurrent readers: the record is
/// serialized to a temporary file in the same directory, synced, and renamed
/// over the target. A reader never observes a half-written file, so the
/// supervisor and diagnostic tools can read without any locking.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store for the given state file path
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state.
    ///
    /// Returns `Ok(None)` when no state file exists. Malformed content is
    /// logged and treated as no prior progress - risking a partial re-copy
    /// is cheaper than halting the whole migration.
    pub fn load(&self) -> Result<Option<MigrationState>> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::state(format!(
                    "failed to read state file {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_slice::<MigrationState>(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "state file is malformed, starting from a fresh record"
                );
                Ok(Some(MigrationState::default()))
            }
        }
    }

    /// Persist the state atomically.
    ///
    /// Every counter or phase mutation must be followed by a save before the
    /// unit of work is considered durable; a crash mid-copy then loses at
    /// most the in-flight file.
    pub fn save(&self, state: &MigrationState) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| Error::state("state file path has no parent directory"))?;
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::state(format!("failed to create {}: {}", dir.display(), e)))?;

        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| Error::state(format!("failed to serialize state: {}", e)))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::state(format!("failed to create temp file: {}", e)))?;
        tmp.write_all(&json)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| Error::state(format!("failed to write state: {}", e)))?;

        tmp.persist(&self.path).map_err(|e| {
            Error::state(format!(
                "failed to replace {}: {}",
                self.path.display(),
                e.error
            ))
        })?;

        debug!(path = %self.path.display(), phase = %state.phase, "state checkpointed");
        Ok(())
    }

    /// Remove the state file, e.g. when archiving after a successful run
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::state(format!(
                "failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
