//! The supervisor's own persisted record

use chrono::{DateTime, Utc};
use relocp_types::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// What the supervisor knows about itself, persisted for the `status`
/// subcommand. Kept strictly separate from the engine's state file; the
/// supervisor never writes there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorRecord {
    /// Pid of the currently running engine child, if any
    pub child_pid: Option<u32>,
    /// Restarts consumed so far
    pub restart_count: u32,
    /// When the supervisor itself started
    pub supervisor_started_at: DateTime<Utc>,
    /// When this record was last written
    pub updated_at: DateTime<Utc>,
}

impl SupervisorRecord {
    /// Fresh record for a supervisor starting now
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            child_pid: None,
            restart_count: 0,
            supervisor_started_at: now,
            updated_at: now,
        }
    }

    /// Read the record from `path`; absent or unreadable is `None`
    pub fn load(path: &Path) -> Option<Self> {
        let data = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "supervisor record unreadable");
                None
            }
        }
    }

    /// Persist the record atomically
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = Utc::now();
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&parent).map_err(|e| {
            Error::supervision(format!(
                "cannot create {}: {}",
                parent.display(),
                e
            ))
        })?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::supervision(format!("record serialization failed: {}", e)))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| Error::supervision(format!("temp file failed: {}", e)))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| Error::supervision(format!("record write failed: {}", e)))?;
        tmp.persist(path)
            .map_err(|e| Error::supervision(format!("record rename failed: {}", e)))?;
        Ok(())
    }
}

impl Default for SupervisorRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("supervisor.json");

        let mut record = SupervisorRecord::new();
        record.child_pid = Some(1234);
        record.restart_count = 2;
        record.save(&path).unwrap();

        let loaded = SupervisorRecord::load(&path).unwrap();
        assert_eq!(loaded.child_pid, Some(1234));
        assert_eq!(loaded.restart_count, 2);
    }

    #[test]
    fn test_absent_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(SupervisorRecord::load(&dir.path().join("missing.json")).is_none());
    }

    #[test]
    fn test_garbage_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("supervisor.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(SupervisorRecord::load(&path).is_none());
    }
}
