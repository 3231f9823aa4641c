//! The persisted migration progress record

use chrono::{DateTime, Utc};
use relocp_types::{CopyErrorRecord, Discrepancy, Error, Phase, RenamedFile, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The single persisted record of migration progress.
///
/// Created at first run, mutated throughout by the engine, read by the
/// supervisor, and handed to the reporter at a terminal phase. Counters are
/// monotonic non-decreasing within a pass; a restart-triggered resume
/// recounts the pass while preserving the completed-file map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationState {
    /// Current phase of the migration state machine
    pub phase: Phase,
    /// When the migration first started
    pub started_at: Option<DateTime<Utc>>,
    /// When the migration reached a terminal phase
    pub finished_at: Option<DateTime<Utc>>,
    /// Liveness stamp, refreshed on every checkpoint and by the heartbeat timer
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    /// Total files discovered by enumeration (0 until enumeration completes)
    pub total_files: u64,
    /// Files copied verbatim this pass
    pub files_copied: u64,
    /// Files copied under a disambiguated name this pass
    pub files_renamed: u64,
    /// Files skipped this pass (already present and identical, or excluded)
    pub files_skipped: u64,
    /// Files whose copy failed this pass
    pub copy_errors_count: u64,
    /// Files that passed integrity verification
    pub files_verified: u64,
    /// Ordered per-file copy failures
    pub copy_errors: Vec<CopyErrorRecord>,
    /// Ordered collision renames
    pub renamed_files: Vec<RenamedFile>,
    /// Source-relative paths skipped this pass
    pub skipped_files: BTreeSet<String>,
    /// Source-relative path -> destination-relative path for every file
    /// copied or renamed, across all passes. Membership here is checked
    /// before re-copy, which is what makes a restart resumable.
    pub completed_files: BTreeMap<String, String>,
    /// Ordered integrity mismatches recorded by the verifier
    pub discrepancies: Vec<Discrepancy>,
    /// Total bytes discovered by enumeration
    pub total_size_bytes: u64,
    /// Bytes copied this pass
    pub copied_size_bytes: u64,
    /// Incremented on every resume, for diagnostics
    pub restart_generation: u32,
}

impl Default for MigrationState {
    fn default() -> Self {
        Self {
            phase: Phase::NotStarted,
            started_at: None,
            finished_at: None,
            last_heartbeat_at: None,
            total_files: 0,
            files_copied: 0,
            files_renamed: 0,
            files_skipped: 0,
            copy_errors_count: 0,
            files_verified: 0,
            copy_errors: Vec::new(),
            renamed_files: Vec::new(),
            skipped_files: BTreeSet::new(),
            completed_files: BTreeMap::new(),
            discrepancies: Vec::new(),
            total_size_bytes: 0,
            copied_size_bytes: 0,
            restart_generation: 0,
        }
    }
}

impl MigrationState {
    /// Create a fresh record for a migration starting now
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            last_heartbeat_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Advance the phase, enforcing forward-only transitions
    pub fn advance(&mut self, next: Phase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(Error::state(format!(
                "illegal phase transition {} -> {}",
                self.phase, next
            )));
        }
        tracing::debug!("phase {} -> {}", self.phase, next);
        self.phase = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Rewind to the last safely-resumable phase after a restart.
    ///
    /// Per-pass counters and lists are recounted from zero; the completed
    /// map, the rename history, and the original start time survive, so no
    /// already-copied file is copied again.
    pub fn reset_for_resume(&mut self) {
        self.phase = Phase::Copying;
        self.finished_at = None;
        self.files_copied = 0;
        self.files_renamed = 0;
        self.files_skipped = 0;
        self.copy_errors_count = 0;
        self.files_verified = 0;
        self.copy_errors.clear();
        self.skipped_files.clear();
        self.discrepancies.clear();
        self.copied_size_bytes = 0;
        self.restart_generation += 1;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        tracing::info!(
            generation = self.restart_generation,
            completed = self.completed_files.len(),
            "resuming copy pass"
        );
    }

    /// Refresh the liveness stamp
    pub fn touch_heartbeat(&mut self) {
        self.last_heartbeat_at = Some(Utc::now());
    }

    /// Record a verbatim copy
    pub fn record_copied(&mut self, source_rel: &str, dest_rel: &str, bytes: u64) {
        self.files_copied += 1;
        self.copied_size_bytes += bytes;
        self.completed_files
            .insert(source_rel.to_string(), dest_rel.to_string());
    }

    /// Record a collision rename.
    ///
    /// A rename entry is only appended once per original name, so a resumed
    /// pass does not duplicate history.
    pub fn record_renamed(&mut self, source_rel: &str, original_name: &str, new_name: &str, bytes: u64) {
        self.files_renamed += 1;
        self.copied_size_bytes += bytes;
        self.completed_files
            .insert(source_rel.to_string(), new_name.to_string());
        if !self
            .renamed_files
            .iter()
            .any(|r| r.original_name == original_name)
        {
            self.renamed_files.push(RenamedFile {
                original_name: original_name.to_string(),
                new_name: new_name.to_string(),
            });
        }
    }

    /// Record a skipped file
    pub fn record_skipped(&mut self, source_rel: &str) {
        if self.skipped_files.insert(source_rel.to_string()) {
            self.files_skipped += 1;
        }
    }

    /// Record a per-file copy failure
    pub fn record_copy_error(&mut self, path: &str, reason: &str) {
        self.copy_errors_count += 1;
        self.copy_errors.push(CopyErrorRecord {
            path: path.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Record an integrity mismatch
    pub fn record_discrepancy(&mut self, path: &str, expected: &str, actual: &str) {
        self.discrepancies.push(Discrepancy {
            path: path.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }

    /// Sum of all per-file outcomes this pass
    pub fn counted_files(&self) -> u64 {
        self.files_copied + self.files_renamed + self.files_skipped + self.copy_errors_count
    }

    /// The counter invariant: once enumeration is complete, counted outcomes
    /// never exceed the total
    pub fn counters_consistent(&self) -> bool {
        self.total_files == 0 || self.counted_files() <= self.total_files
    }

    /// Overall progress in percent, by file count
    pub fn progress_percent(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.counted_files() as f64 / self.total_files as f64) * 100.0
        }
    }
}
