//! Core data types for migration tracking

use std::fmt;

/// Coarse-grained stage of the migration state machine.
///
/// Phases only advance forward during a run. A supervisor-driven restart may
/// rewind to [`Phase::Copying`], the last safely-resumable phase, without
/// rewinding completed file entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No migration has been attempted yet
    NotStarted,
    /// Mounting the network or removable source
    Mounting,
    /// Walking the source tree and copying files
    Copying,
    /// Post-copy integrity verification
    Verifying,
    /// Migration ran to completion (possibly with recorded errors)
    Completed,
    /// Unrecoverable error, migration aborted
    Failed,
}

impl Phase {
    /// Check if this phase is terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check whether a forward transition to `next` is legal.
    ///
    /// `Failed` is reachable from any non-terminal phase. The resume rewind
    /// to `Copying` is handled separately by the state record and is not a
    /// forward transition.
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Failed {
            return true;
        }
        matches!(
            (self, next),
            (Self::NotStarted, Self::Mounting)
                | (Self::Mounting, Self::Copying)
                | (Self::Copying, Self::Verifying)
                | (Self::Verifying, Self::Completed)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not_started",
            Self::Mounting => "mounting",
            Self::Copying => "copying",
            Self::Verifying => "verifying",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A recorded per-file copy failure
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CopyErrorRecord {
    /// Source-relative path of the file that failed to copy
    pub path: String,
    /// Reason reported by the copier
    pub reason: String,
}

/// A recorded collision rename
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RenamedFile {
    /// Destination name the file would have had
    pub original_name: String,
    /// Name the file was actually copied under
    pub new_name: String,
}

/// A post-copy integrity mismatch between source and destination
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Discrepancy {
    /// Destination-relative path of the mismatched file
    pub path: String,
    /// Expected value (source digest, size, or metadata)
    pub expected: String,
    /// Actual value observed at the destination
    pub actual: String,
}

/// Integrity verification method
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyMethod {
    /// Full content digest of both sides - strongest guarantee
    Hash,
    /// Byte length comparison only - cheap, weak guarantee
    Size,
    /// Size plus modification time
    Metadata,
}

/// Digest algorithm used by the hasher collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// BLAKE3 - fast, the default
    Blake3,
    /// SHA-256
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3 => f.write_str("blake3"),
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

/// Outcome classification for a single file during the tree walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    /// Copy to the destination path verbatim
    Copy,
    /// Destination already identical, do not re-copy
    Skip,
    /// Name collision with different content, copy under a new name
    Rename {
        /// Disambiguated destination file name
        new_name: String,
    },
}
