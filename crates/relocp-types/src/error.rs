//! Error types and handling for relocp
//!
//! The taxonomy follows the migration failure model: fatal process-level
//! errors (mount exhaustion, unreadable source), recoverable per-file errors
//! (a single copy or hash read failing), and observational conditions
//! (integrity discrepancies) that are recorded but never raised as errors.

use std::path::PathBuf;

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// Low severity - operation can continue
    Low,
    /// Medium severity - operation should be retried
    Medium,
    /// High severity - operation should be aborted
    High,
    /// Critical severity - entire process should be terminated
    Critical,
}

/// Main error type for relocp operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found
        path: PathBuf,
    },

    /// Permission denied
    #[error("Permission denied: {path}")]
    PermissionDenied {
        /// Path to the file with permission issues
        path: PathBuf,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Mounting the migration source failed
    #[error("Mount error: {message}")]
    Mount {
        /// Error message describing the mount failure
        message: String,
    },

    /// Source tree enumeration failed
    #[error("Enumeration error: {message}")]
    Enumeration {
        /// Error message describing the enumeration failure
        message: String,
    },

    /// Persisted state could not be written
    #[error("State error: {message}")]
    State {
        /// Error message describing the state persistence failure
        message: String,
    },

    /// A single file copy failed
    #[error("Copy failed for {path}: {reason}")]
    Copy {
        /// Source path of the file that failed to copy
        path: PathBuf,
        /// Reason reported by the copier
        reason: String,
    },

    /// Digest computation failed
    #[error("Hash error for {path}: {message}")]
    Hash {
        /// Path of the file that could not be hashed
        path: PathBuf,
        /// Error message from the hasher
        message: String,
    },

    /// Supervision failed (restart budget exhausted, spawn failure)
    #[error("Supervision error: {message}")]
    Supervision {
        /// Error message describing the supervision failure
        message: String,
    },

    /// Operation cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O related errors
    Io,
    /// Configuration errors
    Config,
    /// Mount errors
    Mount,
    /// Enumeration errors
    Enumeration,
    /// State persistence errors
    State,
    /// Per-file copy errors
    Copy,
    /// Hashing errors
    Hash,
    /// Supervision errors
    Supervision,
    /// Cancellation
    Cancelled,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::FileNotFound { .. } | Self::PermissionDenied { .. } => ErrorKind::Io,
            Self::Config { .. } => ErrorKind::Config,
            Self::Mount { .. } => ErrorKind::Mount,
            Self::Enumeration { .. } => ErrorKind::Enumeration,
            Self::State { .. } => ErrorKind::State,
            Self::Copy { .. } => ErrorKind::Copy,
            Self::Hash { .. } => ErrorKind::Hash,
            Self::Supervision { .. } => ErrorKind::Supervision,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Io { .. } => ErrorSeverity::Medium,
            Self::FileNotFound { .. } | Self::PermissionDenied { .. } => ErrorSeverity::Medium,
            Self::Config { .. } => ErrorSeverity::High,
            Self::Mount { .. } => ErrorSeverity::High,
            Self::Enumeration { .. } => ErrorSeverity::Critical,
            Self::State { .. } => ErrorSeverity::Medium,
            Self::Copy { .. } => ErrorSeverity::Low,
            Self::Hash { .. } => ErrorSeverity::Low,
            Self::Supervision { .. } => ErrorSeverity::High,
            Self::Cancelled => ErrorSeverity::Low,
            Self::Other { .. } => ErrorSeverity::Medium,
        }
    }

    /// Check whether the migration can continue past this error.
    ///
    /// Per-file failures are recoverable: they are recorded in the state and
    /// the tree walk continues. Fatal errors unwind to process exit.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Copy { .. } | Self::Hash { .. } => true,
            Self::Io { .. } | Self::FileNotFound { .. } | Self::PermissionDenied { .. } => true,
            Self::State { .. } => true,
            Self::Config { .. }
            | Self::Mount { .. }
            | Self::Enumeration { .. }
            | Self::Supervision { .. }
            | Self::Cancelled => false,
            Self::Other { .. } => false,
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new mount error
    pub fn mount<S: Into<String>>(message: S) -> Self {
        Self::Mount {
            message: message.into(),
        }
    }

    /// Create a new enumeration error
    pub fn enumeration<S: Into<String>>(message: S) -> Self {
        Self::Enumeration {
            message: message.into(),
        }
    }

    /// Create a new state persistence error
    pub fn state<S: Into<String>>(message: S) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a new per-file copy error
    pub fn copy<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::Copy {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new supervision error
    pub fn supervision<S: Into<String>>(message: S) -> Self {
        Self::Supervision {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_recoverable_errors_never_critical(message in ".*") {
            let errors = vec![
                Error::Io { message: message.clone() },
                Error::Config { message: message.clone() },
                Error::Mount { message: message.clone() },
                Error::State { message: message.clone() },
                Error::Other { message: message.clone() },
            ];

            for error in errors {
                if error.is_recoverable() {
                    prop_assert!(error.severity() < ErrorSeverity::Critical);
                }
            }
        }

        #[test]
        fn test_copy_error_is_per_file(path in "[a-z/]{1,40}", reason in ".*") {
            let error = Error::copy(PathBuf::from(path), reason);
            prop_assert_eq!(error.kind(), ErrorKind::Copy);
            prop_assert_eq!(error.severity(), ErrorSeverity::Low);
            prop_assert!(error.is_recoverable());
        }
    }

    #[test]
    fn test_error_severity_ordering() {
        assert!(ErrorSeverity::Low < ErrorSeverity::Medium);
        assert!(ErrorSeverity::Medium < ErrorSeverity::High);
        assert!(ErrorSeverity::High < ErrorSeverity::Critical);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "test file");
        let error = Error::from(io_error);

        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(error.to_string().contains("test file"));
    }

    #[test]
    fn test_enumeration_error_is_fatal() {
        let error = Error::enumeration("source unreadable");

        assert_eq!(error.kind(), ErrorKind::Enumeration);
        assert_eq!(error.severity(), ErrorSeverity::Critical);
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_mount_error_is_fatal() {
        let error = Error::mount("retries exhausted");

        assert_eq!(error.kind(), ErrorKind::Mount);
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_cancelled_error() {
        let error = Error::Cancelled;

        assert_eq!(error.kind(), ErrorKind::Cancelled);
        assert!(!error.is_recoverable());
    }
}
