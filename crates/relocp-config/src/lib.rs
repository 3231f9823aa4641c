//! Configuration management for relocp
//!
//! Supports YAML and TOML configuration files, layered loading
//! (defaults → file → environment variables), and validation at load time.
//! All options are explicit, typed fields; nothing is threaded through as a
//! free-form mapping.
//!
//! # Examples
//!
//! ```rust,no_run
//! use relocp_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_source_file("relocp.yaml")
//!     .add_env_prefix("RELOCP")
//!     .build()
//!     .expect("failed to load configuration");
//!
//! println!("source: {}", config.source.root.display());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

use relocp_types::{HashAlgorithm, VerifyMethod};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Main configuration structure for relocp
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Migration source configuration
    pub source: SourceConfig,
    /// Migration target configuration
    pub target: TargetConfig,
    /// Exclusion filters applied during the tree walk
    pub exclude: ExcludeConfig,
    /// Integrity verification configuration
    pub verification: VerificationConfig,
    /// Persisted state configuration
    pub state: StateConfig,
    /// Heartbeat publishing configuration
    pub heartbeat: HeartbeatConfig,
    /// Supervisor watchdog configuration
    pub supervisor: SupervisorConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Migration source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Root of the source tree once mounted
    pub root: PathBuf,
    /// Mount specification handed to the mounter collaborator
    pub mount_spec: String,
    /// How many times a failing mount is retried before giving up
    pub mount_retries: u32,
    /// Delay between mount attempts, in seconds
    pub mount_retry_delay_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/mnt/migration-source"),
            mount_spec: String::new(),
            mount_retries: 3,
            mount_retry_delay_secs: 10,
        }
    }
}

impl SourceConfig {
    /// Delay between mount attempts
    pub fn mount_retry_delay(&self) -> Duration {
        Duration::from_secs(self.mount_retry_delay_secs)
    }
}

/// Migration target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Root directory files are copied into
    pub root: PathBuf,
    /// Maximum destination basename length in bytes; longer names are
    /// truncated preserving the extension
    pub max_filename_bytes: usize,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/home"),
            max_filename_bytes: 255,
        }
    }
}

/// Exclusion filters applied before any file reaches the counters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeConfig {
    /// Directory names pruned from the walk (matched against each component)
    pub dirs: Vec<String>,
    /// Glob patterns matched against file names
    pub files: Vec<String>,
    /// Skip dot-files entirely
    pub hidden_files: bool,
}

impl Default for ExcludeConfig {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            files: Vec::new(),
            hidden_files: true,
        }
    }
}

/// Integrity verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Comparison method used by the verifier
    pub method: VerifyMethod,
    /// Digest algorithm for the `hash` method
    pub algorithm: HashAlgorithm,
    /// Hash mismatches are retried this many times before a discrepancy is
    /// declared, tolerating transient read errors on a flaky mount
    pub hash_retries: u32,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            method: VerifyMethod::Hash,
            algorithm: HashAlgorithm::Blake3,
            hash_retries: 2,
        }
    }
}

/// Persisted state configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Well-known path of the shared state file
    pub file: PathBuf,
    /// Path of the supervisor's own bookkeeping file
    pub supervisor_file: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("/var/lib/relocp/state.json"),
            supervisor_file: PathBuf::from("/var/lib/relocp/supervisor.json"),
        }
    }
}

/// Heartbeat publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Interval between timer-driven heartbeat stamps, in seconds.
    /// Checkpoint saves also stamp the heartbeat; the timer only matters
    /// during long single-file copies.
    pub interval_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl HeartbeatConfig {
    /// Interval between timer-driven heartbeat stamps
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Supervisor watchdog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Seconds between heartbeat checks
    pub check_interval_secs: u64,
    /// Heartbeat older than this many seconds classifies the engine as hung
    pub heartbeat_timeout_secs: u64,
    /// Grace window after engine start before a missing heartbeat counts as
    /// a hang
    pub startup_grace_secs: u64,
    /// Maximum number of engine restarts before terminal failure
    pub max_restarts: u32,
    /// Delay between restart attempts, in seconds
    pub restart_delay_secs: u64,
    /// A run stable for this long resets the restart counter
    pub stable_reset_secs: u64,
    /// How long a graceful termination may take before a forced kill
    pub kill_grace_secs: u64,
    /// Log file the engine subprocess writes to
    pub engine_log: PathBuf,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 30,
            heartbeat_timeout_secs: 120,
            startup_grace_secs: 120,
            max_restarts: 3,
            restart_delay_secs: 60,
            stable_reset_secs: 600,
            kill_grace_secs: 30,
            engine_log: PathBuf::from("/var/log/relocp/engine.log"),
        }
    }
}

impl SupervisorConfig {
    /// Interval between heartbeat checks
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Heartbeat staleness threshold
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// Grace window after engine start
    pub fn startup_grace(&self) -> Duration {
        Duration::from_secs(self.startup_grace_secs)
    }

    /// Delay between restart attempts
    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }

    /// Stability window that resets the restart counter
    pub fn stable_reset(&self) -> Duration {
        Duration::from_secs(self.stable_reset_secs)
    }

    /// Graceful termination window before a forced kill
    pub fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.kill_grace_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON-formatted log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
