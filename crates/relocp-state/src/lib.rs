//! Crash-safe, resumable migration state for relocp
//!
//! This crate owns the single persisted record shared between the migration
//! engine and its supervisor:
//!
//! - **Record**: the [`MigrationState`] structure with phase transitions,
//!   per-file counters, and the completed-file set that makes restarts
//!   resumable
//! - **Store**: atomic write-then-rename persistence with corruption
//!   recovery - a malformed file is treated as "no prior progress", never as
//!   a hard failure
//! - **Heartbeat**: the timer-driven publisher that keeps the liveness stamp
//!   fresh during long single-file copies, and the read-only view the
//!   supervisor polls
//!
//! Concurrency discipline: the engine process is the single writer. All of
//! its mutations flow through one [`SharedState`] handle and are persisted
//! through one [`StateStore`]. Readers tolerate a stale-but-valid snapshot;
//! atomic replacement guarantees they never observe a torn file.

#![deny(missing_docs)]
#![warn(clippy::all)]

use std::sync::Arc;
use tokio::sync::RwLock;

pub mod heartbeat;
pub mod record;
pub mod store;

pub use heartbeat::{HeartbeatPublisher, HeartbeatView};
pub use record::MigrationState;
pub use store::StateStore;

/// Shared handle to the in-memory migration state.
///
/// The engine and the heartbeat publisher both hold one; writes are
/// serialized through the lock so checkpoint ordering is preserved.
pub type SharedState = Arc<RwLock<MigrationState>>;

/// Create a new shared handle around a state record
pub fn shared(state: MigrationState) -> SharedState {
    Arc::new(RwLock::new(state))
}
