//! Post-copy integrity verification for relocp
//!
//! Runs after the copy pass over every file recorded as copied or renamed,
//! comparing source against destination with the configured method:
//!
//! - `hash`: full content digest of both sides, retried a configured number
//!   of times to tolerate transient read errors on a flaky mount
//! - `size`: byte lengths only - cheaper, weaker
//! - `metadata`: size plus modification time
//!
//! The verifier never mutates or deletes files, and a discrepancy is never
//! fatal: COMPLETED means "migration ran to completion", not "zero defects".

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod hasher;
pub mod verifier;

pub use hasher::StreamingHasher;
pub use verifier::{FileCheck, IntegrityVerifier};
