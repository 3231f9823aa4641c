//! Core type system and error handling for relocp
//!
//! This crate provides the foundational types shared across the relocp
//! workspace:
//!
//! - **Error handling**: a structured error taxonomy with severity levels,
//!   recoverability classification, and constructor helpers
//! - **Core types**: migration phases, per-file outcome records, verification
//!   methods and algorithms
//! - **Traits**: async collaborator seams for file copying, hashing, and
//!   source mounting
//!
//! # Examples
//!
//! ```rust
//! use relocp_types::{Phase, Result};
//!
//! fn advance(phase: Phase) -> Result<Phase> {
//!     assert!(Phase::Copying.can_transition_to(Phase::Verifying));
//!     Ok(Phase::Verifying)
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{Error, ErrorKind, ErrorSeverity};
pub use result::Result;
pub use traits::*;
pub use types::*;
