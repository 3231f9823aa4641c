//! Migration engine for relocp
//!
//! Walks the source tree, decides per file whether to copy, skip, or copy
//! under a disambiguated name, checkpoints progress after every file, and
//! runs post-copy integrity verification. The engine is one-shot: a single
//! `run` drives the migration from whatever phase the persisted state left
//! off at through to a terminal phase.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod copier;
pub mod engine;
pub mod mount;
pub mod naming;
pub mod walker;

pub use copier::LocalCopier;
pub use engine::{EngineBuilder, MigrationEngine, RunOutcome};
pub use mount::LocalMounter;
pub use walker::{ExcludeFilter, FileEntry, TreeWalker};
