//! Supervisor watchdog for the migration engine
//!
//! Launches `relocp run` as a subprocess and watches its heartbeat through
//! the shared state file. A stale heartbeat gets the engine a SIGTERM, a
//! grace period, then a SIGKILL; the restart budget bounds how many times a
//! misbehaving engine is relaunched before supervision fails for good. The
//! supervisor only ever reads the engine's state file; its own bookkeeping
//! lives in a separate file.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod bookkeeping;
pub mod budget;
pub mod supervisor;

pub use bookkeeping::SupervisorRecord;
pub use budget::RestartBudget;
pub use supervisor::{SuperviseOutcome, Supervisor};
