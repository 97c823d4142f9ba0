//! Execution of revisions against a live database.
//!
//! A run resolves its path with the [`ChainResolver`](crate::chain::ChainResolver), takes the
//! [`MigrationLock`], then gives every step its own immediate transaction in which the
//! structural precondition is checked, the operation executed, and the marker plus history
//! row written. A false precondition is a recoverable skip; any other error rolls the step
//! back and halts the run.

mod commands;
mod lock;
mod report;
mod runner;
mod state;

pub use lock::MigrationLock;
pub use report::{MigrationReport, StepOutcome, StepReport};
pub use runner::MigrationRunner;
pub use state::{HistoryEntry, StateTracker};
