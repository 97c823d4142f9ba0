use super::commands::Command;
use super::lock::MigrationLock;
use super::report::{MigrationReport, StepOutcome, StepReport};
use super::state::StateTracker;
use crate::chain::{ChainResolver, Direction, MigrationStep};
use crate::config::MigrationConfig;
use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use crate::revision::{Marker, RevisionStore};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Moves a database along the revision chain, one transaction per revision.
pub struct MigrationRunner<'a> {
    conn: &'a Connection,
    store: &'a RevisionStore,
    config: &'a MigrationConfig,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(conn: &'a Connection, store: &'a RevisionStore, config: &'a MigrationConfig) -> Self {
        MigrationRunner {
            conn,
            store,
            config,
        }
    }

    /// Applies pending forward operations up to `target`, or up to the head when `None`.
    ///
    /// Authoring defects, an unknown or lower target, lock contention and a default policy
    /// some step cannot honour fail before any step runs. A failing step is rolled back and halts the run; the returned report
    /// carries that failure and the marker of the last committed step.
    pub fn upgrade(&self, target: Option<&Marker>) -> SchemaResult<MigrationReport> {
        self.run(Direction::Forward, target)
    }

    /// Applies reverse operations down to `target`. See [`MigrationRunner::upgrade`].
    pub fn downgrade(&self, target: &Marker) -> SchemaResult<MigrationReport> {
        self.run(Direction::Reverse, Some(target))
    }

    fn run(&self, direction: Direction, target: Option<&Marker>) -> SchemaResult<MigrationReport> {
        let resolver = ChainResolver::new(self.store);
        let target = match target {
            Some(marker) => {
                resolver.linear_order()?;
                marker.clone()
            }
            None => resolver.head()?,
        };

        let _lock = MigrationLock::acquire(
            self.conn,
            self.config.lock_timeout(),
            self.config.lock_poll_interval(),
        )?;

        let current = StateTracker::current_marker(self.conn)?;
        let path = resolver.path_to(&current, &target)?;
        if path.iter().any(|step| step.direction != direction) {
            log::error!(
                "Cannot {} from {} to {}: target lies in the other direction",
                direction,
                current,
                target
            );
            return Err(SchemaError::new(
                &format!(
                    "Target {} is not reachable by {} from {}",
                    target, direction, current
                ),
                ErrorKind::Unreachable,
            ));
        }

        let policy = self.config.default_policy();
        for step in &path {
            step.operation().check_policy(policy)?;
        }

        let mut report = MigrationReport::new(direction, current.clone());
        if path.is_empty() {
            log::info!("Database is already at {}", current);
            return Ok(report);
        }

        log::info!(
            "Starting {} from {} to {} ({} step(s))",
            direction,
            current,
            target,
            path.len()
        );
        for step in &path {
            let description = step.operation().to_string();
            match self.apply(step) {
                Ok(outcome) => {
                    report.push(
                        StepReport {
                            revision_id: step.revision.id().to_string(),
                            description,
                            outcome,
                        },
                        step.target_marker(),
                    );
                }
                Err(e) => {
                    log::error!(
                        "Revision {} failed during {} and was rolled back: {}",
                        step.revision.id(),
                        direction,
                        e
                    );
                    let reason = e.message().to_string();
                    let error = SchemaError::new_with_cause(
                        &format!(
                            "Revision {} failed during {}; database left at {}",
                            step.revision.id(),
                            direction,
                            report.final_marker()
                        ),
                        ErrorKind::TransactionFailure,
                        e,
                    );
                    report.fail(
                        StepReport {
                            revision_id: step.revision.id().to_string(),
                            description,
                            outcome: StepOutcome::Failed { reason },
                        },
                        error,
                    );
                    break;
                }
            }
        }

        Ok(report)
    }

    /// Runs one step in its own transaction. Dropping `tx` on any early return rolls the
    /// step back, marker included.
    fn apply(&self, step: &MigrationStep) -> SchemaResult<StepOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        StateTracker::ensure(&tx)?;

        let operation = step.operation();
        let outcome = match operation.check(&tx) {
            Ok(()) => {
                operation.execute(&tx, self.config.default_policy())?;
                log::info!("Applied {}: {}", step.revision.id(), operation);
                StepOutcome::Applied
            }
            Err(e) if e.kind() == &ErrorKind::StructuralMismatch => {
                log::warn!(
                    "Skipping {} of {}: {}",
                    operation,
                    step.revision.id(),
                    e.message()
                );
                StepOutcome::Skipped {
                    reason: e.message().to_string(),
                }
            }
            Err(e) => return Err(e),
        };

        match step.direction {
            Direction::Forward => StateTracker::advance(&tx, &step.revision)?,
            Direction::Reverse => StateTracker::retreat(&tx, &step.revision)?,
        }
        StateTracker::record(&tx, step, &outcome)?;
        tx.commit()?;
        Ok(outcome)
    }
}
