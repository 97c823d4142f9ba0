use crate::chain::Direction;
use crate::errors::{SchemaError, SchemaResult};
use crate::revision::Marker;
use std::fmt::{Display, Formatter};

/// What happened to one step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The operation ran and the marker moved.
    Applied,
    /// The structural precondition did not hold; the DDL was skipped but the marker moved.
    Skipped { reason: String },
    /// The step was rolled back and the run halted.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub revision_id: String,
    pub description: String,
    pub outcome: StepOutcome,
}

impl Display for StepReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            StepOutcome::Applied => write!(f, "applied {}: {}", self.revision_id, self.description),
            StepOutcome::Skipped { reason } => {
                write!(f, "skipped {}: {} ({})", self.revision_id, self.description, reason)
            }
            StepOutcome::Failed { reason } => {
                write!(f, "failed  {}: {} ({})", self.revision_id, self.description, reason)
            }
        }
    }
}

/// Progress of one upgrade or downgrade run.
///
/// A run that halts on a failing step still produces a report; check
/// [`MigrationReport::failure`] or convert with [`MigrationReport::into_result`].
#[derive(Debug, Clone)]
pub struct MigrationReport {
    direction: Direction,
    start_marker: Marker,
    final_marker: Marker,
    steps: Vec<StepReport>,
    failure: Option<SchemaError>,
}

impl MigrationReport {
    pub(crate) fn new(direction: Direction, start_marker: Marker) -> Self {
        MigrationReport {
            direction,
            final_marker: start_marker.clone(),
            start_marker,
            steps: Vec::new(),
            failure: None,
        }
    }

    pub(crate) fn push(&mut self, step: StepReport, marker: Marker) {
        self.steps.push(step);
        self.final_marker = marker;
    }

    pub(crate) fn fail(&mut self, step: StepReport, error: SchemaError) {
        self.steps.push(step);
        self.failure = Some(error);
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn start_marker(&self) -> &Marker {
        &self.start_marker
    }

    /// Marker after the last committed step.
    pub fn final_marker(&self) -> &Marker {
        &self.final_marker
    }

    pub fn steps(&self) -> &[StepReport] {
        &self.steps
    }

    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Applied))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Skipped { .. }))
    }

    pub fn failure(&self) -> Option<&SchemaError> {
        self.failure.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Turns a halted run into its error.
    pub fn into_result(self) -> SchemaResult<MigrationReport> {
        match self.failure {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }

    fn count(&self, predicate: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|s| predicate(&s.outcome)).count()
    }
}

impl Display for MigrationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for step in &self.steps {
            writeln!(f, "{}", step)?;
        }
        if self.steps.is_empty() {
            writeln!(f, "nothing to {}", self.direction)?;
        }
        write!(
            f,
            "{} {} -> {}: {} applied, {} skipped{}",
            self.direction,
            self.start_marker,
            self.final_marker,
            self.applied(),
            self.skipped(),
            if self.is_success() { "" } else { ", halted" }
        )
    }
}
