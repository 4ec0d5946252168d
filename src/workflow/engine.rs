//! Step progression operations: save, reorder, finalize.
//!
//! These are the only mutations a workflow accepts. `save_step` is the
//! central business rule: completing a step promotes at most one other
//! step, chosen by array position at the moment of the call, so a
//! reorder between two saves changes which step is promoted next.

use thiserror::Error;
use tracing::debug;

use super::model::{StepMetadata, StepStatus, Workflow};

/// Rejected workflow mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("step index {index} out of range for {len} steps")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("workflow '{0}' has incomplete steps and cannot be finalized")]
    IncompleteSteps(String),
    #[error("workflow '{0}' is already finalized")]
    AlreadyFinished(String),
}

/// What a `save_step` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The step was completed; `advanced` holds the id of the successor
    /// promoted to IN_PROGRESS, if any.
    Saved { advanced: Option<String> },
    /// No step with that id exists; the workflow is unchanged.
    UnknownStep,
}

impl Workflow {
    /// Replace a step's metadata and mark it completed.
    ///
    /// Unknown ids are a true no-op: the step set is fixed at creation,
    /// so a missing id means the caller is working from a stale view,
    /// not that anything is wrong with this document. Saving an
    /// already-completed step is idempotent.
    ///
    /// Auto-advance: if the step immediately following the saved one in
    /// the *current* order is exactly PENDING, it becomes IN_PROGRESS.
    /// A successor that is already IN_PROGRESS or COMPLETED is left
    /// alone. No other step is touched.
    pub fn save_step(&mut self, step_id: &str, metadata: StepMetadata) -> SaveOutcome {
        let Some(position) = self.steps.iter().position(|s| s.id == step_id) else {
            debug!(step_id, workflow_id = %self.id, "save for unknown step ignored");
            return SaveOutcome::UnknownStep;
        };

        let step = &mut self.steps[position];
        step.metadata = metadata;
        step.status = StepStatus::Completed;

        let advanced = match self.steps.get_mut(position + 1) {
            Some(next) if next.status == StepStatus::Pending => {
                next.status = StepStatus::InProgress;
                Some(next.id.clone())
            }
            _ => None,
        };

        SaveOutcome::Saved { advanced }
    }

    /// Move the step at `from` to position `to`, shifting the steps in
    /// between by one (stable move).
    ///
    /// Identity, status, and metadata travel with the step unchanged;
    /// reordering never triggers auto-advance.
    pub fn reorder_step(&mut self, from: usize, to: usize) -> Result<(), EngineError> {
        let len = self.steps.len();
        for index in [from, to] {
            if index >= len {
                return Err(EngineError::IndexOutOfRange { index, len });
            }
        }
        if from != to {
            let step = self.steps.remove(from);
            self.steps.insert(to, step);
        }
        Ok(())
    }

    /// Confirm the booking.
    ///
    /// Purely local invariant check: rejected without any state change
    /// unless every step is COMPLETED and the workflow is not already
    /// finished. Once set, `finished` is terminal.
    pub fn finalize(&mut self) -> Result<(), EngineError> {
        if self.finished {
            return Err(EngineError::AlreadyFinished(self.id.clone()));
        }
        if !self.all_steps_completed() {
            return Err(EngineError::IncompleteSteps(self.id.clone()));
        }
        self.finished = true;
        Ok(())
    }
}
