//! Engine error taxonomy.

use sentinel_policy::BudgetError;
use sentinel_registry::RegistryError;
use sentinel_trace::TraceError;
use sentinel_types::{InvalidBudgetError, TaskId};
use thiserror::Error;

/// Rejection before any run state exists. Once a run is admitted, failures
/// surface through the finalized Episode, never through this type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    InvalidBudget(#[from] InvalidBudgetError),
    #[error("task '{0}' already has an active run")]
    TaskAlreadyActive(TaskId),
}

/// Failure of one stage attempt, raised by stage handlers.
#[derive(Debug, Error)]
pub enum StageError {
    /// A governed tool invocation failed; see [`RegistryError`] for whether
    /// the failure is retryable.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A non-tool debit (model tokens) was rejected.
    #[error(transparent)]
    Budget(#[from] BudgetError),
    #[error(transparent)]
    Trace(#[from] TraceError),
    /// Transient dependency failure (model transport, flaky backend).
    /// Eligible for stage-level retry.
    #[error("transient stage failure: {detail}")]
    Transient { detail: String },
    /// The handler cannot make progress; retrying will not help.
    #[error("stage failed: {detail}")]
    Fatal { detail: String },
    /// Cooperative cancellation observed before a suspension point.
    #[error("run aborted")]
    Aborted,
}

impl StageError {
    pub fn is_retryable(&self) -> bool {
        match self {
            StageError::Registry(e) => e.is_retryable(),
            StageError::Transient { .. } => true,
            _ => false,
        }
    }

    /// True when the underlying failure already produced its own trace
    /// record on the invocation path. The engine does not record a second
    /// ERROR event for these.
    pub(crate) fn is_audited(&self) -> bool {
        matches!(self, StageError::Registry(_))
    }
}
