//! Finalized run records.

use crate::evidence::Evidence;
use crate::ids::RunId;
use crate::plan::Plan;
use crate::report::Report;
use crate::task::Task;
use crate::trace::{Stage, TraceEvent};
use serde::{Deserialize, Serialize};

/// Why a run terminated in FAILED.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    BudgetExceeded { detail: String },
    Aborted,
    StageFailed { stage: Stage, detail: String },
    TraceWriteFailed { detail: String },
    InvariantViolation { detail: String },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::BudgetExceeded { detail } => write!(f, "BUDGET_EXCEEDED: {}", detail),
            FailureReason::Aborted => write!(f, "ABORTED"),
            FailureReason::StageFailed { stage, detail } => {
                write!(f, "STAGE_FAILED at {}: {}", stage, detail)
            }
            FailureReason::TraceWriteFailed { detail } => {
                write!(f, "TRACE_WRITE_FAILED: {}", detail)
            }
            FailureReason::InvariantViolation { detail } => {
                write!(f, "INVARIANT_VIOLATION: {}", detail)
            }
        }
    }
}

/// Terminal status of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunStatus {
    /// Reached the REPORT terminal state.
    Completed,
    /// Reached the FAILED terminal state.
    Failed { failure: FailureReason },
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

/// The full, immutable record of one run: the system's persisted ground
/// truth. Assembled exactly once at run completion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Episode {
    pub run_id: RunId,
    pub task: Task,
    /// Every trace event, in sequence order.
    pub events: Vec<TraceEvent>,
    pub evidence: Vec<Evidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    pub report: Report,
    pub status: RunStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}
