//! Sentinel Types - the shared data model
//!
//! Everything a run produces or consumes is defined here: the normalized
//! [`Task`], investigation [`Evidence`], the remediation [`Plan`], the ordered
//! [`TraceEvent`] record, and the finalized [`Episode`]. Downstream crates
//! add behavior; this crate owns the shapes and their orderings.

#![deny(unsafe_code)]

mod abort;
mod assessment;
mod episode;
mod evidence;
mod ids;
mod plan;
mod report;
mod risk;
mod task;
mod trace;

pub use abort::AbortHandle;
pub use assessment::{Severity, TriageAssessment, VerificationCheck, VerificationOutcome};
pub use episode::{Episode, FailureReason, RunStatus};
pub use evidence::Evidence;
pub use ids::{RunId, TaskId};
pub use plan::{Action, Hypothesis, Plan, RollbackStep};
pub use report::{Report, ReportStatus};
pub use risk::{PermissionLevel, RiskLevel};
pub use task::{BudgetLimits, Constraints, InvalidBudgetError, Task, TaskSource};
pub use trace::{EventType, Stage, TraceEvent};
