//! Plan approval gate.

use async_trait::async_trait;
use sentinel_types::{Plan, Task};
use serde::{Deserialize, Serialize};

/// Outcome of consulting the approval gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approved { approver: String },
    Denied { approver: String, reason: String },
}

impl ApprovalDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, ApprovalDecision::Approved { .. })
    }
}

/// Decides whether a plan that crossed the risk threshold may execute.
///
/// The gate is only consulted when the approval policy marks the plan as
/// requiring approval; read-only plans never reach it.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn decide(&self, task: &Task, plan: &Plan) -> ApprovalDecision;
}

/// Fixed-answer gate for unattended deployments and tests.
pub struct AutoApprovalGate {
    approve: bool,
    reason: String,
}

impl AutoApprovalGate {
    pub fn approving() -> Self {
        Self {
            approve: true,
            reason: String::new(),
        }
    }

    pub fn denying(reason: impl Into<String>) -> Self {
        Self {
            approve: false,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ApprovalGate for AutoApprovalGate {
    async fn decide(&self, _task: &Task, _plan: &Plan) -> ApprovalDecision {
        if self.approve {
            ApprovalDecision::Approved {
                approver: "auto".into(),
            }
        } else {
            ApprovalDecision::Denied {
                approver: "auto".into(),
                reason: self.reason.clone(),
            }
        }
    }
}
