//! Remediation plans.

use crate::risk::RiskLevel;
use serde::{Deserialize, Serialize};

/// A ranked root-cause candidate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hypothesis {
    pub statement: String,
    /// Rank 0 is the most likely candidate.
    pub rank: u32,
}

/// One planned or executed step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Action {
    pub tool_name: String,
    pub arguments: serde_json::Value,
    /// Resolved from the tool's registered spec at plan time.
    pub risk_level: RiskLevel,
    pub expected_effect: String,
}

/// Reserved rollback provision; may be empty.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RollbackStep {
    pub description: String,
    pub tool_name: Option<String>,
}

/// Output of the planning stage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Plan {
    pub hypotheses: Vec<Hypothesis>,
    /// Ordered: actions execute in sequence.
    pub actions: Vec<Action>,
    pub risks: Vec<String>,
    #[serde(default)]
    pub rollback_plan: Vec<RollbackStep>,
    /// Set by the approval policy after planning; true iff at least one
    /// action meets the configured risk threshold.
    pub approval_required: bool,
}

impl Plan {
    /// Highest risk among planned actions, if any.
    pub fn max_risk(&self) -> Option<RiskLevel> {
        self.actions.iter().map(|a| a.risk_level).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_risk() {
        let mut plan = Plan::default();
        assert_eq!(plan.max_risk(), None);

        plan.actions.push(Action {
            tool_name: "query_metrics".into(),
            arguments: serde_json::json!({}),
            risk_level: RiskLevel::ReadOnly,
            expected_effect: String::new(),
        });
        plan.actions.push(Action {
            tool_name: "restart_service".into(),
            arguments: serde_json::json!({}),
            risk_level: RiskLevel::RiskyWrite,
            expected_effect: String::new(),
        });
        assert_eq!(plan.max_risk(), Some(RiskLevel::RiskyWrite));
    }
}
