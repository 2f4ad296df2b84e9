//! Approval threshold policy.

use sentinel_types::{Plan, RiskLevel};
use serde::{Deserialize, Serialize};

/// Decides whether a plan must pass an approval gate before execution.
///
/// The threshold is configuration: the default requires approval for
/// RISKY_WRITE, a stricter deployment can lower it to SAFE_WRITE.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    /// Actions at or above this risk level require approval.
    pub approval_threshold: RiskLevel,
}

impl ApprovalPolicy {
    pub fn new(approval_threshold: RiskLevel) -> Self {
        Self { approval_threshold }
    }

    /// Strictest configuration: every action needs approval.
    pub fn strict() -> Self {
        Self::new(RiskLevel::ReadOnly)
    }

    /// True iff at least one action meets the configured threshold.
    pub fn requires_approval(&self, plan: &Plan) -> bool {
        plan.actions
            .iter()
            .any(|action| action.risk_level >= self.approval_threshold)
    }
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self::new(RiskLevel::RiskyWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_types::Action;

    fn plan_with_risks(risks: &[RiskLevel]) -> Plan {
        Plan {
            actions: risks
                .iter()
                .map(|risk| Action {
                    tool_name: "tool".into(),
                    arguments: serde_json::json!({}),
                    risk_level: *risk,
                    expected_effect: String::new(),
                })
                .collect(),
            ..Plan::default()
        }
    }

    #[test]
    fn test_default_threshold_is_risky_write() {
        let policy = ApprovalPolicy::default();
        assert!(!policy.requires_approval(&plan_with_risks(&[RiskLevel::ReadOnly])));
        assert!(!policy.requires_approval(&plan_with_risks(&[RiskLevel::SafeWrite])));
        assert!(policy.requires_approval(&plan_with_risks(&[
            RiskLevel::ReadOnly,
            RiskLevel::RiskyWrite
        ])));
    }

    #[test]
    fn test_stricter_threshold_catches_safe_writes() {
        let policy = ApprovalPolicy::new(RiskLevel::SafeWrite);
        assert!(policy.requires_approval(&plan_with_risks(&[RiskLevel::SafeWrite])));
        assert!(!policy.requires_approval(&plan_with_risks(&[RiskLevel::ReadOnly])));
    }

    #[test]
    fn test_empty_plan_needs_no_approval() {
        assert!(!ApprovalPolicy::strict().requires_approval(&Plan::default()));
    }
}
