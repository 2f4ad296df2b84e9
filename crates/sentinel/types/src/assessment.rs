//! Intermediate stage outputs carried between stages.

use serde::{Deserialize, Serialize};

/// Incident severity as judged during triage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

/// Output of the triage stage: a first classification of the incident.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriageAssessment {
    pub severity: Severity,
    /// Coarse incident category, e.g. "latency", "errors", "capacity".
    pub category: String,
    pub reasoning: String,
}

impl TriageAssessment {
    /// Conservative default used when classification cannot be derived.
    pub fn conservative(reasoning: impl Into<String>) -> Self {
        Self {
            severity: Severity::Medium,
            category: "unknown".into(),
            reasoning: reasoning.into(),
        }
    }
}

/// One post-execution verification probe.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Output of the verify stage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub checks: Vec<VerificationCheck>,
}

impl VerificationOutcome {
    /// True iff every check passed. An empty outcome counts as passed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_verification_passed() {
        let mut outcome = VerificationOutcome::default();
        assert!(outcome.passed());
        outcome.checks.push(VerificationCheck {
            name: "latency_recovered".into(),
            passed: true,
            detail: String::new(),
        });
        assert!(outcome.passed());
        outcome.checks.push(VerificationCheck {
            name: "error_rate_recovered".into(),
            passed: false,
            detail: "still elevated".into(),
        });
        assert!(!outcome.passed());
    }
}
