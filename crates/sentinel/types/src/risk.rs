//! Risk and permission orderings.
//!
//! Both enums are totally ordered: comparison is how the registry decides
//! whether a caller may invoke a tool, and how the approval policy decides
//! whether a plan needs sign-off.

use serde::{Deserialize, Serialize};

/// Side-effect severity of a tool or planned action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Pure observation, no state change.
    ReadOnly,
    /// Reversible, low-blast-radius mutation.
    SafeWrite,
    /// Mutation that can disrupt service or lose data.
    RiskyWrite,
}

impl RiskLevel {
    /// True for anything that mutates state.
    pub fn is_write(&self) -> bool {
        !matches!(self, RiskLevel::ReadOnly)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::ReadOnly => "READ_ONLY",
            RiskLevel::SafeWrite => "SAFE_WRITE",
            RiskLevel::RiskyWrite => "RISKY_WRITE",
        };
        write!(f, "{}", s)
    }
}

/// Authority of a caller invoking tools through the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
    Guest,
    Operator,
    Admin,
}

impl PermissionLevel {
    /// Check that this caller meets a tool's requirement.
    pub fn satisfies(&self, required: PermissionLevel) -> bool {
        *self >= required
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PermissionLevel::Guest => "GUEST",
            PermissionLevel::Operator => "OPERATOR",
            PermissionLevel::Admin => "ADMIN",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_ordering() {
        assert!(RiskLevel::ReadOnly < RiskLevel::SafeWrite);
        assert!(RiskLevel::SafeWrite < RiskLevel::RiskyWrite);
        assert!(!RiskLevel::ReadOnly.is_write());
        assert!(RiskLevel::RiskyWrite.is_write());
    }

    #[test]
    fn test_permission_ordering() {
        assert!(PermissionLevel::Guest < PermissionLevel::Operator);
        assert!(PermissionLevel::Operator.satisfies(PermissionLevel::Guest));
        assert!(!PermissionLevel::Guest.satisfies(PermissionLevel::Admin));
        assert!(PermissionLevel::Admin.satisfies(PermissionLevel::Admin));
    }

    #[test]
    fn test_risk_serde_wire_names() {
        let json = serde_json::to_string(&RiskLevel::RiskyWrite).unwrap();
        assert_eq!(json, "\"RISKY_WRITE\"");
        let back: RiskLevel = serde_json::from_str("\"READ_ONLY\"").unwrap();
        assert_eq!(back, RiskLevel::ReadOnly);
    }
}
