//! Tool specifications.

use sentinel_types::{PermissionLevel, RiskLevel};
use serde::{Deserialize, Serialize};

/// A registered capability descriptor.
///
/// Registered once at startup; immutable thereafter. The registry owns the
/// name-to-spec mapping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique key within the registry.
    pub name: String,
    pub description: String,
    /// JSON schema (draft-07) the arguments must satisfy.
    pub input_schema: serde_json::Value,
    pub risk_level: RiskLevel,
    pub required_permission: PermissionLevel,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
        risk_level: RiskLevel,
        required_permission: PermissionLevel,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            risk_level,
            required_permission,
        }
    }
}
