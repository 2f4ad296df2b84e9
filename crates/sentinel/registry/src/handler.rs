//! Tool implementation boundary.

use async_trait::async_trait;
use sentinel_types::RiskLevel;
use std::time::Duration;

/// The external tool implementation behind a [`ToolSpec`](crate::ToolSpec).
///
/// Implementations receive arguments that already passed schema validation.
/// Any error they return surfaces to the caller as
/// [`RegistryError::ToolExecution`](crate::RegistryError::ToolExecution),
/// which the engine's retry policy may retry.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: &serde_json::Value) -> anyhow::Result<serde_json::Value>;
}

/// Successful tool invocation result.
#[derive(Clone, Debug)]
pub struct ToolOutput {
    pub tool_name: String,
    pub risk_level: RiskLevel,
    pub data: serde_json::Value,
    pub duration: Duration,
}
