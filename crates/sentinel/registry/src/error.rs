//! Registry error taxonomy.

use sentinel_policy::BudgetError;
use sentinel_trace::TraceError;
use sentinel_types::{PermissionLevel, RiskLevel};
use thiserror::Error;

/// Failures on the registration and invocation paths.
///
/// The three governance variants (`UnknownTool`, `SchemaValidation`,
/// `PermissionDenied`) are never retried. `ToolExecution` is the only
/// retryable variant. `Trace` means the audit record itself could not be
/// written, which is fatal to the run.
#[derive(Debug, Error)]
pub enum RegistryError {
    // ── Registration ─────────────────────────────────────────────────
    #[error("tool '{0}' already registered")]
    DuplicateTool(String),
    #[error("registry is sealed; late registration of '{0}' rejected")]
    RegistrySealed(String),
    #[error("tool '{tool}' has an invalid input schema: {detail}")]
    InvalidSchema { tool: String, detail: String },

    // ── Governance ───────────────────────────────────────────────────
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("arguments for '{tool}' failed schema validation: {detail}")]
    SchemaValidation { tool: String, detail: String },
    #[error("permission denied for '{tool}': requires {required}, caller has {caller}")]
    PermissionDenied {
        tool: String,
        required: PermissionLevel,
        caller: PermissionLevel,
    },

    // ── Resources ────────────────────────────────────────────────────
    #[error(transparent)]
    Budget(#[from] BudgetError),

    // ── Execution ────────────────────────────────────────────────────
    #[error("tool '{tool}' ({risk}) failed: {detail}")]
    ToolExecution {
        tool: String,
        risk: RiskLevel,
        detail: String,
    },

    // ── Observability ────────────────────────────────────────────────
    #[error(transparent)]
    Trace(#[from] TraceError),
}

impl RegistryError {
    /// Governance violations: audited, surfaced immediately, never retried.
    pub fn is_governance(&self) -> bool {
        matches!(
            self,
            RegistryError::UnknownTool(_)
                | RegistryError::SchemaValidation { .. }
                | RegistryError::PermissionDenied { .. }
        )
    }

    /// Only external tool failures are eligible for stage-level retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::ToolExecution { .. })
    }
}
