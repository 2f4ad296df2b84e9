//! Normalized incident tasks and their resource budgets.

use crate::ids::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Where a task entered the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSource {
    Alert,
    Ticket,
    Chat,
    Cron,
}

impl std::fmt::Display for TaskSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskSource::Alert => "alert",
            TaskSource::Ticket => "ticket",
            TaskSource::Chat => "chat",
            TaskSource::Cron => "cron",
        };
        write!(f, "{}", s)
    }
}

/// Caller-imposed constraints on a run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Constraints {
    /// Forbid every write action regardless of approval.
    #[serde(default)]
    pub read_only: bool,
    /// Explicit policy override: execute write actions without an approval
    /// gate decision. Recorded in the trace when exercised.
    #[serde(default)]
    pub approval_override: bool,
}

/// Per-run resource ceilings.
///
/// Wall-time and token limits must be positive. A zero tool-call limit is
/// admitted: such a run fails its first budget gate with BUDGET_EXCEEDED
/// rather than being rejected at entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetLimits {
    pub max_tool_calls: u32,
    pub max_wall_time_secs: u64,
    pub max_tokens: u64,
}

impl BudgetLimits {
    /// Validate limits before a run is admitted.
    pub fn validate(&self) -> Result<(), InvalidBudgetError> {
        if self.max_wall_time_secs == 0 {
            return Err(InvalidBudgetError::ZeroLimit("max_wall_time_secs"));
        }
        if self.max_tokens == 0 {
            return Err(InvalidBudgetError::ZeroLimit("max_tokens"));
        }
        Ok(())
    }
}

impl Default for BudgetLimits {
    fn default() -> Self {
        Self {
            max_tool_calls: 50,
            max_wall_time_secs: 300,
            max_tokens: 100_000,
        }
    }
}

/// Malformed task budget, rejected before any run state exists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidBudgetError {
    #[error("budget limit '{0}' must be positive")]
    ZeroLimit(&'static str),
    #[error("task has no budget")]
    Missing,
}

/// A normalized incident-response request.
///
/// Immutable once a run starts: the orchestrator takes ownership and never
/// hands out mutable access.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub source: TaskSource,
    /// Free-form symptom keys (e.g. "latency_p99_ms") to observed values.
    #[serde(default)]
    pub symptoms: BTreeMap<String, serde_json::Value>,
    /// Topology, change history, SLO, ownership - opaque to the core.
    #[serde(default)]
    pub context: serde_json::Value,
    #[serde(default)]
    pub constraints: Constraints,
    pub goal: String,
    pub budget: BudgetLimits,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Task {
    pub fn new(task_id: TaskId, source: TaskSource, goal: impl Into<String>) -> Self {
        Self {
            task_id,
            source,
            symptoms: BTreeMap::new(),
            context: serde_json::Value::Null,
            constraints: Constraints::default(),
            goal: goal.into(),
            budget: BudgetLimits::default(),
            created_at: chrono::Utc::now(),
        }
    }
}
