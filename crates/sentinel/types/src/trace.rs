//! Ordered trace records.
//!
//! One [`TraceEvent`] per state transition, policy decision, or tool call.
//! The wire format is one JSON object per line; sequence numbers are per-run
//! and gapless, so consumers can stream-parse and detect loss.

use crate::ids::RunId;
use serde::{Deserialize, Serialize};

/// Workflow stages. `Report` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Detect,
    Triage,
    Investigation,
    Plan,
    Approve,
    Execute,
    Verify,
    Report,
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Report | Stage::Failed)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Detect => "DETECT",
            Stage::Triage => "TRIAGE",
            Stage::Investigation => "INVESTIGATION",
            Stage::Plan => "PLAN",
            Stage::Approve => "APPROVE",
            Stage::Execute => "EXECUTE",
            Stage::Verify => "VERIFY",
            Stage::Report => "REPORT",
            Stage::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// Kind of trace record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    StageEnter,
    StageExit,
    ToolCall,
    ToolResult,
    /// Permission checks, approval outcomes, budget decisions. The
    /// payload summary starts with the decision kind, e.g.
    /// `permission_check granted tool=query_metrics`.
    PolicyDecision,
    Error,
}

/// One immutable, ordered record of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub run_id: RunId,
    /// Strictly increasing within a run, starting at 0, no gaps.
    pub sequence: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub stage: Stage,
    pub event_type: EventType,
    pub payload_summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = TraceEvent {
            run_id: RunId::new("r-1"),
            sequence: 3,
            timestamp: chrono::Utc::now(),
            stage: Stage::Investigation,
            event_type: EventType::ToolCall,
            payload_summary: "tool=query_metrics".into(),
        };
        let line = serde_json::to_string(&event).unwrap();
        assert!(line.contains("\"INVESTIGATION\""));
        assert!(line.contains("\"TOOL_CALL\""));
        assert!(line.contains("\"sequence\":3"));
    }

    #[test]
    fn test_terminal_stages() {
        assert!(Stage::Report.is_terminal());
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::Approve.is_terminal());
    }
}
