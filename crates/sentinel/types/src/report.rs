//! Final structured reports.

use crate::plan::{Action, Hypothesis, RollbackStep};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome classification of a completed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStatus {
    /// Plan executed (or nothing needed executing) and verification passed.
    Success,
    /// Some actions failed or verification did not confirm resolution.
    Partial,
    /// Approval was denied; the report summarizes the rejected plan.
    PlanRejected,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReportStatus::Success => "success",
            ReportStatus::Partial => "partial",
            ReportStatus::PlanRejected => "plan-rejected",
        };
        write!(f, "{}", s)
    }
}

/// Structured output of a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Report {
    pub summary: String,
    pub hypotheses: Vec<Hypothesis>,
    /// Actions taken, or proposed when execution was skipped.
    pub actions: Vec<Action>,
    pub risks: Vec<String>,
    #[serde(default)]
    pub rollback_plan: Vec<RollbackStep>,
    pub recommendations: Vec<String>,
    pub status: ReportStatus,
    /// Consumption counters at completion (tool calls, tokens, seconds).
    #[serde(default)]
    pub metrics: BTreeMap<String, u64>,
}

impl Report {
    /// Minimal report for runs that terminate before the REPORT stage.
    pub fn partial(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            hypotheses: Vec::new(),
            actions: Vec::new(),
            risks: Vec::new(),
            rollback_plan: Vec::new(),
            recommendations: Vec::new(),
            status: ReportStatus::Partial,
            metrics: BTreeMap::new(),
        }
    }
}
