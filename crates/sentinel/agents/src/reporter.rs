//! REPORT stage: compose the structured run report.

use async_trait::async_trait;
use sentinel_engine::{RunContext, StageError, StageHandler, StageOutcome};
use sentinel_types::{Report, ReportStatus, Stage};

#[derive(Default)]
pub struct ReporterAgent;

impl ReporterAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StageHandler for ReporterAgent {
    fn stage(&self) -> Stage {
        Stage::Report
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageOutcome, StageError> {
        let task = ctx.task();
        let triage = ctx.triage();
        let plan = ctx.plan().unwrap_or_default();
        let executed = ctx.executed_actions();
        let verification = ctx.verification();
        let evidence_count = ctx.evidence().len();

        let denied = ctx
            .approval()
            .map(|decision| !decision.is_approved())
            .unwrap_or(false);
        let verified_ok = verification.as_ref().map(|v| v.passed()).unwrap_or(true);

        let status = if denied {
            ReportStatus::PlanRejected
        } else if verified_ok && executed.len() == plan.actions.len() {
            ReportStatus::Success
        } else {
            ReportStatus::Partial
        };

        let classification = triage
            .as_ref()
            .map(|t| format!("{} {}", t.severity, t.category))
            .unwrap_or_else(|| "unclassified".into());
        let verification_note = match &verification {
            Some(v) if v.checks.is_empty() => "no verification checks ran".into(),
            Some(v) => format!(
                "{}/{} verification checks passed",
                v.checks.iter().filter(|c| c.passed).count(),
                v.checks.len()
            ),
            None => "verification stage did not run".into(),
        };
        let summary = format!(
            "{} incident for task {}: {}. {} evidence items; {} of {} planned actions executed; {}.",
            classification,
            task.task_id,
            task.goal,
            evidence_count,
            executed.len(),
            plan.actions.len(),
            verification_note
        );

        let mut recommendations = Vec::new();
        if denied {
            recommendations
                .push("plan was rejected; narrow its blast radius and resubmit".to_string());
        } else if !verified_ok {
            recommendations
                .push("verification did not confirm recovery; keep the incident open".to_string());
        } else if task.constraints.read_only && plan.actions.iter().any(|a| a.risk_level.is_write())
        {
            recommendations
                .push("write actions were withheld; re-run without read_only to apply".to_string());
        } else {
            recommendations.push("close the incident if symptoms stay recovered".to_string());
        }

        let mut report = Report {
            summary,
            hypotheses: plan.hypotheses,
            // Proposed actions stand in when nothing was executed, so a
            // rejected plan is still reviewable from the report.
            actions: if executed.is_empty() {
                plan.actions.clone()
            } else {
                executed.clone()
            },
            risks: plan.risks,
            rollback_plan: plan.rollback_plan,
            recommendations,
            status,
            metrics: Default::default(),
        };
        report
            .metrics
            .insert("evidence_count".into(), evidence_count as u64);
        report
            .metrics
            .insert("actions_planned".into(), plan.actions.len() as u64);
        report
            .metrics
            .insert("actions_executed".into(), executed.len() as u64);

        ctx.set_report(report);
        Ok(StageOutcome::new(format!("status={}", status)))
    }
}
