//! EXECUTE stage: carry out the approved plan in order.

use async_trait::async_trait;
use sentinel_engine::{RunContext, StageError, StageHandler, StageOutcome};
use sentinel_types::{Evidence, Stage};

#[derive(Default)]
pub struct ExecutorAgent;

impl ExecutorAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StageHandler for ExecutorAgent {
    fn stage(&self) -> Stage {
        Stage::Execute
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageOutcome, StageError> {
        let Some(plan) = ctx.plan() else {
            return Ok(StageOutcome::new("no plan; nothing to execute"));
        };
        let constraints = &ctx.task().constraints;
        let approval_required = plan.approval_required;
        let approved = ctx
            .approval()
            .map(|decision| decision.is_approved())
            .unwrap_or(false);

        let mut executed = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;
        for action in plan.actions {
            if action.risk_level.is_write() {
                if constraints.read_only {
                    tracing::info!(
                        tool = %action.tool_name,
                        risk = %action.risk_level,
                        "write action skipped under read_only constraint"
                    );
                    skipped += 1;
                    continue;
                }
                // The engine routes denied plans away from EXECUTE; this
                // check keeps the invariant local as well.
                let allowed = constraints.approval_override || !approval_required || approved;
                if !allowed {
                    tracing::warn!(tool = %action.tool_name, "unapproved write action skipped");
                    skipped += 1;
                    continue;
                }
            }

            match ctx
                .invoke_tool(Stage::Execute, &action.tool_name, &action.arguments)
                .await
            {
                Ok(output) => {
                    ctx.add_evidence(
                        Evidence::new(&action.tool_name, output.data, 0.9)
                            .with_notes("execution result"),
                    );
                    ctx.push_executed(action);
                    executed += 1;
                }
                // One failed action degrades the run to partial; the
                // remaining actions still get their chance.
                Err(StageError::Registry(e)) if e.is_retryable() => {
                    tracing::warn!(tool = %action.tool_name, error = %e, "action failed");
                    failed += 1;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(StageOutcome::new(format!(
            "executed={} skipped={} failed={}",
            executed, skipped, failed
        )))
    }
}
