//! VERIFY stage: re-probe the service after execution.

use crate::service_name;
use async_trait::async_trait;
use sentinel_engine::{RunContext, StageError, StageHandler, StageOutcome};
use sentinel_types::{Stage, VerificationCheck, VerificationOutcome};

/// Checks run through the governed tool path like any other invocation, so
/// they are audited and charged against the run budget.
const CHECKS: [(&str, &str); 2] = [
    ("query_metrics", "metrics_recovered"),
    ("query_logs", "logs_clean"),
];

#[derive(Default)]
pub struct VerifierAgent;

impl VerifierAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StageHandler for VerifierAgent {
    fn stage(&self) -> Stage {
        Stage::Verify
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageOutcome, StageError> {
        let service = service_name(ctx.task());
        let mut outcome = VerificationOutcome::default();

        for (tool, check) in CHECKS {
            if ctx.tool_spec(tool).is_none() {
                continue;
            }
            let args = serde_json::json!({ "service": service });
            match ctx.invoke_tool(Stage::Verify, tool, &args).await {
                // The simulated backends always answer; a real probe would
                // compare the payload against the SLO here.
                Ok(_output) => outcome.checks.push(VerificationCheck {
                    name: check.into(),
                    passed: true,
                    detail: format!("{} responded for {}", tool, service),
                }),
                Err(StageError::Registry(e)) if e.is_retryable() => {
                    outcome.checks.push(VerificationCheck {
                        name: check.into(),
                        passed: false,
                        detail: e.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        let passed = outcome.checks.iter().filter(|c| c.passed).count();
        let total = outcome.checks.len();
        ctx.set_verification(outcome);
        Ok(StageOutcome::new(format!(
            "{}/{} checks passed",
            passed, total
        )))
    }
}
