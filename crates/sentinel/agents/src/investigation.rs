//! INVESTIGATION stage: concurrent read-only evidence gathering.

use crate::model::{extract_json, GenerateOptions, ModelClient};
use crate::service_name;
use async_trait::async_trait;
use sentinel_engine::{RunContext, StageError, StageHandler, StageOutcome};
use sentinel_types::{Evidence, Stage};
use std::sync::Arc;

/// Well-known read-only diagnostic tools probed when registered. Probing is
/// restricted to this set so the agent never guesses arguments for tools
/// with unknown schemas.
const DIAGNOSTIC_TOOLS: [&str; 4] = [
    "query_metrics",
    "query_logs",
    "query_topology",
    "get_change_history",
];

pub struct InvestigationAgent {
    model: Arc<dyn ModelClient>,
    options: GenerateOptions,
}

impl InvestigationAgent {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self {
            model,
            options: GenerateOptions::default(),
        }
    }
}

#[async_trait]
impl StageHandler for InvestigationAgent {
    fn stage(&self) -> Stage {
        Stage::Investigation
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageOutcome, StageError> {
        let service = service_name(ctx.task());
        let probes: Vec<(&str, serde_json::Value)> = DIAGNOSTIC_TOOLS
            .iter()
            .filter(|name| ctx.tool_spec(name).is_some())
            .map(|name| (*name, serde_json::json!({ "service": service })))
            .collect();

        // Independent read-only probes run concurrently; each invocation is
        // atomic with respect to its audit records and budget debit.
        let results = futures::future::join_all(
            probes
                .iter()
                .map(|(name, args)| ctx.invoke_tool(Stage::Investigation, name, args)),
        )
        .await;

        let mut collected = 0usize;
        for ((name, _), result) in probes.iter().zip(results) {
            match result {
                Ok(output) => {
                    ctx.add_evidence(Evidence::new(*name, output.data, 0.8));
                    collected += 1;
                }
                // A single flaky probe loses one signal, not the stage.
                Err(StageError::Registry(e)) if e.is_retryable() => {
                    tracing::warn!(tool = name, error = %e, "diagnostic probe failed");
                }
                Err(err) => return Err(err),
            }
        }
        if collected == 0 && !probes.is_empty() {
            return Err(StageError::Transient {
                detail: "every diagnostic probe failed".into(),
            });
        }

        if collected > 0 {
            self.synthesize(ctx, &service, collected).await?;
        }
        Ok(StageOutcome::new(format!(
            "collected {} evidence items",
            collected
        )))
    }
}

impl InvestigationAgent {
    /// Best-effort model synthesis over the raw probe output. Failure to
    /// synthesize never fails the stage; the raw evidence stands alone.
    async fn synthesize(
        &self,
        ctx: &RunContext,
        service: &str,
        collected: usize,
    ) -> Result<(), StageError> {
        let prompt = format!(
            "Summarize the evidence. Answer JSON with a single summary field.\n\
             Service: {}\nEvidence items: {}",
            service, collected
        );
        match self.model.generate(&prompt, &self.options).await {
            Ok(reply) => {
                ctx.debit_tokens(reply.tokens_used)?;
                if let Some(summary) = extract_json(&reply.text)
                    .and_then(|v| v.get("summary").and_then(|s| s.as_str()).map(String::from))
                {
                    ctx.add_evidence(
                        Evidence::new("model", serde_json::json!({ "summary": summary }), 0.5)
                            .with_notes("model synthesis over raw probes"),
                    );
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "evidence synthesis skipped");
            }
        }
        Ok(())
    }
}
