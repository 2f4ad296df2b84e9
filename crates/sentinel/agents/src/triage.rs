//! TRIAGE stage: first classification of the incident.

use crate::model::{extract_json, GenerateOptions, ModelClient};
use async_trait::async_trait;
use sentinel_engine::{RunContext, StageError, StageHandler, StageOutcome};
use sentinel_types::{Stage, TriageAssessment};
use std::sync::Arc;

pub struct TriageAgent {
    model: Arc<dyn ModelClient>,
    options: GenerateOptions,
}

impl TriageAgent {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self {
            model,
            options: GenerateOptions::default(),
        }
    }
}

#[async_trait]
impl StageHandler for TriageAgent {
    fn stage(&self) -> Stage {
        Stage::Triage
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageOutcome, StageError> {
        let task = ctx.task();
        let symptoms = serde_json::to_string(&task.symptoms).unwrap_or_default();
        let prompt = format!(
            "Triage the incident. Answer JSON with severity, category, reasoning.\n\
             Goal: {}\nSource: {}\nSymptoms: {}",
            task.goal, task.source, symptoms
        );

        let reply = self.model.generate(&prompt, &self.options).await?;
        ctx.debit_tokens(reply.tokens_used)?;

        // A reply that does not parse degrades to a conservative default
        // instead of failing the run.
        let assessment = extract_json(&reply.text)
            .and_then(|value| serde_json::from_value::<TriageAssessment>(value).ok())
            .unwrap_or_else(|| {
                tracing::warn!(task_id = %task.task_id, "triage reply did not parse");
                TriageAssessment::conservative("model reply did not parse; defaulting to medium")
            });

        let summary = format!(
            "severity={} category={}",
            assessment.severity, assessment.category
        );
        ctx.set_triage(assessment);
        Ok(StageOutcome::new(summary))
    }
}
