//! PLAN stage: hypotheses and a remediation plan.

use crate::model::{extract_json, GenerateOptions, ModelClient};
use crate::service_name;
use async_trait::async_trait;
use sentinel_engine::{RunContext, StageError, StageHandler, StageOutcome};
use sentinel_types::{Action, Hypothesis, Plan, Stage};
use std::sync::Arc;

pub struct PlannerAgent {
    model: Arc<dyn ModelClient>,
    options: GenerateOptions,
}

impl PlannerAgent {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self {
            model,
            options: GenerateOptions::default(),
        }
    }

    /// Parse the model's plan. Risk levels are never taken from the model;
    /// they are resolved from the registered tool specs, and actions naming
    /// unregistered tools are dropped.
    fn parse_plan(&self, ctx: &RunContext, value: &serde_json::Value) -> Plan {
        let hypotheses: Vec<Hypothesis> = value
            .get("hypotheses")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        let risks: Vec<String> = value
            .get("risks")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let mut actions = Vec::new();
        for raw in value
            .get("actions")
            .and_then(|v| v.as_array())
            .unwrap_or(&Vec::new())
        {
            let Some(tool_name) = raw.get("tool_name").and_then(|v| v.as_str()) else {
                continue;
            };
            let Some(spec) = ctx.tool_spec(tool_name) else {
                tracing::warn!(tool = tool_name, "plan names an unregistered tool; dropped");
                continue;
            };
            actions.push(Action {
                tool_name: tool_name.to_string(),
                arguments: raw
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| serde_json::json!({})),
                risk_level: spec.risk_level,
                expected_effect: raw
                    .get("expected_effect")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        Plan {
            hypotheses,
            actions,
            risks,
            rollback_plan: Vec::new(),
            approval_required: false,
        }
    }
}

#[async_trait]
impl StageHandler for PlannerAgent {
    fn stage(&self) -> Stage {
        Stage::Plan
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageOutcome, StageError> {
        let task = ctx.task();
        let category = ctx
            .triage()
            .map(|t| t.category)
            .unwrap_or_else(|| "unknown".into());
        let prompt = format!(
            "Propose a remediation plan. Answer JSON with hypotheses, actions, risks.\n\
             Goal: {}\nCategory: {}\nService: {}\nEvidence items: {}\nAvailable tools: {}",
            task.goal,
            category,
            service_name(task),
            ctx.evidence().len(),
            ctx.available_tools().join(", ")
        );

        let reply = self.model.generate(&prompt, &self.options).await?;
        ctx.debit_tokens(reply.tokens_used)?;

        let plan = match extract_json(&reply.text) {
            Some(value) => self.parse_plan(ctx, &value),
            None => {
                tracing::warn!(task_id = %task.task_id, "plan reply did not parse");
                Plan {
                    hypotheses: vec![Hypothesis {
                        statement: "insufficient signal to localize a root cause".into(),
                        rank: 0,
                    }],
                    ..Plan::default()
                }
            }
        };

        let summary = format!(
            "planned {} actions max_risk={}",
            plan.actions.len(),
            plan.max_risk()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "none".into())
        );
        ctx.set_plan(plan);
        Ok(StageOutcome::new(summary))
    }
}
