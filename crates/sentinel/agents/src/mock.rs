//! Deterministic mock model.
//!
//! Pattern-matches the prompt and answers canned JSON, so the full pipeline
//! runs end to end with reproducible output and zero external calls. Tests
//! and the demo CLI use it as the default model.

use crate::model::{GenerateOptions, ModelClient, ModelError, ModelReply};
use async_trait::async_trait;

pub struct MockModel {
    /// Caller-supplied overrides, checked before the built-in patterns.
    rules: Vec<(String, serde_json::Value)>,
}

impl MockModel {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Answer `response` whenever the prompt contains `marker`.
    pub fn with_rule(mut self, marker: impl Into<String>, response: serde_json::Value) -> Self {
        self.rules.push((marker.into(), response));
        self
    }

    fn answer(&self, prompt: &str) -> serde_json::Value {
        for (marker, response) in &self.rules {
            if prompt.contains(marker) {
                return response.clone();
            }
        }
        if prompt.contains("Triage the incident") {
            return triage_answer(prompt);
        }
        if prompt.contains("Summarize the evidence") {
            return serde_json::json!({
                "summary": "Signals are consistent across metrics and logs; \
                            correlation with recent changes is plausible."
            });
        }
        if prompt.contains("Propose a remediation plan") {
            return plan_answer(prompt);
        }
        serde_json::json!({})
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for MockModel {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<ModelReply, ModelError> {
        let text = self.answer(prompt).to_string();
        let tokens_used = (((prompt.len() + text.len()) / 4).max(1)) as u64;
        Ok(ModelReply { text, tokens_used })
    }
}

fn triage_answer(prompt: &str) -> serde_json::Value {
    let lower = prompt.to_lowercase();
    let (severity, category) = if lower.contains("latency") || lower.contains("p99") {
        ("high", "latency")
    } else if lower.contains("error") || lower.contains("5xx") {
        ("high", "errors")
    } else if lower.contains("disk") || lower.contains("capacity") {
        ("medium", "capacity")
    } else {
        ("medium", "unknown")
    };
    serde_json::json!({
        "severity": severity,
        "category": category,
        "reasoning": format!("symptom keywords indicate a {} incident", category),
    })
}

fn plan_answer(prompt: &str) -> serde_json::Value {
    let service = field(prompt, "Service:").unwrap_or("unknown");
    let tools: Vec<&str> = field(prompt, "Available tools:")
        .map(|line| line.split(',').map(str::trim).collect())
        .unwrap_or_default();

    let mut actions = Vec::new();
    if tools.contains(&"query_metrics") {
        actions.push(serde_json::json!({
            "tool_name": "query_metrics",
            "arguments": { "service": service, "metric": "latency_p99_ms" },
            "expected_effect": "confirm whether the regression persists",
        }));
    }
    if tools.contains(&"get_change_history") {
        actions.push(serde_json::json!({
            "tool_name": "get_change_history",
            "arguments": { "service": service },
            "expected_effect": "correlate onset with recent deployments",
        }));
    }
    serde_json::json!({
        "hypotheses": [
            { "statement": "a recent change degraded the service", "rank": 0 },
            { "statement": "an upstream dependency is saturated", "rank": 1 },
        ],
        "actions": actions,
        "risks": ["diagnostic actions only; no production writes proposed"],
    })
}

/// Value of a `Label: value` line inside the prompt.
fn field<'a>(prompt: &'a str, label: &str) -> Option<&'a str> {
    prompt
        .lines()
        .find_map(|line| line.trim().strip_prefix(label))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::extract_json;

    #[tokio::test]
    async fn test_triage_pattern() {
        let model = MockModel::new();
        let reply = model
            .generate(
                "Triage the incident.\np99 latency is 2100ms against a 400ms SLO",
                &GenerateOptions::default(),
            )
            .await
            .unwrap();
        let value = extract_json(&reply.text).unwrap();
        assert_eq!(value["severity"], "high");
        assert_eq!(value["category"], "latency");
        assert!(reply.tokens_used > 0);
    }

    #[tokio::test]
    async fn test_plan_pattern_uses_prompt_fields() {
        let model = MockModel::new();
        let prompt = "Propose a remediation plan.\n\
                      Service: checkout\n\
                      Available tools: query_metrics, query_logs, get_change_history";
        let reply = model
            .generate(prompt, &GenerateOptions::default())
            .await
            .unwrap();
        let value = extract_json(&reply.text).unwrap();
        let actions = value["actions"].as_array().unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0]["arguments"]["service"], "checkout");
    }

    #[tokio::test]
    async fn test_custom_rule_wins() {
        let model = MockModel::new().with_rule("Triage", serde_json::json!({"severity": "low"}));
        let reply = model
            .generate("Triage the incident.", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(extract_json(&reply.text).unwrap()["severity"], "low");
    }
}
