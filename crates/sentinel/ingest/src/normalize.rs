//! Source-specific normalizers.
//!
//! Raw payloads are loosely structured; known fields are lifted into the
//! Task and everything else lands in symptoms or context, so nothing the
//! upstream sent is lost.

use sentinel_types::{BudgetLimits, Constraints, Task, TaskId, TaskSource};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Ingested tasks get a tighter default budget than programmatic callers;
/// webhook-driven runs should bound themselves conservatively.
const INGEST_BUDGET: BudgetLimits = BudgetLimits {
    max_tool_calls: 20,
    max_wall_time_secs: 180,
    max_tokens: 50_000,
};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("raw payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Normalize one raw payload into a [`Task`].
pub fn ingest(raw: &Value, source: TaskSource) -> Result<Task, IngestError> {
    let obj = raw.as_object().ok_or_else(|| {
        IngestError::NotAnObject(match raw {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        })
    })?;
    let mut task = match source {
        TaskSource::Alert => normalize_alert(obj),
        TaskSource::Ticket => normalize_ticket(obj),
        TaskSource::Chat => normalize_chat(obj),
        TaskSource::Cron => normalize_cron(obj),
    };
    task.constraints = constraints_of(obj);
    task.budget = budget_of(obj);
    tracing::debug!(task_id = %task.task_id, source = %source, "payload normalized");
    Ok(task)
}

// ── Alert (Prometheus / PagerDuty webhook style) ─────────────────────

fn normalize_alert(raw: &Map<String, Value>) -> Task {
    let alerts = raw.get("alerts").and_then(|v| v.as_array());
    let first: &Map<String, Value> = alerts
        .and_then(|a| a.first())
        .and_then(|v| v.as_object())
        .unwrap_or(raw);

    let labels = first
        .get("labels")
        .or_else(|| raw.get("commonLabels"))
        .and_then(|v| v.as_object());
    let annotations = first
        .get("annotations")
        .or_else(|| raw.get("commonAnnotations"))
        .and_then(|v| v.as_object());

    let mut symptoms = BTreeMap::new();
    for source in [labels, annotations].into_iter().flatten() {
        for (key, value) in source {
            symptoms.insert(key.clone(), value.clone());
        }
    }

    let mut context = Map::new();
    for key in ["receiver", "groupLabels", "externalURL"] {
        if let Some(value) = raw.get(key) {
            context.insert(key.into(), value.clone());
        }
    }
    lift_service(&mut context, symptoms.get("service"));

    let goal = annotations
        .and_then(|a| a.get("summary"))
        .or_else(|| symptoms.get("alertname"))
        .and_then(|v| v.as_str())
        .unwrap_or("Investigate alert")
        .to_string();

    let mut task = Task::new(task_id(raw, "alert"), TaskSource::Alert, goal);
    task.symptoms = symptoms;
    task.context = Value::Object(context);
    task
}

// ── Ticket (Jira / ServiceNow style) ─────────────────────────────────

fn normalize_ticket(raw: &Map<String, Value>) -> Task {
    let title = str_field(raw, &["title", "summary", "subject"]);
    let description = str_field(raw, &["description", "body", "content", "text"]);

    let mut symptoms = BTreeMap::new();
    if let Some(title) = title {
        symptoms.insert("title".into(), Value::String(title.to_string()));
    }
    if let Some(description) = description {
        symptoms.insert("description".into(), Value::String(description.to_string()));
    }
    for key in ["priority", "status", "assignee"] {
        if let Some(value) = raw.get(key) {
            symptoms.insert(key.into(), value.clone());
        }
    }

    let mut context = Map::new();
    if let Some(project) = raw.get("project") {
        context.insert("project".into(), project.clone());
    }
    if let Some(labels) = raw.get("labels").or_else(|| raw.get("tags")) {
        context.insert("labels".into(), labels.clone());
    }
    if let Some(created) = raw.get("created").or_else(|| raw.get("createdAt")) {
        context.insert("created".into(), created.clone());
    }
    if let Some(updated) = raw.get("updated").or_else(|| raw.get("updatedAt")) {
        context.insert("updated".into(), updated.clone());
    }
    lift_service(&mut context, raw.get("service"));

    let goal = str_field(raw, &["goal"])
        .or(title)
        .unwrap_or("Resolve ticket")
        .to_string();

    let id = str_field(raw, &["task_id", "id", "key"])
        .map(TaskId::new)
        .unwrap_or_else(|| TaskId::generate("ticket"));
    let mut task = Task::new(id, TaskSource::Ticket, goal);
    task.symptoms = symptoms;
    task.context = Value::Object(context);
    task
}

// ── Chat (free-form operator question) ───────────────────────────────

fn normalize_chat(raw: &Map<String, Value>) -> Task {
    let message = str_field(
        raw,
        &["message", "query", "text", "question", "prompt", "content", "body"],
    )
    .unwrap_or("");

    let mut symptoms = BTreeMap::new();
    symptoms.insert("message".into(), Value::String(message.to_string()));
    if let Some(user) = raw.get("user").or_else(|| raw.get("userId")) {
        symptoms.insert("user".into(), user.clone());
    }

    // Everything not already consumed rides along as context.
    const CONSUMED: [&str; 10] = [
        "message", "query", "text", "question", "prompt", "content", "body", "task_id", "budget",
        "constraints",
    ];
    let mut context = Map::new();
    for (key, value) in raw {
        if !CONSUMED.contains(&key.as_str()) {
            context.insert(key.clone(), value.clone());
        }
    }

    let goal = str_field(raw, &["goal"])
        .map(str::to_string)
        .unwrap_or_else(|| {
            let mut excerpt = message.to_string();
            if excerpt.len() > 200 {
                let mut cut = 200;
                while !excerpt.is_char_boundary(cut) {
                    cut -= 1;
                }
                excerpt.truncate(cut);
            }
            format!("Answer or act on: {}", excerpt)
        });

    let mut task = Task::new(task_id(raw, "chat"), TaskSource::Chat, goal);
    task.symptoms = symptoms;
    task.context = Value::Object(context);
    task
}

// ── Cron (scheduled job trigger) ─────────────────────────────────────

fn normalize_cron(raw: &Map<String, Value>) -> Task {
    let job = str_field(raw, &["job", "job_name", "name"]).unwrap_or("");

    let mut symptoms = BTreeMap::new();
    symptoms.insert("job".into(), Value::String(job.to_string()));
    if let Some(schedule) = raw.get("schedule").or_else(|| raw.get("cron")) {
        symptoms.insert("schedule".into(), schedule.clone());
    }
    if let Some(params) = raw.get("params").or_else(|| raw.get("args")) {
        symptoms.insert("params".into(), params.clone());
    }

    const CONSUMED: [&str; 10] = [
        "task_id", "budget", "constraints", "job", "job_name", "name", "schedule", "cron",
        "params", "args",
    ];
    let mut context = Map::new();
    for (key, value) in raw {
        if !CONSUMED.contains(&key.as_str()) {
            context.insert(key.clone(), value.clone());
        }
    }

    let goal = str_field(raw, &["goal"])
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "Run scheduled job: {}",
                if job.is_empty() { "cron" } else { job }
            )
        });

    let mut task = Task::new(task_id(raw, "cron"), TaskSource::Cron, goal);
    task.symptoms = symptoms;
    task.context = Value::Object(context);
    task
}

// ── Shared field extraction ──────────────────────────────────────────

fn task_id(raw: &Map<String, Value>, prefix: &str) -> TaskId {
    str_field(raw, &["task_id"])
        .map(TaskId::new)
        .unwrap_or_else(|| TaskId::generate(prefix))
}

fn str_field<'a>(raw: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| raw.get(*key).and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
}

/// Downstream agents resolve the affected service from `context.service`.
fn lift_service(context: &mut Map<String, Value>, service: Option<&Value>) {
    if let Some(service) = service {
        context.entry("service").or_insert_with(|| service.clone());
    }
}

fn constraints_of(raw: &Map<String, Value>) -> Constraints {
    raw.get("constraints")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

/// The ingest default budget, with any caller-specified fields overriding.
fn budget_of(raw: &Map<String, Value>) -> BudgetLimits {
    let mut budget = INGEST_BUDGET;
    let Some(overrides) = raw.get("budget").and_then(|v| v.as_object()) else {
        return budget;
    };
    if let Some(v) = overrides.get("max_tool_calls").and_then(|v| v.as_u64()) {
        budget.max_tool_calls = u32::try_from(v).unwrap_or(u32::MAX);
    }
    if let Some(v) = overrides.get("max_wall_time_secs").and_then(|v| v.as_u64()) {
        budget.max_wall_time_secs = v;
    }
    if let Some(v) = overrides.get("max_tokens").and_then(|v| v.as_u64()) {
        budget.max_tokens = v;
    }
    budget
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_style_alert() {
        let raw = serde_json::json!({
            "alerts": [{
                "labels": {
                    "alertname": "HighLatency",
                    "service": "auth-service",
                    "severity": "high",
                },
                "annotations": {
                    "summary": "Diagnose high latency and recommend remediation",
                },
            }],
            "receiver": "sentinel",
        });
        let task = ingest(&raw, TaskSource::Alert).unwrap();
        assert_eq!(task.source, TaskSource::Alert);
        assert_eq!(task.goal, "Diagnose high latency and recommend remediation");
        assert_eq!(task.symptoms["alertname"], "HighLatency");
        assert_eq!(task.context["service"], "auth-service");
        assert_eq!(task.context["receiver"], "sentinel");
        assert_eq!(task.budget, INGEST_BUDGET);
    }

    #[test]
    fn test_bare_alert_without_envelope() {
        let raw = serde_json::json!({
            "labels": { "alertname": "DiskPressure" },
        });
        let task = ingest(&raw, TaskSource::Alert).unwrap();
        assert_eq!(task.goal, "DiskPressure");
    }

    #[test]
    fn test_ticket_keeps_caller_id_and_title() {
        let raw = serde_json::json!({
            "key": "OPS-4312",
            "summary": "auth errors spiking",
            "description": "5xx rate tripled after the 14:00 deploy",
            "priority": "P1",
            "tags": ["auth", "prod"],
            "service": "auth",
        });
        let task = ingest(&raw, TaskSource::Ticket).unwrap();
        assert_eq!(task.task_id, TaskId::new("OPS-4312"));
        assert_eq!(task.goal, "auth errors spiking");
        assert_eq!(task.symptoms["priority"], "P1");
        assert_eq!(task.context["labels"][0], "auth");
        assert_eq!(task.context["service"], "auth");
    }

    #[test]
    fn test_chat_excerpts_long_messages() {
        let raw = serde_json::json!({
            "message": "w".repeat(400),
            "user": "oncall",
        });
        let task = ingest(&raw, TaskSource::Chat).unwrap();
        assert!(task.goal.len() <= "Answer or act on: ".len() + 200);
        assert_eq!(task.symptoms["user"], "oncall");
    }

    #[test]
    fn test_cron_names_the_job() {
        let raw = serde_json::json!({
            "job_name": "nightly-capacity-review",
            "cron": "0 3 * * *",
        });
        let task = ingest(&raw, TaskSource::Cron).unwrap();
        assert_eq!(task.goal, "Run scheduled job: nightly-capacity-review");
        assert_eq!(task.symptoms["schedule"], "0 3 * * *");
    }

    #[test]
    fn test_budget_and_constraint_overrides() {
        let raw = serde_json::json!({
            "labels": { "alertname": "HighLatency" },
            "budget": { "max_tool_calls": 5 },
            "constraints": { "read_only": true },
        });
        let task = ingest(&raw, TaskSource::Alert).unwrap();
        assert_eq!(task.budget.max_tool_calls, 5);
        assert_eq!(task.budget.max_tokens, INGEST_BUDGET.max_tokens);
        assert!(task.constraints.read_only);
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let err = ingest(&serde_json::json!([1, 2, 3]), TaskSource::Chat).unwrap_err();
        assert!(matches!(err, IngestError::NotAnObject("array")));
    }
}
