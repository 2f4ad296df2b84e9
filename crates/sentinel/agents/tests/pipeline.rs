//! Full-pipeline runs with the default agents, mock model, and simulated
//! tools.

use async_trait::async_trait;
use sentinel_agents::{
    default_handlers, GenerateOptions, MockModel, ModelClient, ModelError, ModelReply,
};
use sentinel_engine::{AutoApprovalGate, Orchestrator};
use sentinel_registry::{ToolHandler, ToolRegistry, ToolSpec};
use sentinel_tools::register_builtin_tools;
use sentinel_trace::MemorySink;
use sentinel_types::{
    EventType, PermissionLevel, ReportStatus, RiskLevel, RunStatus, Stage, Task, TaskId,
    TaskSource,
};
use std::sync::Arc;

fn incident_task(id: &str) -> Task {
    let mut task = Task::new(
        TaskId::new(id),
        TaskSource::Alert,
        "p99 latency above SLO on auth",
    );
    task.symptoms
        .insert("latency_p99_ms".into(), serde_json::json!(2100));
    task.context = serde_json::json!({ "service": "auth" });
    task
}

fn builtin_registry() -> Arc<ToolRegistry> {
    let registry = ToolRegistry::new();
    register_builtin_tools(&registry).unwrap();
    Arc::new(registry)
}

fn pipeline(
    registry: Arc<ToolRegistry>,
    sink: Arc<MemorySink>,
    model: Arc<dyn ModelClient>,
) -> sentinel_engine::OrchestratorBuilder {
    let mut builder = Orchestrator::builder(registry).with_sink(sink);
    for handler in default_handlers(model) {
        builder = builder.with_handler(handler);
    }
    builder
}

#[tokio::test]
async fn test_read_only_incident_runs_to_success() {
    let sink = Arc::new(MemorySink::new());
    let orchestrator = pipeline(builtin_registry(), sink.clone(), Arc::new(MockModel::new())).build();

    let episode = orchestrator.run(incident_task("t-pipeline")).await.unwrap();

    assert_eq!(episode.status, RunStatus::Completed);
    assert_eq!(episode.report.status, ReportStatus::Success);
    assert!(episode.report.summary.contains("high latency"));
    // Four probes plus execution results.
    assert!(episode.evidence.len() >= 4);
    let plan = episode.plan.as_ref().unwrap();
    assert!(!plan.approval_required);
    assert!(plan.actions.iter().all(|a| a.risk_level == RiskLevel::ReadOnly));
    assert!(episode.report.metrics["tokens_used"] > 0);

    // Investigation probes fan out, but each keeps its own granted
    // permission check ahead of the call.
    let events = sink.events();
    for (i, event) in events.iter().enumerate() {
        if event.event_type == EventType::ToolCall {
            assert!(events[..i].iter().any(|e| {
                e.event_type == EventType::PolicyDecision
                    && e.payload_summary.starts_with("permission_check granted")
            }));
        }
    }
    // The run walked every stage in order.
    let entered: Vec<Stage> = events
        .iter()
        .filter(|e| e.event_type == EventType::StageEnter)
        .map(|e| e.stage)
        .collect();
    assert_eq!(
        entered,
        vec![
            Stage::Detect,
            Stage::Triage,
            Stage::Investigation,
            Stage::Plan,
            Stage::Approve,
            Stage::Execute,
            Stage::Verify,
            Stage::Report
        ]
    );
}

#[tokio::test]
async fn test_risky_plan_denied_becomes_plan_rejected() {
    let registry = ToolRegistry::new();
    register_builtin_tools(&registry).unwrap();

    struct NoopTool;
    #[async_trait]
    impl ToolHandler for NoopTool {
        async fn call(&self, _arguments: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::json!({"restarted": true}))
        }
    }
    registry
        .register(
            ToolSpec::new(
                "restart_service",
                "restart one service",
                serde_json::json!({
                    "type": "object",
                    "properties": {"service": {"type": "string"}},
                    "required": ["service"],
                }),
                RiskLevel::RiskyWrite,
                PermissionLevel::Operator,
            ),
            Arc::new(NoopTool),
        )
        .unwrap();

    let model = MockModel::new().with_rule(
        "Propose a remediation plan",
        serde_json::json!({
            "hypotheses": [{"statement": "bad deploy", "rank": 0}],
            "actions": [{
                "tool_name": "restart_service",
                "arguments": {"service": "auth"},
                "expected_effect": "clear wedged workers",
            }],
            "risks": ["brief availability dip during restart"],
        }),
    );

    let sink = Arc::new(MemorySink::new());
    let orchestrator = pipeline(Arc::new(registry), sink.clone(), Arc::new(model))
        .with_gate(Arc::new(AutoApprovalGate::denying("change freeze in effect")))
        .build();

    let episode = orchestrator.run(incident_task("t-risky")).await.unwrap();

    assert_eq!(episode.status, RunStatus::Completed);
    assert_eq!(episode.report.status, ReportStatus::PlanRejected);
    assert!(episode.plan.as_ref().unwrap().approval_required);
    // The rejected plan is still reviewable from the report, unexecuted.
    assert_eq!(episode.report.actions.len(), 1);
    assert_eq!(episode.report.metrics["actions_executed"], 0);
    assert!(!sink
        .events()
        .iter()
        .any(|e| e.event_type == EventType::ToolCall && e.stage == Stage::Execute));
}

#[tokio::test]
async fn test_unparseable_triage_reply_degrades_conservatively() {
    /// Model that never answers JSON.
    struct ProseModel;
    #[async_trait]
    impl ModelClient for ProseModel {
        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerateOptions,
        ) -> Result<ModelReply, ModelError> {
            Ok(ModelReply {
                text: "I am unable to provide structured output.".into(),
                tokens_used: 12,
            })
        }
    }

    let sink = Arc::new(MemorySink::new());
    let orchestrator = pipeline(builtin_registry(), sink.clone(), Arc::new(ProseModel)).build();

    let episode = orchestrator.run(incident_task("t-prose")).await.unwrap();

    // The run completes; triage degraded to its conservative default and
    // the planner produced an empty fallback plan.
    assert_eq!(episode.status, RunStatus::Completed);
    let plan = episode.plan.as_ref().unwrap();
    assert!(plan.actions.is_empty());
    assert!(episode.report.summary.contains("medium unknown"));
}

#[tokio::test]
async fn test_read_only_constraint_withholds_write_actions() {
    let registry = ToolRegistry::new();
    register_builtin_tools(&registry).unwrap();

    struct NoopTool;
    #[async_trait]
    impl ToolHandler for NoopTool {
        async fn call(&self, _arguments: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::json!({"flushed": true}))
        }
    }
    registry
        .register(
            ToolSpec::new(
                "flush_cache",
                "flush a service cache",
                serde_json::json!({
                    "type": "object",
                    "properties": {"service": {"type": "string"}},
                    "required": ["service"],
                }),
                RiskLevel::SafeWrite,
                PermissionLevel::Operator,
            ),
            Arc::new(NoopTool),
        )
        .unwrap();

    let model = MockModel::new().with_rule(
        "Propose a remediation plan",
        serde_json::json!({
            "hypotheses": [],
            "actions": [{
                "tool_name": "flush_cache",
                "arguments": {"service": "auth"},
                "expected_effect": "drop stale entries",
            }],
            "risks": [],
        }),
    );

    let sink = Arc::new(MemorySink::new());
    let mut task = incident_task("t-read-only");
    task.constraints.read_only = true;

    let orchestrator = pipeline(Arc::new(registry), sink.clone(), Arc::new(model)).build();
    let episode = orchestrator.run(task).await.unwrap();

    assert_eq!(episode.status, RunStatus::Completed);
    // SAFE_WRITE sits below the default approval threshold, so the gate was
    // skipped, but the constraint still withheld the write.
    assert_eq!(episode.report.status, ReportStatus::Partial);
    assert_eq!(episode.report.metrics["actions_executed"], 0);
    assert!(episode
        .report
        .recommendations
        .iter()
        .any(|r| r.contains("re-run without read_only")));
    assert!(!sink
        .events()
        .iter()
        .any(|e| e.stage == Stage::Execute && e.event_type == EventType::ToolCall));
}
