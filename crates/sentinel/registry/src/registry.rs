//! The tool registry and its invocation gauntlet.

use crate::error::RegistryError;
use crate::handler::{ToolHandler, ToolOutput};
use crate::spec::ToolSpec;
use jsonschema::{Draft, Validator};
use sentinel_policy::{BudgetMeter, DebitKind};
use sentinel_trace::RunTrace;
use sentinel_types::{EventType, PermissionLevel, Stage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Everything one invocation needs from its run: who is calling, from which
/// stage, and the run's own trace and budget handles. Runs never share
/// these, so invocations from different runs cannot interleave state.
pub struct InvocationContext<'a> {
    pub caller_permission: PermissionLevel,
    pub stage: Stage,
    pub trace: &'a RunTrace,
    pub meter: &'a BudgetMeter,
}

struct RegisteredTool {
    spec: ToolSpec,
    validator: Validator,
    handler: Arc<dyn ToolHandler>,
}

/// Write-once, read-many mapping from tool name to specification.
///
/// All registrations happen at startup; `seal` flips the table to read-only
/// and late registrations are rejected explicitly rather than silently
/// overwriting.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<RegisteredTool>>>,
    sealed: AtomicBool,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            sealed: AtomicBool::new(false),
        }
    }

    /// Register a tool. Fails on duplicate names, on registration after
    /// `seal`, and on schemas that do not compile.
    pub fn register(
        &self,
        spec: ToolSpec,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        if self.sealed.load(Ordering::SeqCst) {
            return Err(RegistryError::RegistrySealed(spec.name));
        }
        let validator = jsonschema::options()
            .with_draft(Draft::Draft7)
            .build(&spec.input_schema)
            .map_err(|e| RegistryError::InvalidSchema {
                tool: spec.name.clone(),
                detail: e.to_string(),
            })?;

        let mut tools = self
            .tools
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if tools.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateTool(spec.name));
        }
        tracing::debug!(tool = %spec.name, risk = %spec.risk_level, "tool registered");
        tools.insert(
            spec.name.clone(),
            Arc::new(RegisteredTool {
                spec,
                validator,
                handler,
            }),
        );
        Ok(())
    }

    /// Freeze the table. Lookups after this point take no lock contention
    /// from writers because there are none.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    /// Look up a registered spec (e.g. to resolve risk levels at plan time).
    pub fn spec(&self, name: &str) -> Option<ToolSpec> {
        let tools = self
            .tools
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tools.get(name).map(|t| t.spec.clone())
    }

    /// Names of all registered tools, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        let tools = self
            .tools
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut names: Vec<_> = tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Invoke a tool through the full governance gauntlet.
    ///
    /// Check order is fixed: existence, schema, permission, budget, execute.
    /// Schema failures debit nothing and cause no side effect. The
    /// permission decision is recorded in the trace before any execution,
    /// granted or denied. Each call is atomic with respect to its own audit
    /// records and budget debit.
    pub async fn invoke(
        &self,
        ctx: &InvocationContext<'_>,
        name: &str,
        arguments: &serde_json::Value,
    ) -> Result<ToolOutput, RegistryError> {
        let Some(tool) = self.lookup(name) else {
            ctx.trace.record(
                ctx.stage,
                EventType::Error,
                format!("unknown_tool tool={}", name),
            )?;
            return Err(RegistryError::UnknownTool(name.to_string()));
        };

        // Schema gate: fail before any debit or side effect.
        let violations: Vec<String> = tool
            .validator
            .iter_errors(arguments)
            .map(|e| e.to_string())
            .collect();
        if !violations.is_empty() {
            let detail = violations.join("; ");
            ctx.trace.record(
                ctx.stage,
                EventType::Error,
                format!("schema_validation_failed tool={} detail={}", name, detail),
            )?;
            return Err(RegistryError::SchemaValidation {
                tool: name.to_string(),
                detail,
            });
        }

        // Permission gate: the decision is traced whether it grants or
        // denies, and execution never happens after a denial.
        let required = tool.spec.required_permission;
        let granted = ctx.caller_permission.satisfies(required);
        ctx.trace.record(
            ctx.stage,
            EventType::PolicyDecision,
            format!(
                "permission_check {} tool={} caller={} required={}",
                if granted { "granted" } else { "denied" },
                name,
                ctx.caller_permission,
                required
            ),
        )?;
        if !granted {
            return Err(RegistryError::PermissionDenied {
                tool: name.to_string(),
                required,
                caller: ctx.caller_permission,
            });
        }

        // Budget gate: all-or-nothing debit of one tool call.
        if let Err(err) = ctx.meter.debit(DebitKind::ToolCalls, 1) {
            ctx.trace.record(
                ctx.stage,
                EventType::Error,
                format!("budget_exceeded tool={} detail={}", name, err),
            )?;
            return Err(err.into());
        }

        let risk = tool.spec.risk_level;
        ctx.trace.record(
            ctx.stage,
            EventType::ToolCall,
            format!("tool={} risk={} args={}", name, risk, summarize(arguments)),
        )?;

        let started = Instant::now();
        let result = tool.handler.call(arguments).await;
        let duration = started.elapsed();

        match result {
            Ok(data) => {
                ctx.trace.record(
                    ctx.stage,
                    EventType::ToolResult,
                    format!(
                        "tool={} ok duration_ms={} result={}",
                        name,
                        duration.as_millis(),
                        summarize(&data)
                    ),
                )?;
                Ok(ToolOutput {
                    tool_name: name.to_string(),
                    risk_level: risk,
                    data,
                    duration,
                })
            }
            Err(err) => {
                ctx.trace.record(
                    ctx.stage,
                    EventType::ToolResult,
                    format!(
                        "tool={} error duration_ms={} detail={}",
                        name,
                        duration.as_millis(),
                        err
                    ),
                )?;
                Err(RegistryError::ToolExecution {
                    tool: name.to_string(),
                    risk,
                    detail: err.to_string(),
                })
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<Arc<RegisteredTool>> {
        let tools = self
            .tools
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tools.get(name).cloned()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Compact single-line payload summary, truncated for the trace.
fn summarize(value: &serde_json::Value) -> String {
    const MAX: usize = 500;
    let mut text = value.to_string();
    if text.len() > MAX {
        let mut cut = MAX;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...(truncated)");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sentinel_trace::{MemorySink, RunTrace};
    use sentinel_types::{BudgetLimits, RiskLevel, RunId};
    use std::sync::atomic::AtomicU32;

    struct CountingTool {
        calls: AtomicU32,
        fail: bool,
    }

    impl CountingTool {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                fail,
            })
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ToolHandler for CountingTool {
        async fn call(&self, _arguments: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("backend unreachable");
            }
            Ok(serde_json::json!({"series": [1, 2, 3]}))
        }
    }

    fn spec(name: &str, risk: RiskLevel, required: PermissionLevel) -> ToolSpec {
        ToolSpec::new(
            name,
            "test tool",
            serde_json::json!({
                "type": "object",
                "properties": {"service": {"type": "string"}},
                "required": ["service"],
            }),
            risk,
            required,
        )
    }

    struct Fixture {
        trace: RunTrace,
        meter: BudgetMeter,
        sink: Arc<MemorySink>,
    }

    impl Fixture {
        fn new(max_tool_calls: u32) -> Self {
            let sink = Arc::new(MemorySink::new());
            Self {
                trace: RunTrace::new(RunId::generate(), sink.clone()),
                meter: BudgetMeter::new(BudgetLimits {
                    max_tool_calls,
                    max_wall_time_secs: 60,
                    max_tokens: 10_000,
                }),
                sink,
            }
        }

        fn ctx(&self, permission: PermissionLevel) -> InvocationContext<'_> {
            InvocationContext {
                caller_permission: permission,
                stage: Stage::Investigation,
                trace: &self.trace,
                meter: &self.meter,
            }
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = ToolRegistry::new();
        let tool = CountingTool::new(false);
        registry
            .register(
                spec("query_metrics", RiskLevel::ReadOnly, PermissionLevel::Guest),
                tool.clone(),
            )
            .unwrap();
        let err = registry
            .register(
                spec("query_metrics", RiskLevel::ReadOnly, PermissionLevel::Guest),
                tool,
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(_)));
    }

    #[tokio::test]
    async fn test_sealed_registry_rejects_late_registration() {
        let registry = ToolRegistry::new();
        registry.seal();
        let err = registry
            .register(
                spec("late", RiskLevel::ReadOnly, PermissionLevel::Guest),
                CountingTool::new(false),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::RegistrySealed(_)));
    }

    #[tokio::test]
    async fn test_permission_denied_never_reaches_handler() {
        let registry = ToolRegistry::new();
        let tool = CountingTool::new(false);
        registry
            .register(
                spec("restart_service", RiskLevel::RiskyWrite, PermissionLevel::Admin),
                tool.clone(),
            )
            .unwrap();

        let fx = Fixture::new(10);
        let err = registry
            .invoke(
                &fx.ctx(PermissionLevel::Operator),
                "restart_service",
                &serde_json::json!({"service": "auth"}),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::PermissionDenied { .. }));
        assert!(err.is_governance());
        assert_eq!(tool.call_count(), 0);
        // The denial itself is audited.
        let events = fx.sink.events();
        assert!(events.iter().any(|e| e.event_type == EventType::PolicyDecision
            && e.payload_summary.starts_with("permission_check denied")));
        // No debit on denial.
        assert_eq!(fx.meter.snapshot().tool_calls_used, 0);
    }

    #[tokio::test]
    async fn test_schema_violation_audited_without_debit() {
        let registry = ToolRegistry::new();
        let tool = CountingTool::new(false);
        registry
            .register(
                spec("query_metrics", RiskLevel::ReadOnly, PermissionLevel::Guest),
                tool.clone(),
            )
            .unwrap();

        let fx = Fixture::new(10);
        let err = registry
            .invoke(
                &fx.ctx(PermissionLevel::Operator),
                "query_metrics",
                &serde_json::json!({"window": "1h"}),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::SchemaValidation { .. }));
        assert_eq!(tool.call_count(), 0);
        assert_eq!(fx.meter.snapshot().tool_calls_used, 0);

        let events = fx.sink.events();
        let errors: Vec<_> = events
            .iter()
            .filter(|e| e.event_type == EventType::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(!events.iter().any(|e| e.event_type == EventType::ToolCall));
    }

    #[tokio::test]
    async fn test_successful_invocation_traces_call_and_result() {
        let registry = ToolRegistry::new();
        registry
            .register(
                spec("query_metrics", RiskLevel::ReadOnly, PermissionLevel::Guest),
                CountingTool::new(false),
            )
            .unwrap();

        let fx = Fixture::new(10);
        let output = registry
            .invoke(
                &fx.ctx(PermissionLevel::Guest),
                "query_metrics",
                &serde_json::json!({"service": "auth"}),
            )
            .await
            .unwrap();

        assert_eq!(output.tool_name, "query_metrics");
        assert_eq!(output.risk_level, RiskLevel::ReadOnly);
        assert_eq!(fx.meter.snapshot().tool_calls_used, 1);

        let kinds: Vec<EventType> = fx.sink.events().iter().map(|e| e.event_type).collect();
        assert_eq!(
            kinds,
            vec![
                EventType::PolicyDecision,
                EventType::ToolCall,
                EventType::ToolResult
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_failure_surfaces_as_retryable_execution_error() {
        let registry = ToolRegistry::new();
        registry
            .register(
                spec("query_logs", RiskLevel::ReadOnly, PermissionLevel::Guest),
                CountingTool::new(true),
            )
            .unwrap();

        let fx = Fixture::new(10);
        let err = registry
            .invoke(
                &fx.ctx(PermissionLevel::Guest),
                "query_logs",
                &serde_json::json!({"service": "auth"}),
            )
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        // Call and result are both recorded even on failure.
        let events = fx.sink.events();
        assert!(events.iter().any(|e| e.event_type == EventType::ToolCall));
        assert!(events
            .iter()
            .any(|e| e.event_type == EventType::ToolResult
                && e.payload_summary.contains("backend unreachable")));
    }

    #[tokio::test]
    async fn test_budget_exhaustion_blocks_invocation() {
        let registry = ToolRegistry::new();
        let tool = CountingTool::new(false);
        registry
            .register(
                spec("query_metrics", RiskLevel::ReadOnly, PermissionLevel::Guest),
                tool.clone(),
            )
            .unwrap();

        let fx = Fixture::new(1);
        let args = serde_json::json!({"service": "auth"});
        registry
            .invoke(&fx.ctx(PermissionLevel::Guest), "query_metrics", &args)
            .await
            .unwrap();
        let err = registry
            .invoke(&fx.ctx(PermissionLevel::Guest), "query_metrics", &args)
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::Budget(_)));
        assert!(!err.is_retryable());
        assert_eq!(tool.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_audited() {
        let registry = ToolRegistry::new();
        let fx = Fixture::new(10);
        let err = registry
            .invoke(
                &fx.ctx(PermissionLevel::Admin),
                "no_such_tool",
                &serde_json::json!({}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTool(_)));
        assert!(fx
            .sink
            .events()
            .iter()
            .any(|e| e.event_type == EventType::Error
                && e.payload_summary.contains("unknown_tool")));
    }
}
