//! The workflow state machine.

use crate::context::RunContext;
use crate::error::{EngineError, StageError};
use crate::gate::{ApprovalDecision, ApprovalGate, AutoApprovalGate};
use crate::handler::StageHandler;
use sentinel_policy::{ApprovalPolicy, BudgetMeter, RetryPolicies};
use sentinel_registry::{RegistryError, ToolRegistry};
use sentinel_trace::{NullSink, RunTrace, TraceSink};
use sentinel_types::{
    AbortHandle, Episode, EventType, FailureReason, PermissionLevel, Report, RunId, RunStatus,
    Stage, Task, TaskId,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// Configures and builds an [`Orchestrator`].
pub struct OrchestratorBuilder {
    registry: Arc<ToolRegistry>,
    sink: Arc<dyn TraceSink>,
    handlers: HashMap<Stage, Arc<dyn StageHandler>>,
    gate: Arc<dyn ApprovalGate>,
    approval_policy: ApprovalPolicy,
    retries: RetryPolicies,
    caller_permission: PermissionLevel,
}

impl OrchestratorBuilder {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            sink: Arc::new(NullSink),
            handlers: HashMap::new(),
            gate: Arc::new(AutoApprovalGate::approving()),
            approval_policy: ApprovalPolicy::default(),
            retries: RetryPolicies::default(),
            caller_permission: PermissionLevel::Operator,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Install a stage handler; keyed by the handler's own stage.
    pub fn with_handler(mut self, handler: Arc<dyn StageHandler>) -> Self {
        self.handlers.insert(handler.stage(), handler);
        self
    }

    pub fn with_gate(mut self, gate: Arc<dyn ApprovalGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_approval_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.approval_policy = policy;
        self
    }

    pub fn with_retry_policies(mut self, retries: RetryPolicies) -> Self {
        self.retries = retries;
        self
    }

    /// Permission level the run's tool invocations are made with.
    pub fn with_caller_permission(mut self, permission: PermissionLevel) -> Self {
        self.caller_permission = permission;
        self
    }

    /// Seal the registry and assemble the orchestrator. No tools can be
    /// registered once runs may be in flight.
    pub fn build(self) -> Orchestrator {
        self.registry.seal();
        Orchestrator {
            registry: self.registry,
            sink: self.sink,
            handlers: self.handlers,
            gate: self.gate,
            approval_policy: self.approval_policy,
            retries: self.retries,
            caller_permission: self.caller_permission,
            active: Mutex::new(HashSet::new()),
        }
    }
}

/// Drives one task through DETECT → TRIAGE → INVESTIGATION → PLAN → APPROVE
/// → EXECUTE → VERIFY → REPORT, with FAILED reachable from any stage.
///
/// Independent runs may execute concurrently; each run's trace, budget, and
/// accumulated state are isolated in its own [`RunContext`].
pub struct Orchestrator {
    registry: Arc<ToolRegistry>,
    sink: Arc<dyn TraceSink>,
    handlers: HashMap<Stage, Arc<dyn StageHandler>>,
    gate: Arc<dyn ApprovalGate>,
    approval_policy: ApprovalPolicy,
    retries: RetryPolicies,
    caller_permission: PermissionLevel,
    active: Mutex<HashSet<TaskId>>,
}

impl Orchestrator {
    pub fn builder(registry: Arc<ToolRegistry>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(registry)
    }

    /// Run a task to completion.
    ///
    /// Rejects malformed budgets and duplicate active tasks before any run
    /// state exists. Every admitted task yields exactly one finalized
    /// [`Episode`], failed runs included.
    pub async fn run(&self, task: Task) -> Result<Episode, EngineError> {
        self.run_with_abort(task, AbortHandle::new()).await
    }

    /// Like [`run`](Self::run), with a caller-held cancellation handle.
    /// Abort is cooperative: observed at stage boundaries and before each
    /// tool invocation.
    pub async fn run_with_abort(
        &self,
        task: Task,
        abort: AbortHandle,
    ) -> Result<Episode, EngineError> {
        task.budget.validate()?;
        self.admit(&task.task_id)?;

        let run_id = RunId::generate();
        tracing::info!(
            run_id = %run_id,
            task_id = %task.task_id,
            source = %task.source,
            "run started"
        );

        let trace = Arc::new(RunTrace::new(run_id.clone(), Arc::clone(&self.sink)));
        let meter = Arc::new(BudgetMeter::new(task.budget));
        let ctx = RunContext::new(
            task.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&trace),
            meter,
            abort,
            self.caller_permission,
        );

        let outcome = self.drive(&ctx).await;
        if let Err(failure) = &outcome {
            tracing::warn!(run_id = %run_id, failure = %failure, "run failed");
            // Best effort: if the trace itself is broken this record is lost,
            // but the Episode still carries the failure.
            let _ = trace.record(
                Stage::Failed,
                EventType::StageEnter,
                format!("run failed: {}", failure),
            );
        }

        let mut report = match (&outcome, ctx.take_report()) {
            (_, Some(report)) => report,
            (Ok(()), None) => Report::partial("run completed without a report stage"),
            (Err(failure), None) => Report::partial(format!("run failed: {}", failure)),
        };
        let snapshot = ctx.budget_snapshot();
        report
            .metrics
            .insert("tool_calls_used".into(), u64::from(snapshot.tool_calls_used));
        report.metrics.insert("tokens_used".into(), snapshot.tokens_used);
        report.metrics.insert("elapsed_secs".into(), snapshot.elapsed_secs);

        let status = match outcome {
            Ok(()) => RunStatus::Completed,
            Err(failure) => RunStatus::Failed { failure },
        };
        let episode = trace.finalize(task, ctx.evidence(), ctx.plan(), report, status);

        self.release(&episode.task.task_id);
        tracing::info!(
            run_id = %run_id,
            completed = episode.status.is_completed(),
            events = episode.events.len(),
            "run finished"
        );
        Ok(episode)
    }

    // ── Run admission ────────────────────────────────────────────────

    fn admit(&self, task_id: &TaskId) -> Result<(), EngineError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(task_id.clone()) {
            return Err(EngineError::TaskAlreadyActive(task_id.clone()));
        }
        Ok(())
    }

    fn release(&self, task_id: &TaskId) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.remove(task_id);
    }

    // ── Stage loop ───────────────────────────────────────────────────

    async fn drive(&self, ctx: &RunContext) -> Result<(), FailureReason> {
        let mut stage = Stage::Detect;
        loop {
            if ctx.is_aborted() {
                self.record(ctx, stage, EventType::Error, "run aborted")?;
                return Err(FailureReason::Aborted);
            }
            if let Some(err) = ctx.meter().exhaustion() {
                self.record(
                    ctx,
                    stage,
                    EventType::Error,
                    format!("budget_exceeded detail={}", err),
                )?;
                return Err(FailureReason::BudgetExceeded {
                    detail: err.to_string(),
                });
            }

            self.record(ctx, stage, EventType::StageEnter, format!("stage={}", stage))?;

            if stage == Stage::Approve {
                let next = self.adjudicate_approval(ctx).await?;
                self.record(
                    ctx,
                    stage,
                    EventType::StageExit,
                    format!("stage={} next={}", stage, next),
                )?;
                stage = next;
                continue;
            }

            let summary = self.execute_with_retry(ctx, stage).await?;
            self.record(ctx, stage, EventType::StageExit, summary)?;

            if stage == Stage::Report {
                return Ok(());
            }
            stage = next_stage(stage);
        }
    }

    /// APPROVE is engine logic, not a handler: the policy decides whether a
    /// gate decision is needed, the gate decides the outcome, and both are
    /// recorded as POLICY_DECISION events.
    async fn adjudicate_approval(&self, ctx: &RunContext) -> Result<Stage, FailureReason> {
        let Some(plan) = ctx.plan() else {
            self.record(
                ctx,
                Stage::Approve,
                EventType::PolicyDecision,
                "approval not_required detail=no_plan",
            )?;
            return Ok(Stage::Execute);
        };

        let required = self.approval_policy.requires_approval(&plan);
        ctx.update_plan(|p| p.approval_required = required);

        if !required {
            self.record(
                ctx,
                Stage::Approve,
                EventType::PolicyDecision,
                format!(
                    "approval not_required threshold={} max_risk={}",
                    self.approval_policy.approval_threshold,
                    plan.max_risk()
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "none".into())
                ),
            )?;
            return Ok(Stage::Execute);
        }

        if ctx.task().constraints.approval_override {
            self.record(
                ctx,
                Stage::Approve,
                EventType::PolicyDecision,
                "approval overridden constraint=approval_override",
            )?;
            ctx.set_approval(ApprovalDecision::Approved {
                approver: "override".into(),
            });
            return Ok(Stage::Execute);
        }

        let decision = self.gate.decide(ctx.task(), &plan).await;
        let (summary, next) = match &decision {
            ApprovalDecision::Approved { approver } => (
                format!("approval granted approver={}", approver),
                Stage::Execute,
            ),
            ApprovalDecision::Denied { approver, reason } => (
                format!("approval denied approver={} reason={}", approver, reason),
                Stage::Report,
            ),
        };
        self.record(ctx, Stage::Approve, EventType::PolicyDecision, summary)?;
        ctx.set_approval(decision);
        Ok(next)
    }

    /// Execute one stage under its retry policy.
    ///
    /// Retryable failures record one ERROR event per failed attempt; retries
    /// are bounded by the stage's policy with FAILED as the terminal
    /// fallback. Governance failures on the tool path already carry their
    /// own audit record and are never retried.
    async fn execute_with_retry(
        &self,
        ctx: &RunContext,
        stage: Stage,
    ) -> Result<String, FailureReason> {
        let Some(handler) = self.handlers.get(&stage) else {
            return Ok(format!("stage={} pass-through", stage));
        };
        let policy = self.retries.for_stage(stage);
        let mut attempt: u32 = 0;
        loop {
            match handler.execute(ctx).await {
                Ok(outcome) => return Ok(outcome.summary),
                Err(err) => {
                    if let Some(failure) = fatal_failure(&err) {
                        if !err.is_audited() {
                            self.record(
                                ctx,
                                stage,
                                EventType::Error,
                                format!("stage_failed stage={} detail={}", stage, err),
                            )?;
                        }
                        return Err(failure);
                    }
                    if err.is_retryable() {
                        attempt += 1;
                        self.record(
                            ctx,
                            stage,
                            EventType::Error,
                            format!(
                                "stage_attempt_failed stage={} attempt={} detail={}",
                                stage, attempt, err
                            ),
                        )?;
                        if attempt <= policy.max_retries {
                            tokio::time::sleep(policy.backoff(attempt)).await;
                            if ctx.is_aborted() {
                                self.record(ctx, stage, EventType::Error, "run aborted")?;
                                return Err(FailureReason::Aborted);
                            }
                            continue;
                        }
                        return Err(FailureReason::StageFailed {
                            stage,
                            detail: format!("retries exhausted after {} attempts: {}", attempt, err),
                        });
                    }
                    if !err.is_audited() {
                        self.record(
                            ctx,
                            stage,
                            EventType::Error,
                            format!("stage_failed stage={} detail={}", stage, err),
                        )?;
                    }
                    return Err(FailureReason::StageFailed {
                        stage,
                        detail: err.to_string(),
                    });
                }
            }
        }
    }

    fn record(
        &self,
        ctx: &RunContext,
        stage: Stage,
        event_type: EventType,
        payload: impl Into<String>,
    ) -> Result<(), FailureReason> {
        ctx.trace()
            .record(stage, event_type, payload)
            .map(|_| ())
            .map_err(|e| FailureReason::TraceWriteFailed {
                detail: e.to_string(),
            })
    }
}

/// Failures that end the run regardless of the stage retry policy.
fn fatal_failure(err: &StageError) -> Option<FailureReason> {
    match err {
        StageError::Trace(e) | StageError::Registry(RegistryError::Trace(e)) => {
            Some(FailureReason::TraceWriteFailed {
                detail: e.to_string(),
            })
        }
        StageError::Budget(e) | StageError::Registry(RegistryError::Budget(e)) => {
            Some(FailureReason::BudgetExceeded {
                detail: e.to_string(),
            })
        }
        StageError::Aborted => Some(FailureReason::Aborted),
        _ => None,
    }
}

/// The fixed forward chain; APPROVE branching is handled by the engine.
fn next_stage(stage: Stage) -> Stage {
    match stage {
        Stage::Detect => Stage::Triage,
        Stage::Triage => Stage::Investigation,
        Stage::Investigation => Stage::Plan,
        Stage::Plan => Stage::Approve,
        Stage::Approve => Stage::Execute,
        Stage::Execute => Stage::Verify,
        Stage::Verify => Stage::Report,
        // Terminal stages never ask for a successor.
        Stage::Report | Stage::Failed => Stage::Report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_chain() {
        assert_eq!(next_stage(Stage::Detect), Stage::Triage);
        assert_eq!(next_stage(Stage::Plan), Stage::Approve);
        assert_eq!(next_stage(Stage::Verify), Stage::Report);
    }
}
