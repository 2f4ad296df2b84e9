//! Per-run state carried through the stage chain.

use crate::error::StageError;
use crate::gate::ApprovalDecision;
use sentinel_policy::{BudgetMeter, BudgetSnapshot, DebitKind};
use sentinel_registry::{InvocationContext, ToolOutput, ToolRegistry};
use sentinel_trace::RunTrace;
use sentinel_types::{
    AbortHandle, Action, Evidence, PermissionLevel, Plan, Report, RunId, Stage, Task,
    TriageAssessment, VerificationOutcome,
};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Default)]
struct RunState {
    evidence: Vec<Evidence>,
    triage: Option<TriageAssessment>,
    plan: Option<Plan>,
    approval: Option<ApprovalDecision>,
    executed: Vec<Action>,
    verification: Option<VerificationOutcome>,
    report: Option<Report>,
}

/// Everything one run owns: the immutable task, its trace, its budget, and
/// the state accumulated stage by stage. There is no ambient global state;
/// handlers see the run only through this object.
///
/// Stages run sequentially, but a single stage may fan out concurrent tool
/// calls, so accumulated state sits behind a mutex.
pub struct RunContext {
    task: Task,
    registry: Arc<ToolRegistry>,
    trace: Arc<RunTrace>,
    meter: Arc<BudgetMeter>,
    abort: AbortHandle,
    caller_permission: PermissionLevel,
    state: Mutex<RunState>,
}

impl RunContext {
    pub(crate) fn new(
        task: Task,
        registry: Arc<ToolRegistry>,
        trace: Arc<RunTrace>,
        meter: Arc<BudgetMeter>,
        abort: AbortHandle,
        caller_permission: PermissionLevel,
    ) -> Self {
        Self {
            task,
            registry,
            trace,
            meter,
            abort,
            caller_permission,
            state: Mutex::new(RunState::default()),
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn run_id(&self) -> &RunId {
        self.trace.run_id()
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    pub(crate) fn trace(&self) -> &RunTrace {
        &self.trace
    }

    pub(crate) fn meter(&self) -> &BudgetMeter {
        &self.meter
    }

    /// Consumption so far, for report metrics.
    pub fn budget_snapshot(&self) -> BudgetSnapshot {
        self.meter.snapshot()
    }

    /// Invoke a tool through the governed registry path.
    ///
    /// Observes the abort flag first: no new invocation starts once
    /// cancellation has been requested.
    pub async fn invoke_tool(
        &self,
        stage: Stage,
        name: &str,
        arguments: &serde_json::Value,
    ) -> Result<ToolOutput, StageError> {
        if self.abort.is_aborted() {
            return Err(StageError::Aborted);
        }
        let ictx = InvocationContext {
            caller_permission: self.caller_permission,
            stage,
            trace: &self.trace,
            meter: &self.meter,
        };
        Ok(self.registry.invoke(&ictx, name, arguments).await?)
    }

    /// Charge model tokens against the run budget.
    pub fn debit_tokens(&self, amount: u64) -> Result<(), StageError> {
        self.meter.debit(DebitKind::Tokens, amount)?;
        Ok(())
    }

    /// Names of the tools available through the registry.
    pub fn available_tools(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    /// Resolve the registered risk level of a tool, if it exists.
    pub fn tool_spec(&self, name: &str) -> Option<sentinel_registry::ToolSpec> {
        self.registry.spec(name)
    }

    // ── Accumulated state ────────────────────────────────────────────

    pub fn add_evidence(&self, evidence: Evidence) {
        self.lock().evidence.push(evidence);
    }

    pub fn evidence(&self) -> Vec<Evidence> {
        self.lock().evidence.clone()
    }

    pub fn set_triage(&self, assessment: TriageAssessment) {
        self.lock().triage = Some(assessment);
    }

    pub fn triage(&self) -> Option<TriageAssessment> {
        self.lock().triage.clone()
    }

    pub fn set_plan(&self, plan: Plan) {
        self.lock().plan = Some(plan);
    }

    pub fn plan(&self) -> Option<Plan> {
        self.lock().plan.clone()
    }

    pub(crate) fn update_plan(&self, f: impl FnOnce(&mut Plan)) {
        if let Some(plan) = self.lock().plan.as_mut() {
            f(plan);
        }
    }

    pub(crate) fn set_approval(&self, decision: ApprovalDecision) {
        self.lock().approval = Some(decision);
    }

    /// The gate's decision, if the plan required one.
    pub fn approval(&self) -> Option<ApprovalDecision> {
        self.lock().approval.clone()
    }

    /// Record an action the executor actually carried out.
    pub fn push_executed(&self, action: Action) {
        self.lock().executed.push(action);
    }

    pub fn executed_actions(&self) -> Vec<Action> {
        self.lock().executed.clone()
    }

    pub fn set_verification(&self, outcome: VerificationOutcome) {
        self.lock().verification = Some(outcome);
    }

    pub fn verification(&self) -> Option<VerificationOutcome> {
        self.lock().verification.clone()
    }

    pub fn set_report(&self, report: Report) {
        self.lock().report = Some(report);
    }

    pub(crate) fn take_report(&self) -> Option<Report> {
        self.lock().report.take()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
