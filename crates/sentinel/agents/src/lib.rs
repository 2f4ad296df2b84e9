//! Sentinel Agents - the built-in stage handlers
//!
//! Six handlers cover the workflow stages the engine delegates: triage,
//! investigation, planning, execution, verification, and reporting. The
//! three model-backed agents speak to any [`ModelClient`]; [`MockModel`]
//! provides a deterministic default so the whole pipeline runs offline.

#![deny(unsafe_code)]

mod executor;
mod investigation;
mod mock;
mod model;
mod planner;
mod reporter;
mod triage;
mod verifier;

pub use executor::ExecutorAgent;
pub use investigation::InvestigationAgent;
pub use mock::MockModel;
pub use model::{GenerateOptions, ModelClient, ModelError, ModelReply};
pub use planner::PlannerAgent;
pub use reporter::ReporterAgent;
pub use triage::TriageAgent;
pub use verifier::VerifierAgent;

use sentinel_engine::StageHandler;
use sentinel_types::Task;
use std::sync::Arc;

/// The full default pipeline backed by one model client.
pub fn default_handlers(model: Arc<dyn ModelClient>) -> Vec<Arc<dyn StageHandler>> {
    vec![
        Arc::new(TriageAgent::new(Arc::clone(&model))),
        Arc::new(InvestigationAgent::new(Arc::clone(&model))),
        Arc::new(PlannerAgent::new(model)),
        Arc::new(ExecutorAgent::new()),
        Arc::new(VerifierAgent::new()),
        Arc::new(ReporterAgent::new()),
    ]
}

/// Service the task is about, taken from the normalized context.
pub(crate) fn service_name(task: &Task) -> String {
    task.context
        .get("service")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}
