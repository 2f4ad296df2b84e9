//! Sentinel Engine - the incident workflow state machine
//!
//! One [`Orchestrator`] drives each admitted task through a fixed chain of
//! stages, consulting the budget before every stage, retrying recoverable
//! failures under a bounded policy, and routing risky plans through an
//! approval gate. Every admitted task produces exactly one finalized
//! [`Episode`](sentinel_types::Episode), failed runs included.

#![deny(unsafe_code)]

mod context;
mod error;
mod gate;
mod handler;
mod orchestrator;

pub use context::RunContext;
pub use error::{EngineError, StageError};
pub use gate::{ApprovalDecision, ApprovalGate, AutoApprovalGate};
pub use handler::{StageHandler, StageOutcome};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
