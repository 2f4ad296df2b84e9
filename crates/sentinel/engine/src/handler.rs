//! Stage handler boundary.

use crate::context::RunContext;
use crate::error::StageError;
use async_trait::async_trait;
use sentinel_types::Stage;

/// What a completed stage reports back to the engine.
#[derive(Clone, Debug, Default)]
pub struct StageOutcome {
    /// One-line summary recorded in the STAGE_EXIT event.
    pub summary: String,
}

impl StageOutcome {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
        }
    }
}

/// One stage of the workflow.
///
/// Handlers read and extend the run through [`RunContext`]; they never drive
/// transitions themselves. A handler may be executed more than once if its
/// failures are retryable, so side effects must go through the governed
/// tool path where they are audited and budgeted.
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// The stage this handler implements.
    fn stage(&self) -> Stage;

    async fn execute(&self, ctx: &RunContext) -> Result<StageOutcome, StageError>;
}
