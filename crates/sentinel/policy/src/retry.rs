//! Bounded retry configuration.

use sentinel_types::Stage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Retry configuration for one stage.
///
/// `max_retries` is a small constant by default; there is deliberately no
/// way to express an unbounded policy.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff_ms: u64,
    /// Multiplier applied per subsequent retry.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let millis =
            self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent as i32);
        Duration::from_millis(millis as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Per-stage retry policies with a shared default.
#[derive(Clone, Debug, Default)]
pub struct RetryPolicies {
    default: RetryPolicy,
    overrides: HashMap<Stage, RetryPolicy>,
}

impl RetryPolicies {
    pub fn new(default: RetryPolicy) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, stage: Stage, policy: RetryPolicy) -> Self {
        self.overrides.insert(stage, policy);
        self
    }

    /// The policy in force for a stage.
    pub fn for_stage(&self, stage: Stage) -> RetryPolicy {
        self.overrides.get(&stage).copied().unwrap_or(self.default)
    }
}
