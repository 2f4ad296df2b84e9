//! Per-run budget accounting.

use sentinel_types::BudgetLimits;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;
use thiserror::Error;

/// What a debit counts against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebitKind {
    ToolCalls,
    Tokens,
}

impl std::fmt::Display for DebitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebitKind::ToolCalls => write!(f, "tool_calls"),
            DebitKind::Tokens => write!(f, "tokens"),
        }
    }
}

/// Budget violation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BudgetError {
    #[error("budget exceeded: {kind} used {used} of {limit}")]
    Exceeded { kind: DebitKind, used: u64, limit: u64 },
    #[error("budget exceeded: wall time {elapsed_secs}s of {limit_secs}s")]
    WallTimeExceeded { elapsed_secs: u64, limit_secs: u64 },
}

/// Point-in-time consumption view, embedded in report metrics.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub tool_calls_used: u32,
    pub max_tool_calls: u32,
    pub tokens_used: u64,
    pub max_tokens: u64,
    pub elapsed_secs: u64,
    pub max_wall_time_secs: u64,
}

/// Tracks one run's consumption against its task limits.
///
/// Counters are touched only by that run's own execution path, but tool
/// calls inside a stage may be concurrent, so debits use compare-and-swap:
/// an increment that would exceed the limit is rejected whole, never
/// partially applied.
pub struct BudgetMeter {
    limits: BudgetLimits,
    tool_calls: AtomicU32,
    tokens: AtomicU64,
    started: Instant,
}

impl BudgetMeter {
    pub fn new(limits: BudgetLimits) -> Self {
        Self {
            limits,
            tool_calls: AtomicU32::new(0),
            tokens: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn limits(&self) -> &BudgetLimits {
        &self.limits
    }

    /// True unless any tracked quantity has reached its limit.
    pub fn can_continue(&self) -> bool {
        self.tool_calls.load(Ordering::SeqCst) < self.limits.max_tool_calls
            && self.tokens.load(Ordering::SeqCst) < self.limits.max_tokens
            && self.elapsed_secs() < self.limits.max_wall_time_secs
    }

    /// Explain which quantity is exhausted, if any.
    pub fn exhaustion(&self) -> Option<BudgetError> {
        let tool_calls = self.tool_calls.load(Ordering::SeqCst);
        if tool_calls >= self.limits.max_tool_calls {
            return Some(BudgetError::Exceeded {
                kind: DebitKind::ToolCalls,
                used: u64::from(tool_calls),
                limit: u64::from(self.limits.max_tool_calls),
            });
        }
        let tokens = self.tokens.load(Ordering::SeqCst);
        if tokens >= self.limits.max_tokens {
            return Some(BudgetError::Exceeded {
                kind: DebitKind::Tokens,
                used: tokens,
                limit: self.limits.max_tokens,
            });
        }
        let elapsed = self.elapsed_secs();
        if elapsed >= self.limits.max_wall_time_secs {
            return Some(BudgetError::WallTimeExceeded {
                elapsed_secs: elapsed,
                limit_secs: self.limits.max_wall_time_secs,
            });
        }
        None
    }

    /// Atomically add `amount` to the counter for `kind`.
    ///
    /// Rejected whole if the result would exceed the limit; the counter is
    /// left untouched in that case.
    pub fn debit(&self, kind: DebitKind, amount: u64) -> Result<(), BudgetError> {
        match kind {
            DebitKind::ToolCalls => {
                let limit = self.limits.max_tool_calls;
                let amount = u32::try_from(amount).unwrap_or(u32::MAX);
                self.tool_calls
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                        used.checked_add(amount).filter(|next| *next <= limit)
                    })
                    .map(|_| ())
                    .map_err(|used| BudgetError::Exceeded {
                        kind,
                        used: u64::from(used),
                        limit: u64::from(limit),
                    })
            }
            DebitKind::Tokens => {
                let limit = self.limits.max_tokens;
                self.tokens
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                        used.checked_add(amount).filter(|next| *next <= limit)
                    })
                    .map(|_| ())
                    .map_err(|used| BudgetError::Exceeded { kind, used, limit })
            }
        }
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> BudgetSnapshot {
        BudgetSnapshot {
            tool_calls_used: self.tool_calls.load(Ordering::SeqCst),
            max_tool_calls: self.limits.max_tool_calls,
            tokens_used: self.tokens.load(Ordering::SeqCst),
            max_tokens: self.limits.max_tokens,
            elapsed_secs: self.elapsed_secs(),
            max_wall_time_secs: self.limits.max_wall_time_secs,
        }
    }
}
