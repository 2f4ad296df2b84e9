//! Sentinel Policy - the decision layer
//!
//! Three concerns, all configuration-driven:
//! - [`BudgetMeter`]: per-run consumption against the task's limits, with
//!   atomic all-or-nothing debits.
//! - [`RetryPolicies`]: bounded retry with backoff per stage. Never
//!   unbounded; termination is guaranteed by construction.
//! - [`ApprovalPolicy`]: the configurable risk threshold that decides when a
//!   plan needs an approval gate. The threshold is a parameter, not a
//!   hardcoded rule.

#![deny(unsafe_code)]

mod approval;
mod budget;
mod retry;

pub use approval::ApprovalPolicy;
pub use budget::{BudgetError, BudgetMeter, BudgetSnapshot, DebitKind};
pub use retry::{RetryPolicies, RetryPolicy};
