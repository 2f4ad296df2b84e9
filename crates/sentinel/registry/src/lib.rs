//! Sentinel Registry - the only path to side effects
//!
//! Every named capability a stage handler may invoke is registered here
//! once, at startup, with a JSON schema, a risk level, and a required
//! permission. Invocation walks a fixed gauntlet: existence, schema,
//! permission, budget - in that order - and every decision, success or
//! denial, lands in the run's trace. The registry never silently swallows
//! a denial.

#![deny(unsafe_code)]

mod error;
mod handler;
mod registry;
mod spec;

pub use error::RegistryError;
pub use handler::{ToolHandler, ToolOutput};
pub use registry::{InvocationContext, ToolRegistry};
pub use spec::ToolSpec;
