//! Sentinel Tools - simulated diagnostic backends
//!
//! Deterministic read-only stand-ins for the metrics store, log index,
//! topology service, and change ledger. They let the full pipeline run
//! offline; production deployments register real backends in their place.

#![deny(unsafe_code)]

mod simulated;

pub use simulated::{
    register_builtin_tools, GetChangeHistory, QueryLogs, QueryMetrics, QueryTopology,
};
