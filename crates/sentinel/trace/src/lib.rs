//! Sentinel Trace - the replayable record of every run
//!
//! Observability here is a hard requirement, not best-effort: a failed write
//! to the trace is fatal to the run. Each run owns a [`RunTrace`] with a
//! private, gapless sequence counter; events stream to a pluggable
//! [`TraceSink`] as they are recorded and are retained in memory for the
//! final [`Episode`](sentinel_types::Episode).

#![deny(unsafe_code)]

mod recorder;
mod sink;

pub use recorder::{RunTrace, TraceError};
pub use sink::{MemorySink, NdjsonFileSink, NullSink, SinkError, TraceSink};
