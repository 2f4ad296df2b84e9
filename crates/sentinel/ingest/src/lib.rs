//! Sentinel Ingest - turning raw payloads into Tasks
//!
//! One normalizer per entry channel: monitoring alerts, tickets, operator
//! chat, and scheduled cron triggers. All of them produce the same
//! normalized [`Task`](sentinel_types::Task), which is the only shape the
//! engine accepts.

#![deny(unsafe_code)]

mod normalize;

pub use normalize::{ingest, IngestError};
