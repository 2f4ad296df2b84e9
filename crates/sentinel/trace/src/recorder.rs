//! Per-run trace recorder.

use crate::sink::{SinkError, TraceSink};
use sentinel_types::{
    Episode, EventType, Evidence, Plan, Report, RunId, RunStatus, Stage, Task, TraceEvent,
};
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;

/// Trace recording failure. Observability is a hard requirement, so the
/// engine treats any of these as fatal to the run.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace sink rejected event: {0}")]
    Sink(#[from] SinkError),
    #[error("trace state lock poisoned")]
    Poisoned,
}

struct TraceLog {
    next_sequence: u64,
    events: Vec<TraceEvent>,
}

/// Append-only event log for one run.
///
/// Sequence numbers are assigned under the same lock that appends to the log
/// and writes to the sink, so they are strictly increasing with no gaps and
/// the persisted order matches the assigned order. The recorder is shared
/// across the stage handler and the registry via `Arc`.
pub struct RunTrace {
    run_id: RunId,
    sink: Arc<dyn TraceSink>,
    log: Mutex<TraceLog>,
    started_at: chrono::DateTime<chrono::Utc>,
    finalized: OnceLock<Episode>,
}

impl RunTrace {
    pub fn new(run_id: RunId, sink: Arc<dyn TraceSink>) -> Self {
        Self {
            run_id,
            sink,
            log: Mutex::new(TraceLog {
                next_sequence: 0,
                events: Vec::new(),
            }),
            started_at: chrono::Utc::now(),
            finalized: OnceLock::new(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at
    }

    /// Record one event, returning its sequence number.
    ///
    /// Never fails for a well-formed event unless the sink does; a sink
    /// failure must terminate the run.
    pub fn record(
        &self,
        stage: Stage,
        event_type: EventType,
        payload_summary: impl Into<String>,
    ) -> Result<u64, TraceError> {
        let mut log = self.log.lock().map_err(|_| TraceError::Poisoned)?;
        let event = TraceEvent {
            run_id: self.run_id.clone(),
            sequence: log.next_sequence,
            timestamp: chrono::Utc::now(),
            stage,
            event_type,
            payload_summary: payload_summary.into(),
        };
        // Sink write happens under the lock: an event is either assigned a
        // sequence number and persisted, or neither.
        self.sink.append(&event)?;
        log.next_sequence += 1;
        let sequence = event.sequence;
        log.events.push(event);
        Ok(sequence)
    }

    /// Snapshot of all events recorded so far, in sequence order.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.log.lock().map(|l| l.events.clone()).unwrap_or_default()
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> u64 {
        self.log.lock().map(|l| l.next_sequence).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assemble the immutable Episode for this run.
    ///
    /// Idempotent: the first call freezes the record (including
    /// `completed_at`); later calls return the identical Episode.
    pub fn finalize(
        &self,
        task: Task,
        evidence: Vec<Evidence>,
        plan: Option<Plan>,
        report: Report,
        status: RunStatus,
    ) -> Episode {
        self.finalized
            .get_or_init(|| Episode {
                run_id: self.run_id.clone(),
                task,
                events: self.events(),
                evidence,
                plan,
                report,
                status,
                started_at: self.started_at,
                completed_at: chrono::Utc::now(),
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use sentinel_types::{ReportStatus, TaskId, TaskSource};

    fn task() -> Task {
        Task::new(TaskId::new("t-trace"), TaskSource::Alert, "latency spike")
    }

    fn report() -> Report {
        Report {
            summary: "done".into(),
            hypotheses: vec![],
            actions: vec![],
            risks: vec![],
            rollback_plan: vec![],
            recommendations: vec![],
            status: ReportStatus::Success,
            metrics: Default::default(),
        }
    }

    #[test]
    fn test_sequence_strictly_increasing_no_gaps() {
        let trace = RunTrace::new(RunId::generate(), Arc::new(MemorySink::new()));
        for _ in 0..10 {
            trace
                .record(Stage::Triage, EventType::PolicyDecision, "x")
                .unwrap();
        }
        let events = trace.events();
        assert_eq!(events.len(), 10);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.sequence, i as u64);
        }
    }

    #[test]
    fn test_concurrent_records_stay_gapless() {
        let trace = Arc::new(RunTrace::new(RunId::generate(), Arc::new(MemorySink::new())));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let trace = Arc::clone(&trace);
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    trace
                        .record(Stage::Investigation, EventType::ToolCall, "t")
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let events = trace.events();
        assert_eq!(events.len(), 400);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.sequence, i as u64);
        }
    }

    #[test]
    fn test_finalize_idempotent() {
        let trace = RunTrace::new(RunId::generate(), Arc::new(MemorySink::new()));
        trace.record(Stage::Detect, EventType::StageEnter, "x").unwrap();

        let first = trace.finalize(task(), vec![], None, report(), RunStatus::Completed);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = trace.finalize(task(), vec![], None, report(), RunStatus::Completed);

        let a = serde_json::to_vec(&first).unwrap();
        let b = serde_json::to_vec(&second).unwrap();
        assert_eq!(a, b);
    }
}
