//! Trace sinks.
//!
//! A sink receives every event of every run, already serialized in run
//! order. Sinks must be safe to share across concurrently executing runs;
//! per-run ordering is guaranteed by the recorder, cross-run interleaving
//! is allowed.

use sentinel_types::TraceEvent;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Failure to persist a trace event. Treated as fatal by the recorder.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("trace serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("trace write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("trace sink lock poisoned")]
    Poisoned,
}

/// Destination for recorded trace events.
pub trait TraceSink: Send + Sync {
    /// Append one event. Must be atomic per event: either the whole record
    /// is persisted or the call fails.
    fn append(&self, event: &TraceEvent) -> Result<(), SinkError>;
}

/// In-memory sink for tests and programmatic inspection.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<TraceEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl TraceSink for MemorySink {
    fn append(&self, event: &TraceEvent) -> Result<(), SinkError> {
        let mut events = self.events.lock().map_err(|_| SinkError::Poisoned)?;
        events.push(event.clone());
        Ok(())
    }
}

/// Sink that drops everything. Useful when the caller only wants the
/// in-memory Episode.
#[derive(Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn append(&self, _event: &TraceEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Newline-delimited JSON file sink, one object per event.
///
/// Writes are flushed per event so a crash loses at most the event being
/// written, never a suffix of earlier ones.
pub struct NdjsonFileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl NdjsonFileSink {
    /// Open (or create) the trace file in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSink for NdjsonFileSink {
    fn append(&self, event: &TraceEvent) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let mut file = self.file.lock().map_err(|_| SinkError::Poisoned)?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_types::{EventType, RunId, Stage};

    fn event(seq: u64) -> TraceEvent {
        TraceEvent {
            run_id: RunId::new("r-sink"),
            sequence: seq,
            timestamp: chrono::Utc::now(),
            stage: Stage::Detect,
            event_type: EventType::StageEnter,
            payload_summary: "stage=DETECT".into(),
        }
    }

    #[test]
    fn test_memory_sink_retains_order() {
        let sink = MemorySink::new();
        for seq in 0..5 {
            sink.append(&event(seq)).unwrap();
        }
        let events = sink.events();
        assert_eq!(events.len(), 5);
        assert!(events.windows(2).all(|w| w[0].sequence + 1 == w[1].sequence));
    }

    #[test]
    fn test_ndjson_sink_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join("trace.jsonl");
        let sink = NdjsonFileSink::open(&path).unwrap();
        sink.append(&event(0)).unwrap();
        sink.append(&event(1)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: TraceEvent = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.run_id, RunId::new("r-sink"));
        }
    }
}
