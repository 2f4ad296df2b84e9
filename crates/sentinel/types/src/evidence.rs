//! Investigation evidence.

use serde::{Deserialize, Serialize};

/// One observation collected during investigation.
///
/// Evidence is append-only: the run accumulates entries and never mutates
/// them after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Evidence {
    /// Tool name that produced this observation, or "manual".
    pub source: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Opaque payload as returned by the source.
    pub data: serde_json::Value,
    /// Confidence in [0, 1]; clamped on construction.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl Evidence {
    pub fn new(source: impl Into<String>, data: serde_json::Value, confidence: f64) -> Self {
        Self {
            source: source.into(),
            timestamp: chrono::Utc::now(),
            data,
            confidence: confidence.clamp(0.0, 1.0),
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}
