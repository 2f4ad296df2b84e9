//! Language-model client boundary.
//!
//! The core never speaks a provider wire protocol; it sees only this trait.
//! Replies report their token consumption so callers can charge the run
//! budget.

use async_trait::async_trait;
use thiserror::Error;

/// Generation parameters.
#[derive(Clone, Copy, Debug)]
pub struct GenerateOptions {
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

/// One completed generation.
#[derive(Clone, Debug)]
pub struct ModelReply {
    pub text: String,
    /// Prompt plus completion tokens, as counted by the provider.
    pub tokens_used: u64,
}

#[derive(Debug, Error)]
pub enum ModelError {
    /// Transport-level failure; the stage retry policy may retry it.
    #[error("model transport failed: {0}")]
    Transport(String),
    #[error("model refused the request: {0}")]
    Refused(String),
}

/// Text-generation capability used by the built-in agents.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<ModelReply, ModelError>;
}

impl From<ModelError> for sentinel_engine::StageError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Transport(detail) => sentinel_engine::StageError::Transient { detail },
            ModelError::Refused(detail) => sentinel_engine::StageError::Fatal { detail },
        }
    }
}

/// Pull the first JSON object out of a model reply, tolerating code fences
/// and surrounding prose. Returns `None` when nothing parses.
pub(crate) fn extract_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}
