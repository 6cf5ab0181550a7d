//! AI error types.

use thiserror::Error;

pub type AiResult<T> = Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("backend request failed: {0}")]
    Backend(String),

    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("document missing required field: {0}")]
    MissingField(String),

    #[error("generation failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl AiError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Exhaustion is terminal: the bounded generation loop already consumed
    /// its own retry budget, so the surrounding job must not retry again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AiError::Exhausted { .. } | AiError::Config(_))
    }
}
