//! Media error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: i32,
        stderr: String,
    },

    #[error("{tool} timed out after {timeout:?}")]
    Timeout { tool: String, timeout: Duration },

    #[error("file not found: {0}")]
    FileMissing(PathBuf),

    #[error("unparseable {tool} output: {message}")]
    BadOutput { tool: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MediaError {
    pub fn bad_output(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadOutput {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Process hiccups and timeouts are worth retrying; missing files and
    /// malformed tool output are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MediaError::ToolFailed { .. } | MediaError::Timeout { .. })
    }
}
