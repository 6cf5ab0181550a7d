//! Store error types.

use thiserror::Error;

use rmk_models::{ProjectStatus, SceneId};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("scene not found: {0}")]
    SceneNotFound(SceneId),

    #[error("illegal status transition {from} -> {to}")]
    IllegalTransition {
        from: ProjectStatus,
        to: ProjectStatus,
    },

    #[error("scene {0} already has a different transcript attached")]
    TranscriptConflict(SceneId),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl StoreError {
    /// Transient errors worth retrying at the job level. Everything else is
    /// a structural problem retries cannot fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Redis(_))
    }
}
