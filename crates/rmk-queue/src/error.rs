//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("enqueue failed: {0}")]
    EnqueueFailed(String),

    #[error("malformed job payload: {0}")]
    MalformedPayload(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn enqueue_failed(msg: impl Into<String>) -> Self {
        Self::EnqueueFailed(msg.into())
    }

    pub fn malformed_payload(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }
}
