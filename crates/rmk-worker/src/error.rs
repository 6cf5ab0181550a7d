//! Worker error taxonomy.
//!
//! Four families, retried differently:
//! - transient collaborator errors: retried by the dispatcher's
//!   attempt/backoff policy
//! - malformed generative output: retried inside the generation loop with
//!   its own shorter budget; `Exhausted` surfaces here as terminal
//! - structural/precondition errors: terminal, never retried
//! - resource errors (missing files, io): terminal

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("project has no uploaded videos: {0}")]
    NoVideos(String),

    #[error("project {0} is already terminal")]
    ProjectTerminal(String),

    #[error("no narrative persisted for project {0}")]
    NarrativeMissing(String),

    #[error("stage failed: {0}")]
    StageFailed(String),

    #[error("store error: {0}")]
    Store(#[from] rmk_store::StoreError),

    #[error("queue error: {0}")]
    Queue(#[from] rmk_queue::QueueError),

    #[error("media error: {0}")]
    Media(#[from] rmk_media::MediaError),

    #[error("ai error: {0}")]
    Ai(#[from] rmk_ai::AiError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn stage_failed(msg: impl Into<String>) -> Self {
        Self::StageFailed(msg.into())
    }

    /// Whether the dispatcher may retry the job after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Store(e) => e.is_retryable(),
            WorkerError::Queue(_) => true,
            WorkerError::Media(e) => e.is_retryable(),
            // The generation loop owns its own retry budget; anything that
            // escapes it with `Exhausted` must not be retried again.
            WorkerError::Ai(e) => !e.is_terminal(),
            WorkerError::ProjectNotFound(_)
            | WorkerError::NoVideos(_)
            | WorkerError::ProjectTerminal(_)
            | WorkerError::NarrativeMissing(_)
            | WorkerError::StageFailed(_)
            | WorkerError::Io(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_matches_taxonomy() {
        // Transient collaborator errors retry.
        let media = WorkerError::Media(rmk_media::MediaError::ToolFailed {
            tool: "ffmpeg".into(),
            status: 1,
            stderr: "hiccup".into(),
        });
        assert!(media.is_retryable());

        // Exhausted generation is terminal.
        let exhausted = WorkerError::Ai(rmk_ai::AiError::Exhausted {
            attempts: 3,
            last_error: "invalid json".into(),
        });
        assert!(!exhausted.is_retryable());

        // A plain backend hiccup outside the loop is transient.
        let backend = WorkerError::Ai(rmk_ai::AiError::backend("connection reset"));
        assert!(backend.is_retryable());

        // Preconditions and resources never retry.
        assert!(!WorkerError::NoVideos("p1".into()).is_retryable());
        assert!(!WorkerError::Media(rmk_media::MediaError::FileMissing("/x".into())).is_retryable());
    }
}
