//! Processing context: the injected dependencies every stage sees.

use std::sync::Arc;

use rmk_ai::NarrativeBackend;
use rmk_media::{MediaToolkit, NarrationSynthesizer, SceneDetector, SpeakerLabeler, Transcriber};
use rmk_models::{JobId, Stage};
use rmk_queue::{JobQueue, QueueJob, StatusBoard};
use rmk_store::Store;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Shared dependencies for dispatchers and stage executors.
///
/// Everything external is a trait object, so tests assemble a context from
/// in-memory fakes and production wires the real collaborators in `main`.
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub store: Arc<dyn Store>,
    pub queue: Arc<dyn JobQueue>,
    pub board: StatusBoard,
    pub detector: Arc<dyn SceneDetector>,
    pub transcriber: Arc<dyn Transcriber>,
    pub labeler: Arc<dyn SpeakerLabeler>,
    pub backend: Arc<dyn NarrativeBackend>,
    pub synthesizer: Arc<dyn NarrationSynthesizer>,
    pub media: Arc<dyn MediaToolkit>,
}

impl ProcessingContext {
    /// Register a job on the status board and enqueue it.
    ///
    /// The single entry point for getting work into the system; both the
    /// pipeline facade and stage chaining go through it, so a job is always
    /// observable before it is runnable.
    pub async fn submit_job(&self, job: QueueJob) -> WorkerResult<(Stage, JobId)> {
        let stage = job.stage();
        let job_id = job.job_id().clone();
        self.board.register(stage, job_id.clone()).await;
        self.queue.enqueue(job).await?;
        Ok((stage, job_id))
    }
}

/// Progress reporting for one job attempt.
///
/// Thin handle over the status board; the board enforces monotonicity
/// within the attempt.
#[derive(Clone)]
pub struct ProgressHandle {
    board: StatusBoard,
    stage: Stage,
    job_id: JobId,
}

impl ProgressHandle {
    pub fn new(board: StatusBoard, stage: Stage, job_id: JobId) -> Self {
        Self {
            board,
            stage,
            job_id,
        }
    }

    pub async fn set(&self, progress: u8) {
        self.board
            .set_progress(self.stage, &self.job_id, progress)
            .await;
    }
}
