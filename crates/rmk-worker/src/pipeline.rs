//! Pipeline facade: the operations the outside world calls.
//!
//! `start` is the external trigger that kicks off the self-driving chain;
//! everything after it is dispatcher chaining. Status queries are pure
//! reads over the project row and the job status board.

use std::sync::Arc;

use tracing::info;

use rmk_models::{JobId, JobRecord, Project, ProjectId, Stage, StatusReport};
use rmk_queue::{AnalysisJob, QueueJob};

use crate::context::ProcessingContext;
use crate::error::{WorkerError, WorkerResult};

pub struct PipelineService {
    ctx: Arc<ProcessingContext>,
}

impl PipelineService {
    pub fn new(ctx: Arc<ProcessingContext>) -> Self {
        Self { ctx }
    }

    /// Start processing a project from the beginning of the pipeline.
    ///
    /// Preconditions (terminal errors, never retried): the project exists,
    /// is not terminal or cancelled, and has at least one uploaded video.
    /// There is no resume; a project that reached FAILED starts over through
    /// this same entry point only after a fresh request.
    pub async fn start(&self, project_id: &ProjectId) -> WorkerResult<JobId> {
        let project = self.ctx.store.get_project(project_id).await?;
        if !project.accepts_work() {
            return Err(WorkerError::ProjectTerminal(project_id.to_string()));
        }

        let videos = self.ctx.store.videos_for_project(project_id).await?;
        if videos.is_empty() {
            return Err(WorkerError::NoVideos(project_id.to_string()));
        }

        let video_ids = videos.into_iter().map(|v| v.id).collect();
        let job = QueueJob::Analysis(AnalysisJob::new(project_id.clone(), video_ids));
        let (_, job_id) = self.ctx.submit_job(job).await?;

        info!(project_id = %project_id, job_id = %job_id, "processing started");
        Ok(job_id)
    }

    /// Low-level stage trigger: enqueue a job for any stage.
    ///
    /// The payload types are ids-only by construction; the executing stage
    /// reloads entity state from the store.
    pub async fn enqueue(&self, job: QueueJob) -> WorkerResult<JobId> {
        let (_, job_id) = self.ctx.submit_job(job).await?;
        Ok(job_id)
    }

    /// Request cancellation: prevents new jobs from being scheduled against
    /// the project. In-flight external work is not interrupted.
    pub async fn cancel(&self, project_id: &ProjectId) -> WorkerResult<Project> {
        let project = self.ctx.store.request_cancel(project_id).await?;
        info!(project_id = %project_id, "cancel requested");
        Ok(project)
    }

    /// Status read model: `{status, progressPercent, estimatedSecondsRemaining}`
    /// derived purely from the project's status.
    pub async fn status(&self, project_id: &ProjectId) -> WorkerResult<StatusReport> {
        let project = self.ctx.store.get_project(project_id).await?;
        Ok(project.status_report())
    }

    /// Snapshot of a submitted job: state, progress, result, failure reason.
    pub async fn job_status(&self, stage: Stage, job_id: &JobId) -> Option<JobRecord> {
        self.ctx.board.get(stage, job_id).await
    }
}
