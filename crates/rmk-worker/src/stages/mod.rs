//! Stage executors.
//!
//! One executor per pipeline stage. Each is a sequence of sub-steps with
//! cumulative progress reporting; the first failing sub-step aborts the
//! executor and the dispatcher drives the project to FAILED. Data already
//! persisted by earlier sub-steps is not rolled back, but the pipeline never
//! proceeds past a failed stage.

pub mod analysis;
pub mod editing;
pub mod export;
pub mod narrator;
pub mod showrunner;

use serde_json::Value;

use rmk_queue::QueueJob;

use crate::context::{ProcessingContext, ProgressHandle};
use crate::error::WorkerResult;

/// What a successful stage hands back to the dispatcher.
#[derive(Debug)]
pub struct StageOutcome {
    /// Result payload stored on the job record.
    pub result: Value,
    /// Next stage's job, enqueued by the dispatcher only after this stage's
    /// transition has been durably recorded.
    pub next: Option<QueueJob>,
}

/// Run the executor matching the job's stage.
pub async fn run(
    ctx: &ProcessingContext,
    job: &QueueJob,
    progress: &ProgressHandle,
) -> WorkerResult<StageOutcome> {
    match job {
        QueueJob::Analysis(j) => analysis::run(ctx, j, progress).await,
        QueueJob::Showrunner(j) => showrunner::run(ctx, j, progress).await,
        QueueJob::Narrator(j) => narrator::run(ctx, j, progress).await,
        QueueJob::Editing(j) => editing::run(ctx, j, progress).await,
        QueueJob::Export(j) => export::run(ctx, j, progress).await,
    }
}
