//! Job dispatcher.
//!
//! One consumer loop per stage, each with a bounded worker pool. Per job the
//! dispatcher guarantees:
//! - at most `max_attempts` attempts, with exponentially increasing backoff
//!   between them, and only for retryable errors
//! - a terminal-project guard: jobs against a COMPLETED/FAILED/cancelled
//!   project complete as recorded no-ops
//! - on success, the stage's follow-up job is enqueued only after the stage
//!   has durably recorded its transition
//! - on permanent failure, the project is driven to FAILED with a
//!   human-readable reason and the message is dead-lettered
//!
//! The chaining is what keeps the pipeline self-driving: nothing outside the
//! dispatcher polls for stage boundaries.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{watch, Semaphore};
use tracing::{error, info, warn};

use rmk_models::Stage;
use rmk_queue::{Delivery, QueueJob};

use crate::context::{ProcessingContext, ProgressHandle};
use crate::error::{WorkerError, WorkerResult};
use crate::stages;

/// Runs every stage's consumer loop against one processing context.
pub struct Dispatcher {
    ctx: Arc<ProcessingContext>,
    shutdown: watch::Sender<bool>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<ProcessingContext>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { ctx, shutdown }
    }

    pub fn context(&self) -> &Arc<ProcessingContext> {
        &self.ctx
    }

    /// Signal all stage loops to stop after their current jobs.
    pub fn shutdown(&self) {
        self.shutdown.send(true).ok();
    }

    /// Run all stage loops until shutdown.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            concurrency = self.ctx.config.stage_concurrency,
            "starting stage dispatchers"
        );

        let mut handles = Vec::new();
        for stage in Stage::ALL {
            let ctx = Arc::clone(&self.ctx);
            let shutdown_rx = self.shutdown.subscribe();
            handles.push(tokio::spawn(async move {
                stage_loop(ctx, stage, shutdown_rx).await;
            }));
        }

        for handle in handles {
            handle.await.ok();
        }

        info!("all stage dispatchers stopped");
        Ok(())
    }
}

/// Consumer loop for one stage: dequeue, admit through the pool, execute.
async fn stage_loop(
    ctx: Arc<ProcessingContext>,
    stage: Stage,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let pool = Arc::new(Semaphore::new(ctx.config.stage_concurrency));
    info!(stage = %stage, "stage loop started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let dequeued = tokio::select! {
            _ = shutdown_rx.changed() => continue,
            result = ctx.queue.dequeue(stage, ctx.config.dequeue_block) => result,
        };

        match dequeued {
            Ok(Some(delivery)) => {
                let permit = match Arc::clone(&pool).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    let _permit = permit;
                    execute_delivery(ctx, delivery).await;
                });
            }
            Ok(None) => {}
            Err(e) => {
                error!(stage = %stage, error = %e, "dequeue failed, backing off");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }

    // Drain: wait for in-flight jobs to release the pool.
    let _ = tokio::time::timeout(ctx.config.shutdown_timeout, async {
        let _ = pool
            .acquire_many(ctx.config.stage_concurrency as u32)
            .await;
    })
    .await;
    info!(stage = %stage, "stage loop stopped");
}

/// Execute one delivery to a terminal outcome.
async fn execute_delivery(ctx: Arc<ProcessingContext>, delivery: Delivery) {
    let job = delivery.job.clone();
    let stage = job.stage();
    let job_id = job.job_id().clone();

    // Jobs enqueued by another process may not be on this board yet.
    ctx.board.register(stage, job_id.clone()).await;

    // Terminal-project guard: late or duplicate jobs against a finished
    // project are no-ops, not errors.
    match ctx.store.get_project(job.project_id()).await {
        Ok(project) => {
            if !project.accepts_work() {
                info!(
                    job_id = %job_id,
                    project_id = %job.project_id(),
                    status = %project.status,
                    "project no longer accepts work, completing job as no-op"
                );
                ctx.board
                    .complete(
                        stage,
                        &job_id,
                        Some(json!({
                            "skipped": true,
                            "project_status": project.status,
                        })),
                    )
                    .await;
                ack(&ctx, stage, &delivery).await;
                return;
            }
        }
        Err(e) => {
            let reason = WorkerError::from(e).to_string();
            warn!(job_id = %job_id, reason = %reason, "job references unusable project");
            ctx.board.fail(stage, &job_id, &reason).await;
            ctx.queue.dead_letter(&delivery, &reason).await.ok();
            return;
        }
    }

    let max_attempts = ctx.config.max_attempts;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        ctx.board.begin_attempt(stage, &job_id).await;
        let progress = ProgressHandle::new(ctx.board.clone(), stage, job_id.clone());

        match stages::run(&ctx, &job, &progress).await {
            Ok(outcome) => {
                info!(job_id = %job_id, stage = %stage, attempt, "job completed");
                ctx.board
                    .complete(stage, &job_id, Some(outcome.result))
                    .await;
                ack(&ctx, stage, &delivery).await;

                // Chain only after the stage recorded its success; this is
                // the ordering guarantee between stage N and N+1.
                if let Some(next) = outcome.next {
                    chain_next(&ctx, &job, next).await;
                }
                return;
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = ctx.config.backoff_for_attempt(attempt);
                warn!(
                    job_id = %job_id,
                    stage = %stage,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                let reason = e.to_string();
                error!(
                    job_id = %job_id,
                    stage = %stage,
                    attempt,
                    error = %reason,
                    "job permanently failed"
                );
                ctx.board.fail(stage, &job_id, &reason).await;
                fail_project(&ctx, &job, &reason).await;
                ctx.queue.dead_letter(&delivery, &reason).await.ok();
                return;
            }
        }
    }
}

async fn chain_next(ctx: &ProcessingContext, job: &QueueJob, next: QueueJob) {
    let next_stage = next.stage();
    let next_id = next.job_id().clone();
    match ctx.submit_job(next).await {
        Ok(_) => {
            info!(
                from = %job.stage(),
                to = %next_stage,
                job_id = %next_id,
                project_id = %job.project_id(),
                "chained next stage"
            );
        }
        Err(e) => {
            // The stage itself succeeded; losing the chain stalls the
            // pipeline, which must surface as a project failure.
            let reason = format!("failed to enqueue {next_stage} job: {e}");
            error!(project_id = %job.project_id(), error = %e, "stage chaining failed");
            fail_project(ctx, job, &reason).await;
        }
    }
}

async fn fail_project(ctx: &ProcessingContext, job: &QueueJob, reason: &str) {
    use rmk_models::ProjectStatus;

    match ctx
        .store
        .transition_project(job.project_id(), ProjectStatus::Failed, Some(reason))
        .await
    {
        Ok(_) => {}
        Err(e) => {
            // Already terminal (a concurrent job failed first) or gone;
            // either way there is nothing further to drive.
            warn!(
                project_id = %job.project_id(),
                error = %e,
                "could not mark project failed"
            );
        }
    }
}

async fn ack(ctx: &ProcessingContext, stage: Stage, delivery: &Delivery) {
    if let Err(e) = ctx.queue.ack(stage, &delivery.message_id).await {
        error!(message_id = %delivery.message_id, error = %e, "failed to ack job");
    }
}
