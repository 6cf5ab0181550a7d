//! Job status board.
//!
//! In-process read model for job state and progress, plus the one-shot
//! completion event: each job has exactly one completion waiter, taken by
//! the listener responsible for acting on the outcome.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{oneshot, Mutex, RwLock};

use rmk_models::{JobId, JobRecord, Stage};

type Key = (Stage, JobId);

struct CompletionSlot {
    sender: Option<oneshot::Sender<JobRecord>>,
    receiver: Option<oneshot::Receiver<JobRecord>>,
}

/// Registry of job records keyed by (stage, job id).
#[derive(Clone, Default)]
pub struct StatusBoard {
    records: Arc<RwLock<HashMap<Key, JobRecord>>>,
    completions: Arc<Mutex<HashMap<Key, CompletionSlot>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly submitted job in `Waiting` state. Idempotent:
    /// re-registering a known job keeps its existing record and waiter.
    pub async fn register(&self, stage: Stage, job_id: JobId) {
        let key = (stage, job_id.clone());
        {
            let mut records = self.records.write().await;
            if records.contains_key(&key) {
                return;
            }
            records.insert(key.clone(), JobRecord::new(job_id, stage));
        }
        let (sender, receiver) = oneshot::channel();
        self.completions.lock().await.insert(
            key,
            CompletionSlot {
                sender: Some(sender),
                receiver: Some(receiver),
            },
        );
    }

    /// Take the one-shot completion waiter for a job. Returns `None` if the
    /// job is unknown or the waiter was already taken.
    pub async fn take_waiter(
        &self,
        stage: Stage,
        job_id: &JobId,
    ) -> Option<oneshot::Receiver<JobRecord>> {
        let key = (stage, job_id.clone());
        self.completions
            .lock()
            .await
            .get_mut(&key)
            .and_then(|slot| slot.receiver.take())
    }

    /// Current snapshot of a job.
    pub async fn get(&self, stage: Stage, job_id: &JobId) -> Option<JobRecord> {
        let key = (stage, job_id.clone());
        self.records.read().await.get(&key).cloned()
    }

    /// Mark the start of an attempt: state active, progress reset.
    pub async fn begin_attempt(&self, stage: Stage, job_id: &JobId) {
        let key = (stage, job_id.clone());
        if let Some(record) = self.records.write().await.get_mut(&key) {
            record.begin_attempt();
        }
    }

    /// Raise progress (monotonic within the attempt).
    pub async fn set_progress(&self, stage: Stage, job_id: &JobId, progress: u8) {
        let key = (stage, job_id.clone());
        if let Some(record) = self.records.write().await.get_mut(&key) {
            record.set_progress(progress);
        }
    }

    /// Record completion and fire the one-shot event.
    pub async fn complete(&self, stage: Stage, job_id: &JobId, result: Option<Value>) {
        let key = (stage, job_id.clone());
        let snapshot = {
            let mut records = self.records.write().await;
            match records.get_mut(&key) {
                Some(record) => {
                    record.complete(result);
                    record.clone()
                }
                None => return,
            }
        };
        self.fire(key, snapshot).await;
    }

    /// Record permanent failure and fire the one-shot event.
    pub async fn fail(&self, stage: Stage, job_id: &JobId, reason: &str) {
        let key = (stage, job_id.clone());
        let snapshot = {
            let mut records = self.records.write().await;
            match records.get_mut(&key) {
                Some(record) => {
                    record.fail(reason);
                    record.clone()
                }
                None => return,
            }
        };
        self.fire(key, snapshot).await;
    }

    async fn fire(&self, key: Key, record: JobRecord) {
        if let Some(slot) = self.completions.lock().await.get_mut(&key) {
            if let Some(sender) = slot.sender.take() {
                // Nobody listening is fine; the record stays queryable.
                sender.send(record).ok();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmk_models::JobState;

    #[tokio::test]
    async fn lifecycle_is_observable() {
        let board = StatusBoard::new();
        let job_id = JobId::new();
        board.register(Stage::Analysis, job_id.clone()).await;

        let record = board.get(Stage::Analysis, &job_id).await.unwrap();
        assert_eq!(record.state, JobState::Waiting);

        board.begin_attempt(Stage::Analysis, &job_id).await;
        board.set_progress(Stage::Analysis, &job_id, 40).await;
        board.set_progress(Stage::Analysis, &job_id, 10).await;

        let record = board.get(Stage::Analysis, &job_id).await.unwrap();
        assert_eq!(record.state, JobState::Active);
        assert_eq!(record.progress, 40);

        board
            .complete(Stage::Analysis, &job_id, Some(serde_json::json!({"scenes": 5})))
            .await;
        let record = board.get(Stage::Analysis, &job_id).await.unwrap();
        assert_eq!(record.state, JobState::Completed);
        assert_eq!(record.progress, 100);
    }

    #[tokio::test]
    async fn completion_event_fires_once_for_one_listener() {
        let board = StatusBoard::new();
        let job_id = JobId::new();
        board.register(Stage::Showrunner, job_id.clone()).await;

        let waiter = board.take_waiter(Stage::Showrunner, &job_id).await.unwrap();
        // Exactly one listener: second take yields nothing.
        assert!(board.take_waiter(Stage::Showrunner, &job_id).await.is_none());

        board.fail(Stage::Showrunner, &job_id, "generation exhausted").await;

        let record = waiter.await.unwrap();
        assert_eq!(record.state, JobState::Failed);
        assert_eq!(
            record.failure_reason.as_deref(),
            Some("generation exhausted")
        );
    }
}
