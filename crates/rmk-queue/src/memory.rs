//! In-memory queue fake for tests and single-process development.
//!
//! Same trait, same at-least-once discipline (a dequeued job stays
//! unacked until the dispatcher reaches a terminal outcome), but delivery
//! state lives in process memory.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use rmk_models::Stage;

use crate::error::QueueResult;
use crate::job::QueueJob;
use crate::queue::{Delivery, JobQueue};

#[derive(Default)]
struct Inner {
    queues: HashMap<Stage, VecDeque<QueueJob>>,
    /// Delivered but not yet acknowledged, by message id.
    in_flight: HashMap<String, QueueJob>,
    dead_letters: Vec<(QueueJob, String)>,
    next_message_id: u64,
}

/// In-memory job queue.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dead-lettered jobs with their failure reasons, for assertions.
    pub async fn dead_letters(&self) -> Vec<(QueueJob, String)> {
        self.inner.lock().await.dead_letters.clone()
    }

    /// Jobs delivered but not yet acknowledged, for assertions.
    pub async fn in_flight_count(&self) -> usize {
        self.inner.lock().await.in_flight.len()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: QueueJob) -> QueueResult<()> {
        {
            let mut inner = self.inner.lock().await;
            inner.queues.entry(job.stage()).or_default().push_back(job);
        }
        self.notify.notify_waiters();
        Ok(())
    }

    async fn dequeue(&self, stage: Stage, block: Duration) -> QueueResult<Option<Delivery>> {
        let deadline = tokio::time::Instant::now() + block;
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(job) = inner.queues.entry(stage).or_default().pop_front() {
                    inner.next_message_id += 1;
                    let message_id = format!("mem-{}", inner.next_message_id);
                    inner.in_flight.insert(message_id.clone(), job.clone());
                    return Ok(Some(Delivery { message_id, job }));
                }
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep_until(deadline) => {}
            }
        }
    }

    async fn ack(&self, _stage: Stage, message_id: &str) -> QueueResult<()> {
        let mut inner = self.inner.lock().await;
        inner.in_flight.remove(message_id);
        Ok(())
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> QueueResult<()> {
        let mut inner = self.inner.lock().await;
        inner.in_flight.remove(&delivery.message_id);
        inner
            .dead_letters
            .push((delivery.job.clone(), reason.to_string()));
        Ok(())
    }

    async fn len(&self, stage: Stage) -> QueueResult<u64> {
        let inner = self.inner.lock().await;
        Ok(inner
            .queues
            .get(&stage)
            .map(|q| q.len() as u64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{AnalysisJob, NarratorJob};
    use rmk_models::ProjectId;

    #[tokio::test]
    async fn fifo_per_stage() {
        let queue = MemoryQueue::new();
        let first = QueueJob::Analysis(AnalysisJob::new(ProjectId::new(), vec![]));
        let second = QueueJob::Analysis(AnalysisJob::new(ProjectId::new(), vec![]));
        let other_stage = QueueJob::Narrator(NarratorJob::new(ProjectId::new()));

        queue.enqueue(first.clone()).await.unwrap();
        queue.enqueue(other_stage.clone()).await.unwrap();
        queue.enqueue(second.clone()).await.unwrap();

        let d1 = queue
            .dequeue(Stage::Analysis, Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(d1.job.job_id(), first.job_id());

        let d2 = queue
            .dequeue(Stage::Analysis, Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(d2.job.job_id(), second.job_id());

        // Analysis queue drained; narrator job still waiting on its own queue.
        assert!(queue
            .dequeue(Stage::Analysis, Duration::from_millis(10))
            .await
            .unwrap()
            .is_none());
        assert_eq!(queue.len(Stage::Narrator).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ack_clears_in_flight() {
        let queue = MemoryQueue::new();
        queue
            .enqueue(QueueJob::Narrator(NarratorJob::new(ProjectId::new())))
            .await
            .unwrap();

        let delivery = queue
            .dequeue(Stage::Narrator, Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(queue.in_flight_count().await, 1);

        queue
            .ack(Stage::Narrator, &delivery.message_id)
            .await
            .unwrap();
        assert_eq!(queue.in_flight_count().await, 0);
    }

    #[tokio::test]
    async fn dead_letter_records_reason() {
        let queue = MemoryQueue::new();
        queue
            .enqueue(QueueJob::Narrator(NarratorJob::new(ProjectId::new())))
            .await
            .unwrap();
        let delivery = queue
            .dequeue(Stage::Narrator, Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();

        queue.dead_letter(&delivery, "backend exploded").await.unwrap();

        let dlq = queue.dead_letters().await;
        assert_eq!(dlq.len(), 1);
        assert_eq!(dlq[0].1, "backend exploded");
        assert_eq!(queue.in_flight_count().await, 0);
    }

    #[tokio::test]
    async fn blocking_dequeue_wakes_on_enqueue() {
        let queue = MemoryQueue::new();
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .dequeue(Stage::Analysis, Duration::from_secs(5))
                    .await
                    .unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue
            .enqueue(QueueJob::Analysis(AnalysisJob::new(ProjectId::new(), vec![])))
            .await
            .unwrap();

        let delivery = waiter.await.unwrap();
        assert!(delivery.is_some());
    }
}
