//! The `JobQueue` trait and its Redis Streams implementation.
//!
//! One stream per stage keeps stage worker pools independent: Analysis
//! workers never contend with Export workers for messages. Messages are
//! acknowledged only after the dispatcher reaches a terminal outcome for
//! the job, giving at-least-once delivery.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use rmk_models::Stage;

use crate::error::{QueueError, QueueResult};
use crate::job::QueueJob;

/// A dequeued job plus the backend bookkeeping needed to ack it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message_id: String,
    pub job: QueueJob,
}

/// Queue abstraction the dispatcher works against.
#[async_trait]
pub trait JobQueue: Send + Sync + 'static {
    /// Append a job to its stage's queue.
    async fn enqueue(&self, job: QueueJob) -> QueueResult<()>;

    /// Pop the next job for a stage, waiting up to `block` for one to
    /// arrive. Returns `None` on timeout.
    async fn dequeue(&self, stage: Stage, block: Duration) -> QueueResult<Option<Delivery>>;

    /// Acknowledge a message after a terminal outcome.
    async fn ack(&self, stage: Stage, message_id: &str) -> QueueResult<()>;

    /// Move a permanently failed delivery to the dead letter queue.
    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> QueueResult<()>;

    /// Number of jobs waiting on a stage's queue.
    async fn len(&self, stage: Stage) -> QueueResult<u64>;
}

/// Redis queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    /// Stream key prefix; the stage name is appended.
    pub stream_prefix: String,
    pub consumer_group: String,
    pub dlq_stream: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_prefix: "rmk:jobs".to_string(),
            consumer_group: "rmk:workers".to_string(),
            dlq_stream: "rmk:dlq".to_string(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_prefix: std::env::var("QUEUE_STREAM_PREFIX")
                .unwrap_or_else(|_| "rmk:jobs".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "rmk:workers".to_string()),
            dlq_stream: std::env::var("QUEUE_DLQ_STREAM")
                .unwrap_or_else(|_| "rmk:dlq".to_string()),
        }
    }
}

/// Redis Streams job queue.
pub struct RedisQueue {
    client: redis::Client,
    config: QueueConfig,
    consumer_name: String,
}

impl RedisQueue {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let consumer_name = format!("worker-{}", uuid::Uuid::new_v4());
        Ok(Self {
            client,
            config,
            consumer_name,
        })
    }

    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    fn stream_key(&self, stage: Stage) -> String {
        format!("{}:{}", self.config.stream_prefix, stage)
    }

    /// Create the consumer group for every stage stream (idempotent).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        for stage in Stage::ALL {
            let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
                .arg("CREATE")
                .arg(self.stream_key(stage))
                .arg(&self.config.consumer_group)
                .arg("$")
                .arg("MKSTREAM")
                .query_async(&mut conn)
                .await;

            match result {
                Ok(_) => info!(stage = %stage, "created consumer group"),
                Err(e) if e.to_string().contains("BUSYGROUP") => {
                    debug!(stage = %stage, "consumer group already exists");
                }
                Err(e) => return Err(QueueError::Redis(e)),
            }
        }

        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn enqueue(&self, job: QueueJob) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(&job)?;
        let message_id: String = redis::cmd("XADD")
            .arg(self.stream_key(job.stage()))
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("key")
            .arg(job.idempotency_key())
            .query_async(&mut conn)
            .await?;

        info!(
            job_id = %job.job_id(),
            stage = %job.stage(),
            message_id = %message_id,
            "enqueued job"
        );
        Ok(())
    }

    async fn dequeue(&self, stage: Stage, block: Duration) -> QueueResult<Option<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.consumer_name)
            .arg("COUNT")
            .arg(1)
            .arg("BLOCK")
            .arg(block.as_millis() as u64)
            .arg("STREAMS")
            .arg(self.stream_key(stage))
            .arg(">")
            .query_async(&mut conn)
            .await?;

        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();

                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    let payload_str = String::from_utf8_lossy(payload);
                    match serde_json::from_str::<QueueJob>(&payload_str) {
                        Ok(job) => {
                            debug!(job_id = %job.job_id(), stage = %stage, "dequeued job");
                            return Ok(Some(Delivery { message_id, job }));
                        }
                        Err(e) => {
                            warn!(message_id = %message_id, error = %e, "malformed job payload, acking");
                            self.ack(stage, &message_id).await.ok();
                        }
                    }
                }
            }
        }

        Ok(None)
    }

    async fn ack(&self, stage: Stage, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let stream = self.stream_key(stage);

        redis::cmd("XACK")
            .arg(&stream)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;
        redis::cmd("XDEL")
            .arg(&stream)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!(message_id = %message_id, "acknowledged job");
        Ok(())
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(&delivery.job)?;
        redis::cmd("XADD")
            .arg(&self.config.dlq_stream)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(reason)
            .arg("original_id")
            .arg(&delivery.message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(delivery.job.stage(), &delivery.message_id).await?;

        warn!(job_id = %delivery.job.job_id(), reason = %reason, "moved job to DLQ");
        Ok(())
    }

    async fn len(&self, stage: Stage) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(self.stream_key(stage)).await?;
        Ok(len)
    }
}
