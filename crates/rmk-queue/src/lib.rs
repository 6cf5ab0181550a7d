//! Stage job queues.
//!
//! This crate provides:
//! - Ids-only job payloads for the five pipeline stages
//! - A `JobQueue` trait with a Redis Streams implementation and an
//!   in-memory fake for tests
//! - The `StatusBoard` read model for job state, progress and one-shot
//!   completion events

pub mod error;
pub mod job;
pub mod memory;
pub mod queue;
pub mod status;

pub use error::{QueueError, QueueResult};
pub use job::{
    AnalysisJob, EditingJob, ExportJob, NarratorJob, QueueJob, ShowrunnerJob,
};
pub use memory::MemoryQueue;
pub use queue::{Delivery, JobQueue, QueueConfig, RedisQueue};
pub use status::StatusBoard;
