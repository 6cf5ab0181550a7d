//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use rmk_models::ProjectId;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Concurrent jobs per stage pool.
    pub stage_concurrency: usize,
    /// Maximum attempts per job, counting the first.
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts (doubles per attempt).
    pub backoff_base: Duration,
    /// How long a dequeue blocks waiting for work.
    pub dequeue_block: Duration,
    /// Root directory for uploads, temp files and exports.
    pub storage_dir: PathBuf,
    /// Graceful shutdown budget for in-flight jobs.
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            stage_concurrency: 2,
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            dequeue_block: Duration::from_secs(1),
            storage_dir: PathBuf::from("./storage"),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            stage_concurrency: std::env::var("WORKER_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.stage_concurrency),
            max_attempts: std::env::var("WORKER_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts),
            backoff_base: Duration::from_millis(
                std::env::var("WORKER_BACKOFF_BASE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            dequeue_block: defaults.dequeue_block,
            storage_dir: std::env::var("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Backoff delay before the attempt following `attempt` (1-based).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Scratch space for intermediate files.
    pub fn temp_dir(&self) -> PathBuf {
        self.storage_dir.join("temp")
    }

    /// Per-project working directory for clips and narration audio.
    pub fn work_dir(&self, project_id: &ProjectId) -> PathBuf {
        self.temp_dir().join(project_id.as_str())
    }

    /// Final export destination.
    pub fn exports_dir(&self) -> PathBuf {
        self.storage_dir.join("exports")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = WorkerConfig::default();
        assert_eq!(config.backoff_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.backoff_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.backoff_for_attempt(3), Duration::from_secs(8));
    }
}
