//! Queue job bookkeeping: stages, job state and the observable job record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::ids::JobId;

/// One named step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analysis,
    Showrunner,
    Narrator,
    Editing,
    Export,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Analysis,
        Stage::Showrunner,
        Stage::Narrator,
        Stage::Editing,
        Stage::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Analysis => "analysis",
            Stage::Showrunner => "showrunner",
            Stage::Narrator => "narrator",
            Stage::Editing => "editing",
            Stage::Export => "export",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analysis" => Ok(Stage::Analysis),
            "showrunner" => Ok(Stage::Showrunner),
            "narrator" => Ok(Stage::Narrator),
            "editing" => Ok(Stage::Editing),
            "export" => Ok(Stage::Export),
            other => Err(UnknownStage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage: {0}")]
pub struct UnknownStage(pub String);

/// Observable state of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting in queue.
    #[default]
    Waiting,
    /// Being processed by a worker.
    Active,
    /// Finished successfully.
    Completed,
    /// Permanently failed (all attempts exhausted or non-retryable).
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a job visible to observers while it runs and after it ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub stage: Stage,
    pub state: JobState,
    /// Attempt number, 1-based once the job becomes active.
    pub attempt: u32,
    /// Non-decreasing within an attempt; reset when a new attempt starts.
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(job_id: JobId, stage: Stage) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            stage,
            state: JobState::Waiting,
            attempt: 0,
            progress: 0,
            result: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Begin a new attempt: state becomes active, progress resets.
    pub fn begin_attempt(&mut self) {
        self.attempt += 1;
        self.state = JobState::Active;
        self.progress = 0;
        self.updated_at = Utc::now();
    }

    /// Raise progress. Clamped to 100; never moves backwards within an attempt.
    pub fn set_progress(&mut self, progress: u8) {
        let progress = progress.min(100);
        if progress > self.progress {
            self.progress = progress;
            self.updated_at = Utc::now();
        }
    }

    /// Mark completed with an optional result payload. One-time.
    pub fn complete(&mut self, result: Option<Value>) {
        self.state = JobState::Completed;
        self.progress = 100;
        self.result = result;
        self.updated_at = Utc::now();
    }

    /// Mark permanently failed. One-time.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.state = JobState::Failed;
        self.failure_reason = Some(reason.into());
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_roundtrips_through_str() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("render".parse::<Stage>().is_err());
    }

    #[test]
    fn progress_is_monotonic_within_attempt() {
        let mut record = JobRecord::new(JobId::new(), Stage::Analysis);
        record.begin_attempt();
        record.set_progress(40);
        record.set_progress(20);
        assert_eq!(record.progress, 40);
        record.set_progress(90);
        assert_eq!(record.progress, 90);
        record.set_progress(250);
        assert_eq!(record.progress, 100);
    }

    #[test]
    fn new_attempt_resets_progress() {
        let mut record = JobRecord::new(JobId::new(), Stage::Showrunner);
        record.begin_attempt();
        record.set_progress(70);
        record.begin_attempt();
        assert_eq!(record.attempt, 2);
        assert_eq!(record.progress, 0);
    }

    #[test]
    fn completion_is_terminal_with_full_progress() {
        let mut record = JobRecord::new(JobId::new(), Stage::Export);
        record.begin_attempt();
        record.complete(None);
        assert_eq!(record.state, JobState::Completed);
        assert_eq!(record.progress, 100);
        assert!(record.state.is_terminal());
    }
}
