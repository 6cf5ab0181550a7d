//! Shared data models for the Reality Maker backend.
//!
//! This crate provides Serde-serializable types for:
//! - Projects and the pipeline status state machine
//! - Videos, scenes and transcript segments
//! - The AI-authored narrative document
//! - Exports and queue job bookkeeping

pub mod export;
pub mod ids;
pub mod job;
pub mod narrative;
pub mod project;
pub mod scene;
pub mod video;

pub use export::{Export, ExportKind};
pub use ids::{ExportId, JobId, ProjectId, SceneId, VideoId};
pub use job::{JobRecord, JobState, Stage, UnknownStage};
pub use narrative::{Narrative, NarrativeStats};
pub use project::{Project, ProjectStatus, StatusReport, StyleTag};
pub use scene::{Scene, SceneError, SceneTranscript, TranscriptSegment};
pub use video::{Video, VideoProbe};
