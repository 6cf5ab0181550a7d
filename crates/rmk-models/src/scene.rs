//! Scenes and transcript segments.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{ProjectId, SceneId, VideoId};

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("invalid scene bounds: start {start} must be >= 0 and < end {end}")]
    InvalidBounds { start: f64, end: f64 },
}

/// One transcribed utterance, produced by the transcriber for a single
/// video. Transient: consumed by the association engine, persisted only as
/// part of a `SceneTranscript`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Video this segment was transcribed from. Times are relative to it.
    pub video_id: VideoId,
    pub start: f64,
    pub end: f64,
    pub speaker: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Transcript data attached to a scene by the association engine.
///
/// Written exactly once per scene; re-running the analysis stage replaces it
/// with an identical value, keeping the write idempotent on retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneTranscript {
    /// Chronological `speaker: text` lines.
    pub text: String,
    /// Distinct speakers heard in the scene.
    pub speakers: BTreeSet<String>,
    /// Detected emotions in chronological order. Omitted entirely when no
    /// segment carried emotion data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotions: Option<Vec<String>>,
    /// Raw segments the scene was built from.
    pub segments: Vec<TranscriptSegment>,
}

/// A contiguous time range of a video treated as one narrative unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub video_id: VideoId,
    pub project_id: ProjectId,
    /// Seconds, relative to the owning video.
    pub start_time: f64,
    pub end_time: f64,
    /// Detector-assigned importance in [0, 1].
    pub importance_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<SceneTranscript>,
}

impl Scene {
    /// Create a scene, enforcing `0 <= start_time < end_time`.
    pub fn new(
        video_id: VideoId,
        project_id: ProjectId,
        start_time: f64,
        end_time: f64,
        importance_score: f64,
    ) -> Result<Self, SceneError> {
        if !(start_time >= 0.0 && start_time < end_time) {
            return Err(SceneError::InvalidBounds {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            id: SceneId::new(),
            video_id,
            project_id,
            start_time,
            end_time,
            importance_score: importance_score.clamp(0.0, 1.0),
            transcript: None,
        })
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whether the segment lies fully within this scene's time range.
    pub fn contains(&self, segment: &TranscriptSegment) -> bool {
        segment.video_id == self.video_id
            && self.start_time <= segment.start
            && segment.end <= self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(video_id: &VideoId, start: f64, end: f64) -> TranscriptSegment {
        TranscriptSegment {
            video_id: video_id.clone(),
            start,
            end,
            speaker: "person_1".into(),
            text: "hello".into(),
            emotion: None,
            confidence: None,
        }
    }

    #[test]
    fn scene_bounds_are_enforced() {
        let v = VideoId::new();
        let p = ProjectId::new();
        assert!(Scene::new(v.clone(), p.clone(), 0.0, 10.0, 0.5).is_ok());
        assert!(Scene::new(v.clone(), p.clone(), 10.0, 10.0, 0.5).is_err());
        assert!(Scene::new(v.clone(), p.clone(), 12.0, 10.0, 0.5).is_err());
        assert!(Scene::new(v, p, -1.0, 10.0, 0.5).is_err());
    }

    #[test]
    fn importance_is_clamped() {
        let scene = Scene::new(VideoId::new(), ProjectId::new(), 0.0, 5.0, 1.7).unwrap();
        assert_eq!(scene.importance_score, 1.0);
    }

    #[test]
    fn containment_requires_same_video_and_full_range() {
        let v = VideoId::new();
        let scene = Scene::new(v.clone(), ProjectId::new(), 10.0, 20.0, 0.5).unwrap();

        assert!(scene.contains(&segment(&v, 10.0, 20.0)));
        assert!(scene.contains(&segment(&v, 12.0, 15.0)));
        // Straddles the boundary: attributed to neither scene.
        assert!(!scene.contains(&segment(&v, 8.0, 12.0)));
        assert!(!scene.contains(&segment(&v, 18.0, 22.0)));
        // Same times, different video.
        assert!(!scene.contains(&segment(&VideoId::new(), 12.0, 15.0)));
    }

    #[test]
    fn empty_emotions_are_omitted_from_wire_form() {
        let transcript = SceneTranscript {
            text: "person_1: hello".into(),
            speakers: BTreeSet::from(["person_1".to_string()]),
            emotions: None,
            segments: vec![],
        };
        let json = serde_json::to_value(&transcript).unwrap();
        assert!(json.get("emotions").is_none());
    }
}
