//! Video entity and probe output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ProjectId, VideoId};

/// Technical metadata extracted from a video file by ffprobe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoProbe {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl VideoProbe {
    /// `WxH` form used in prompts and status output.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// An uploaded raw video. Immutable once its metadata is extracted;
/// scenes reference it by id and never copy it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub project_id: ProjectId,
    /// Storage path of the uploaded file.
    pub path: String,
    pub duration_secs: f64,
    /// `WxH`, e.g. `1920x1080`.
    pub resolution: String,
    pub fps: f64,
    pub uploaded_at: DateTime<Utc>,
}

impl Video {
    /// Create a video record from its storage path and probe output.
    pub fn new(project_id: ProjectId, path: impl Into<String>, probe: &VideoProbe) -> Self {
        Self {
            id: VideoId::new(),
            project_id,
            path: path.into(),
            duration_secs: probe.duration_secs,
            resolution: probe.resolution(),
            fps: probe.fps,
            uploaded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_from_probe() {
        let probe = VideoProbe {
            duration_secs: 600.0,
            width: 1920,
            height: 1080,
            fps: 29.97,
        };
        let video = Video::new(ProjectId::new(), "/storage/uploads/a.mp4", &probe);
        assert_eq!(video.resolution, "1920x1080");
        assert_eq!(video.duration_secs, 600.0);
    }
}
