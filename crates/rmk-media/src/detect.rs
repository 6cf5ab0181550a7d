//! Scene detection collaborator.
//!
//! Detection runs as an opaque external process: a python script (PySceneDetect
//! content detection) that writes a JSON list of detected ranges. Failure
//! surfaces as a single error with no partial results.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::command::ToolCommand;
use crate::error::{MediaError, MediaResult};

/// One detected scene range, video-relative seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectedScene {
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default = "default_importance")]
    pub importance_score: f64,
}

fn default_importance() -> f64 {
    0.5
}

/// Scene detection seam. Implementations are expected to be slow and
/// failure-prone; callers own retries.
#[async_trait]
pub trait SceneDetector: Send + Sync + 'static {
    /// Detect scenes in the video at `video_path`, ordered by start time.
    async fn detect(&self, video_path: &Path) -> MediaResult<Vec<DetectedScene>>;
}

/// External PySceneDetect script runner.
pub struct PySceneDetector {
    script_path: PathBuf,
    work_dir: PathBuf,
    timeout: Duration,
}

impl PySceneDetector {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            script_path: resolve_script_path(),
            work_dir: work_dir.into(),
            timeout: Duration::from_secs(1800),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn resolve_script_path() -> PathBuf {
    if let Ok(path) = std::env::var("SCENE_DETECT_SCRIPT") {
        return PathBuf::from(path);
    }

    let candidates = [
        PathBuf::from("tools/scene-detect/detect_scenes.py"),
        PathBuf::from("backend/tools/scene-detect/detect_scenes.py"),
        PathBuf::from("/app/tools/scene-detect/detect_scenes.py"),
    ];
    for candidate in candidates {
        if candidate.exists() {
            return candidate;
        }
    }

    PathBuf::from("/app/tools/scene-detect/detect_scenes.py")
}

#[async_trait]
impl SceneDetector for PySceneDetector {
    async fn detect(&self, video_path: &Path) -> MediaResult<Vec<DetectedScene>> {
        if !video_path.exists() {
            return Err(MediaError::FileMissing(video_path.to_path_buf()));
        }
        tokio::fs::create_dir_all(&self.work_dir).await?;

        let file_stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let output_path = self.work_dir.join(format!("{file_stem}_scenes.json"));

        info!(video = %video_path.display(), "detecting scenes");

        let run = ToolCommand::new("python3")
            .arg(self.script_path.to_string_lossy())
            .arg(video_path.to_string_lossy())
            .arg(output_path.to_string_lossy())
            .timeout(self.timeout)
            .run()
            .await;

        let scenes = match run {
            Ok(_) => {
                let raw = tokio::fs::read_to_string(&output_path).await?;
                parse_detector_output(&raw)?
            }
            Err(e) => {
                tokio::fs::remove_file(&output_path).await.ok();
                return Err(e);
            }
        };

        tokio::fs::remove_file(&output_path).await.ok();

        info!(count = scenes.len(), "scene detection complete");
        Ok(scenes)
    }
}

/// Parse and sanity-check the detector's JSON output.
pub fn parse_detector_output(raw: &str) -> MediaResult<Vec<DetectedScene>> {
    let mut scenes: Vec<DetectedScene> = serde_json::from_str(raw)
        .map_err(|e| MediaError::bad_output("scene-detect", e.to_string()))?;

    for scene in &scenes {
        if !(scene.start_time >= 0.0 && scene.start_time < scene.end_time) {
            return Err(MediaError::bad_output(
                "scene-detect",
                format!(
                    "invalid scene range [{}, {}]",
                    scene.start_time, scene.end_time
                ),
            ));
        }
    }
    scenes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    Ok(scenes)
}
