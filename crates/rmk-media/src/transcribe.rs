//! Transcription collaborator with pluggable speaker labelling.
//!
//! The transcriber is an opaque external process (a Whisper script writing
//! JSON segments). Speaker diarization sits behind its own seam: the default
//! `RotatingSpeakerLabeler` is a placeholder that rotates through three
//! labels on long pauses, not a real diarization algorithm, and callers
//! should treat it as swappable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::command::ToolCommand;
use crate::error::{MediaError, MediaResult};

/// One raw transcribed utterance, before speaker labelling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Transcription seam.
#[async_trait]
pub trait Transcriber: Send + Sync + 'static {
    /// Transcribe the audio file, returning segments ordered by start time.
    async fn transcribe(&self, audio_path: &Path) -> MediaResult<Vec<RawSegment>>;
}

/// Speaker labelling seam.
pub trait SpeakerLabeler: Send + Sync + 'static {
    /// Assign a speaker label to every segment, preserving order.
    fn label(&self, segments: Vec<RawSegment>) -> Vec<RawSegment>;
}

/// Placeholder diarization: three fixed labels, rotated when a pause longer
/// than `pause_threshold` suggests a speaker change. An approximation that
/// stands in until real diarization lands behind this trait.
pub struct RotatingSpeakerLabeler {
    labels: Vec<String>,
    pause_threshold: f64,
}

impl Default for RotatingSpeakerLabeler {
    fn default() -> Self {
        Self {
            labels: vec![
                "person_1".to_string(),
                "person_2".to_string(),
                "person_3".to_string(),
            ],
            pause_threshold: 2.0,
        }
    }
}

impl RotatingSpeakerLabeler {
    pub fn new(labels: Vec<String>, pause_threshold: f64) -> Self {
        Self {
            labels,
            pause_threshold,
        }
    }
}

impl SpeakerLabeler for RotatingSpeakerLabeler {
    fn label(&self, segments: Vec<RawSegment>) -> Vec<RawSegment> {
        let mut current = 0usize;
        let mut last_end = 0.0f64;

        segments
            .into_iter()
            .map(|mut segment| {
                if segment.start - last_end > self.pause_threshold {
                    current = (current + 1) % self.labels.len();
                }
                last_end = segment.end;
                segment.speaker = Some(self.labels[current].clone());
                segment
            })
            .collect()
    }
}

/// External Whisper script runner.
pub struct WhisperTranscriber {
    script_path: PathBuf,
    work_dir: PathBuf,
    model: String,
    timeout: Duration,
}

impl WhisperTranscriber {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            script_path: resolve_script_path(),
            work_dir: work_dir.into(),
            model: std::env::var("WHISPER_MODEL").unwrap_or_else(|_| "base".to_string()),
            timeout: Duration::from_secs(3600),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn resolve_script_path() -> PathBuf {
    if let Ok(path) = std::env::var("WHISPER_SCRIPT") {
        return PathBuf::from(path);
    }

    let candidates = [
        PathBuf::from("tools/transcribe/whisper_transcribe.py"),
        PathBuf::from("backend/tools/transcribe/whisper_transcribe.py"),
        PathBuf::from("/app/tools/transcribe/whisper_transcribe.py"),
    ];
    for candidate in candidates {
        if candidate.exists() {
            return candidate;
        }
    }

    PathBuf::from("/app/tools/transcribe/whisper_transcribe.py")
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> MediaResult<Vec<RawSegment>> {
        if !audio_path.exists() {
            return Err(MediaError::FileMissing(audio_path.to_path_buf()));
        }
        tokio::fs::create_dir_all(&self.work_dir).await?;

        let file_stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let output_path = self.work_dir.join(format!("{file_stem}_transcription.json"));

        info!(audio = %audio_path.display(), model = %self.model, "transcribing audio");

        let run = ToolCommand::new("python3")
            .arg(self.script_path.to_string_lossy())
            .arg(audio_path.to_string_lossy())
            .arg(output_path.to_string_lossy())
            .arg(&self.model)
            .timeout(self.timeout)
            .run()
            .await;

        let segments = match run {
            Ok(_) => {
                let raw = tokio::fs::read_to_string(&output_path).await?;
                parse_transcriber_output(&raw)?
            }
            Err(e) => {
                tokio::fs::remove_file(&output_path).await.ok();
                return Err(e);
            }
        };

        tokio::fs::remove_file(&output_path).await.ok();

        info!(count = segments.len(), "transcription complete");
        Ok(segments)
    }
}

/// Parse the transcriber's JSON output, enforcing start-time order.
pub fn parse_transcriber_output(raw: &str) -> MediaResult<Vec<RawSegment>> {
    let mut segments: Vec<RawSegment> = serde_json::from_str(raw)
        .map_err(|e| MediaError::bad_output("whisper", e.to_string()))?;
    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(segments)
}
