//! Media toolkit seam.
//!
//! Bundles the ffmpeg operations the pipeline stages need behind one trait,
//! so executors can run against a scripted fake while the deployed worker
//! shells out to ffmpeg.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::MediaResult;
use crate::ffmpeg;

#[async_trait]
pub trait MediaToolkit: Send + Sync + 'static {
    /// Extract a mono 16 kHz WAV track for transcription.
    async fn extract_audio(&self, video: &Path, audio_out: &Path) -> MediaResult<()>;

    /// Cut `[start, start+duration)` out of a video.
    async fn cut_clip(
        &self,
        input: &Path,
        output: &Path,
        start_secs: f64,
        duration_secs: f64,
    ) -> MediaResult<()>;

    /// Concatenate clips into a rough episode.
    async fn assemble(&self, clips: &[PathBuf], output: &Path) -> MediaResult<()>;

    /// Encode the rough episode into the final deliverable.
    async fn encode_episode(&self, input: &Path, output: &Path) -> MediaResult<()>;
}

/// The real thing: every operation is an ffmpeg invocation.
#[derive(Debug, Clone, Default)]
pub struct FfmpegToolkit;

impl FfmpegToolkit {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn extract_audio(&self, video: &Path, audio_out: &Path) -> MediaResult<()> {
        ffmpeg::extract_audio(video, audio_out).await
    }

    async fn cut_clip(
        &self,
        input: &Path,
        output: &Path,
        start_secs: f64,
        duration_secs: f64,
    ) -> MediaResult<()> {
        ffmpeg::cut_clip(input, output, start_secs, duration_secs).await
    }

    async fn assemble(&self, clips: &[PathBuf], output: &Path) -> MediaResult<()> {
        ffmpeg::concat_clips(clips, output).await
    }

    async fn encode_episode(&self, input: &Path, output: &Path) -> MediaResult<()> {
        ffmpeg::encode_episode(input, output).await
    }
}
