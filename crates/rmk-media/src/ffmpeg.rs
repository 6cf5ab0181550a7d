//! ffmpeg helpers used by the pipeline stages.

use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::command::ToolCommand;
use crate::error::{MediaError, MediaResult};

/// Extract a mono 16 kHz PCM WAV track, the input format the transcriber
/// expects.
pub async fn extract_audio(video: &Path, audio_out: &Path) -> MediaResult<()> {
    if !video.exists() {
        return Err(MediaError::FileMissing(video.to_path_buf()));
    }
    if let Some(parent) = audio_out.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    ToolCommand::new("ffmpeg")
        .args(["-v", "error", "-y", "-i"])
        .arg(video.to_string_lossy())
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
        .arg(audio_out.to_string_lossy())
        .timeout(Duration::from_secs(600))
        .run()
        .await?;

    info!(video = %video.display(), audio = %audio_out.display(), "extracted audio");
    Ok(())
}

/// Cut `[start, start+duration)` out of a video with stream copy.
pub async fn cut_clip(
    input: &Path,
    output: &Path,
    start_secs: f64,
    duration_secs: f64,
) -> MediaResult<()> {
    if !input.exists() {
        return Err(MediaError::FileMissing(input.to_path_buf()));
    }
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    ToolCommand::new("ffmpeg")
        .args(["-v", "error", "-y", "-ss"])
        .arg(format!("{start_secs:.3}"))
        .arg("-t")
        .arg(format!("{duration_secs:.3}"))
        .arg("-i")
        .arg(input.to_string_lossy())
        .args(["-c:v", "copy", "-c:a", "copy"])
        .arg(output.to_string_lossy())
        .timeout(Duration::from_secs(600))
        .run()
        .await?;
    Ok(())
}

/// Concatenate clips with the concat demuxer (inputs must share codecs).
pub async fn concat_clips(clips: &[impl AsRef<Path>], output: &Path) -> MediaResult<()> {
    if clips.is_empty() {
        return Err(MediaError::bad_output("concat", "no clips to concatenate"));
    }
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let list_path = output.with_extension("txt");
    let mut list = String::new();
    for clip in clips {
        let clip = clip.as_ref();
        if !clip.exists() {
            return Err(MediaError::FileMissing(clip.to_path_buf()));
        }
        list.push_str(&format!("file '{}'\n", clip.display()));
    }
    tokio::fs::write(&list_path, list).await?;

    let result = ToolCommand::new("ffmpeg")
        .args(["-v", "error", "-y", "-f", "concat", "-safe", "0", "-i"])
        .arg(list_path.to_string_lossy())
        .args(["-c", "copy"])
        .arg(output.to_string_lossy())
        .timeout(Duration::from_secs(1200))
        .run()
        .await;

    tokio::fs::remove_file(&list_path).await.ok();
    result.map(|_| ())
}

/// Re-encode the rough episode into the final deliverable form.
pub async fn encode_episode(input: &Path, output: &Path) -> MediaResult<()> {
    if !input.exists() {
        return Err(MediaError::FileMissing(input.to_path_buf()));
    }
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    ToolCommand::new("ffmpeg")
        .args(["-v", "error", "-y", "-i"])
        .arg(input.to_string_lossy())
        .args([
            "-c:v", "libx264", "-preset", "medium", "-crf", "20", "-c:a", "aac", "-b:a", "192k",
            "-movflags", "+faststart",
        ])
        .arg(output.to_string_lossy())
        .timeout(Duration::from_secs(3600))
        .run()
        .await?;

    info!(output = %output.display(), "encoded episode");
    Ok(())
}
