//! Video metadata extraction via ffprobe.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use rmk_models::VideoProbe;

use crate::command::ToolCommand;
use crate::error::{MediaError, MediaResult};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

/// Probe a video file for duration, resolution and frame rate.
pub async fn probe_video(path: &Path) -> MediaResult<VideoProbe> {
    if !path.exists() {
        return Err(MediaError::FileMissing(path.to_path_buf()));
    }

    let output = ToolCommand::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path.to_string_lossy())
        .timeout(Duration::from_secs(60))
        .run()
        .await?;

    let parsed: FfprobeOutput = serde_json::from_str(&output.stdout)
        .map_err(|e| MediaError::bad_output("ffprobe", e.to_string()))?;

    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::bad_output("ffprobe", "no video stream found"))?;

    let duration_secs = parsed
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoProbe {
        duration_secs,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps: video_stream
            .r_frame_rate
            .as_deref()
            .map(parse_frame_rate)
            .unwrap_or(30.0),
    })
}

/// Parse an ffprobe frame rate, usually an `a/b` rational like `30000/1001`.
fn parse_frame_rate(raw: &str) -> f64 {
    if let Some((num, den)) = raw.split_once('/') {
        match (num.parse::<f64>(), den.parse::<f64>()) {
            (Ok(n), Ok(d)) if d != 0.0 => return n / d,
            _ => {}
        }
    }
    raw.parse().unwrap_or(30.0)
}
