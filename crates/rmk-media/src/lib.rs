//! External media collaborators.
//!
//! Every heavyweight media operation is an external process behind a small
//! trait, so the orchestration layer can be tested with scripted fakes and
//! the real tools can be swapped without touching executors:
//! - `SceneDetector`: PySceneDetect-style content detection
//! - `Transcriber` + `SpeakerLabeler`: Whisper-style transcription with
//!   pluggable diarization
//! - ffmpeg/ffprobe helpers for probing, audio extraction, cutting and
//!   concatenation

pub mod command;
pub mod detect;
pub mod error;
pub mod ffmpeg;
pub mod probe;
pub mod synth;
pub mod toolkit;
pub mod transcribe;

pub use command::ToolCommand;
pub use detect::{DetectedScene, PySceneDetector, SceneDetector};
pub use error::{MediaError, MediaResult};
pub use ffmpeg::{concat_clips, cut_clip, encode_episode, extract_audio};
pub use probe::probe_video;
pub use synth::{EspeakSynthesizer, NarrationSynthesizer};
pub use toolkit::{FfmpegToolkit, MediaToolkit};
pub use transcribe::{
    RawSegment, RotatingSpeakerLabeler, SpeakerLabeler, Transcriber, WhisperTranscriber,
};
