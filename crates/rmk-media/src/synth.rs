//! Narration synthesis collaborator.
//!
//! Text-to-speech for narration points, behind a seam like every other
//! external tool. The default implementation shells out to espeak-ng;
//! swap in a better voice by implementing the trait.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::command::ToolCommand;
use crate::error::MediaResult;

#[async_trait]
pub trait NarrationSynthesizer: Send + Sync + 'static {
    /// Render `text` as speech into `output` (WAV).
    async fn synthesize(&self, text: &str, output: &Path) -> MediaResult<()>;
}

/// espeak-ng based synthesizer.
pub struct EspeakSynthesizer {
    voice: String,
    timeout: Duration,
}

impl Default for EspeakSynthesizer {
    fn default() -> Self {
        Self {
            voice: std::env::var("NARRATION_VOICE").unwrap_or_else(|_| "en".to_string()),
            timeout: Duration::from_secs(120),
        }
    }
}

impl EspeakSynthesizer {
    pub fn new(voice: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl NarrationSynthesizer for EspeakSynthesizer {
    async fn synthesize(&self, text: &str, output: &Path) -> MediaResult<()> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        ToolCommand::new("espeak-ng")
            .arg("-v")
            .arg(&self.voice)
            .arg("-w")
            .arg(output.to_string_lossy())
            .arg(text)
            .timeout(self.timeout)
            .run()
            .await?;

        info!(output = %output.display(), "synthesized narration");
        Ok(())
    }
}
