//! Ollama client.
//!
//! Speaks the local Ollama HTTP API. Generation calls are the longest
//! external operations in the pipeline and carry a minutes-range timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AiError, AiResult};

/// Seam for the generative backend: given a system and user prompt, return
/// raw text expected to contain a JSON document. No schema enforcement here;
/// that is entirely the caller's responsibility.
#[async_trait]
pub trait NarrativeBackend: Send + Sync + 'static {
    async fn generate_raw(&self, system_prompt: &str, user_prompt: &str) -> AiResult<String>;
}

/// Ollama connection settings.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    /// Per-call timeout for generation requests.
    pub request_timeout: Duration,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            request_timeout: Duration::from_secs(300),
            temperature: 0.3,
            top_p: 0.9,
            max_tokens: 4096,
        }
    }
}

impl OllamaConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("OLLAMA_URL").unwrap_or(defaults.base_url),
            model: std::env::var("OLLAMA_MODEL").unwrap_or(defaults.model),
            request_timeout: Duration::from_secs(
                std::env::var("OLLAMA_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            ..defaults
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Client for a local Ollama instance.
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> AiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AiError::Config(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> AiResult<Self> {
        Self::new(OllamaConfig::from_env())
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Whether the Ollama server responds at all.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Names of locally available models.
    pub async fn list_models(&self) -> AiResult<Vec<String>> {
        let url = format!("{}/api/tags", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AiError::backend(format!("list models failed: {e}")))?;
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| AiError::backend(format!("bad tags response: {e}")))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Pull a model from the registry. Slow; bounded at ten minutes.
    pub async fn pull_model(&self, model: &str) -> AiResult<()> {
        info!(model = %model, "pulling ollama model");
        let url = format!("{}/api/pull", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(600))
            .json(&serde_json::json!({ "name": model, "stream": false }))
            .send()
            .await
            .map_err(|e| AiError::backend(format!("model pull failed: {e}")))?;
        if !response.status().is_success() {
            return Err(AiError::backend(format!(
                "model pull returned {}",
                response.status()
            )));
        }
        info!(model = %model, "model pulled");
        Ok(())
    }

    /// Ensure the configured model is present, pulling it if missing.
    pub async fn ensure_model(&self) -> AiResult<()> {
        let models = self.list_models().await?;
        if !models.iter().any(|name| name == &self.config.model) {
            warn!(model = %self.config.model, "model not found locally, pulling");
            self.pull_model(&self.config.model).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl NarrativeBackend for OllamaClient {
    async fn generate_raw(&self, system_prompt: &str, user_prompt: &str) -> AiResult<String> {
        debug!(model = %self.config.model, "generating with ollama");

        let prompt = format!(
            "{system_prompt}\n\n{user_prompt}\n\nCRITICAL: Return ONLY valid JSON. \
             No markdown, no explanation, no code blocks. Just the raw JSON object."
        );

        let url = format!("{}/api/generate", self.config.base_url);
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                num_predict: self.config.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::backend(format!("generate request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::backend(format!(
                "generate returned {status}: {body}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AiError::backend(format!("bad generate response: {e}")))?;

        Ok(parsed.response)
    }
}
