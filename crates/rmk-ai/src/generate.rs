//! Validated-generation retry loop.
//!
//! Generative backends fail in three ways worth distinguishing: the request
//! itself errors, the response is not JSON, or the JSON is structurally
//! incomplete. All three consume one attempt; the prompt is never mutated
//! between attempts. This budget is separate from, and shorter than, the
//! job-level retry budget.

use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{AiError, AiResult};
use crate::ollama::NarrativeBackend;
use crate::validate::validate_narrative;

/// Retry policy for the generation loop.
#[derive(Debug, Clone)]
pub struct GenerationPolicy {
    /// Total backend calls allowed for one prompt.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Strip fenced code markers from a backend response.
///
/// Models wrap JSON in ```json fences despite instructions; the wrapper is
/// the only non-JSON decoration handled here.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    text.trim()
}

/// Ask the backend for a narrative document until one validates.
///
/// Returns the first document that parses and passes structural validation.
/// Exhausting `policy.max_attempts` yields `AiError::Exhausted` carrying the
/// last failure; no partially valid document is ever returned.
pub async fn generate_narrative(
    backend: &dyn NarrativeBackend,
    system_prompt: &str,
    user_prompt: &str,
    policy: &GenerationPolicy,
) -> AiResult<Value> {
    let mut last_error = String::new();

    for attempt in 1..=policy.max_attempts {
        match attempt_generation(backend, system_prompt, user_prompt).await {
            Ok(document) => {
                info!(attempt, "valid narrative generated");
                return Ok(document);
            }
            Err(e) => {
                warn!(attempt, error = %e, "generation attempt failed");
                last_error = e.to_string();
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.retry_delay).await;
                }
            }
        }
    }

    Err(AiError::Exhausted {
        attempts: policy.max_attempts,
        last_error,
    })
}

async fn attempt_generation(
    backend: &dyn NarrativeBackend,
    system_prompt: &str,
    user_prompt: &str,
) -> AiResult<Value> {
    let raw = backend.generate_raw(system_prompt, user_prompt).await?;
    let cleaned = strip_code_fences(&raw);
    let document: Value =
        serde_json::from_str(cleaned).map_err(|e| AiError::InvalidJson(e.to_string()))?;
    validate_narrative(&document)?;
    Ok(document)
}
