//! Generative backend integration.
//!
//! The showrunner asks an LLM for a structured narrative document. The
//! backend is unreliable by contract: output may be fenced, malformed, or
//! structurally incomplete. This crate owns the seam (`NarrativeBackend`),
//! the Ollama implementation, the structural validator, and the bounded
//! retry loop that only ever hands validated documents to callers.

pub mod error;
pub mod generate;
pub mod ollama;
pub mod prompt;
pub mod validate;

pub use error::{AiError, AiResult};
pub use generate::{generate_narrative, strip_code_fences, GenerationPolicy};
pub use ollama::{NarrativeBackend, OllamaClient, OllamaConfig};
pub use prompt::{build_showrunner_prompt, SHOWRUNNER_SYSTEM_PROMPT};
pub use validate::validate_narrative;
