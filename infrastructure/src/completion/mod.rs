//! Text completion adapters
//!
//! [`HttpCompletionClient`] talks to any OpenAI-compatible chat completions
//! endpoint (hosted APIs, Ollama, vLLM, llama.cpp server). When no endpoint is
//! configured, [`UnavailableCompletion`] makes the selector fall back to
//! keyword ranking.

mod http;

pub use http::{DEFAULT_BASE_URL, DEFAULT_MODEL, HttpCompletionClient};

use async_trait::async_trait;
use sciquorum_application::ports::text_completion::{CompletionError, TextCompletion};

/// Completion capability that is never available
pub struct UnavailableCompletion;

#[async_trait]
impl TextCompletion for UnavailableCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Err(CompletionError::Unavailable(
            "no completion endpoint configured".to_string(),
        ))
    }
}
