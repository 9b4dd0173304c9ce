//! Text completion port
//!
//! The natural-language capability the selector consults. It is treated as an
//! opaque, nondeterministic dependency: every error is handled the same way
//! by callers.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during a completion request
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Completion capability unavailable: {0}")]
    Unavailable(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// `Complete(promptText) -> responseText`
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
