//! Text completion configuration from TOML (`[completion]` section)
//!
//! ```toml
//! [completion]
//! endpoint = "http://localhost:11434"   # Ollama
//! model = "llama3.1"
//! api_key_env = "OPENAI_API_KEY"
//! ```
//!
//! Without an `endpoint` the selector always uses keyword ranking.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCompletionConfig {
    /// Base URL of an OpenAI-compatible API
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// Environment variable holding the bearer token
    pub api_key_env: String,
}

impl Default for FileCompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}
