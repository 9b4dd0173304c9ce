//! In-process tool abstraction
//!
//! Tools with [`InvocationMode::Library`](super::entities::InvocationMode::Library)
//! are plain Rust values implementing [`LibraryTool`]. The executor looks them
//! up by the descriptor's entry point symbol and calls them directly, with no
//! process spawn, which suits lightweight transforms and tools that keep
//! expensive state (models, GPU handles) resident between calls.
//!
//! ```text
//! descriptor.entry_point = "stats::mean"
//!            │
//!            ▼
//!   LibraryRegistry ──► Arc<dyn LibraryTool> ──► call(params) ──► JSON payload
//! ```

use async_trait::async_trait;
use thiserror::Error;

use super::entities::Parameters;

/// Error raised by a library tool.
///
/// The executor reports any of these as an `InternalError` result carrying
/// the message.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// A tool implemented in-process.
#[async_trait]
pub trait LibraryTool: Send + Sync {
    /// Symbol the tool is registered under (matches `entry_point`)
    fn symbol(&self) -> &str;

    /// Run the tool. The returned value becomes the result payload and must be
    /// a JSON object.
    async fn call(&self, parameters: &Parameters) -> Result<serde_json::Value, LibraryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl LibraryTool for Echo {
        fn symbol(&self) -> &str {
            "echo"
        }

        async fn call(&self, parameters: &Parameters) -> Result<serde_json::Value, LibraryError> {
            if parameters.is_empty() {
                return Err(LibraryError::InvalidArgument("nothing to echo".into()));
            }
            Ok(serde_json::Value::Object(parameters.clone()))
        }
    }

    #[tokio::test]
    async fn test_library_tool_call() {
        let mut params = Parameters::new();
        params.insert("x".to_string(), json!(1));
        let out = Echo.call(&params).await.unwrap();
        assert_eq!(out, json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_library_tool_error_display() {
        let err = Echo.call(&Parameters::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: nothing to echo");
    }
}
