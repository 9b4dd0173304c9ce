//! In-process (library mode) tool dispatch
//!
//! [`LibraryRegistry`] maps entry-point symbols to [`LibraryTool`]
//! implementations. Each call runs on its own tokio task so that a panic
//! inside a tool surfaces as an `InternalError` result instead of taking the
//! worker down, and so that timeout and cancellation can abort it.

use sciquorum_domain::{ExecutionResult, ExecutionStatus, LibraryTool, Parameters, ToolDescriptor};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Symbol table for library-mode tools
#[derive(Default, Clone)]
pub struct LibraryRegistry {
    tools: BTreeMap<String, Arc<dyn LibraryTool>>,
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own symbol, replacing any previous one
    pub fn register(mut self, tool: Arc<dyn LibraryTool>) -> Self {
        self.tools.insert(tool.symbol().to_string(), tool);
        self
    }

    pub fn get(&self, symbol: &str) -> Option<Arc<dyn LibraryTool>> {
        self.tools.get(symbol).cloned()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Call the tool registered under `descriptor.entry_point`.
    pub async fn invoke(
        &self,
        descriptor: &ToolDescriptor,
        params: &Parameters,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let name = descriptor.name.as_str();
        let Some(tool) = self.get(&descriptor.entry_point) else {
            return ExecutionResult::dependency_missing(
                name,
                format!("no library tool registered as '{}'", descriptor.entry_point),
            );
        };

        let params = params.clone();
        let mut handle = tokio::spawn(async move { tool.call(&params).await });

        let joined = tokio::select! {
            joined = &mut handle => joined,
            _ = tokio::time::sleep(timeout) => {
                handle.abort();
                return ExecutionResult::timeout(name, timeout.as_millis() as u64);
            }
            _ = cancel.cancelled() => {
                handle.abort();
                return ExecutionResult::cancelled(name);
            }
        };

        match joined {
            Ok(Ok(value @ Value::Object(_))) => ExecutionResult::ok(name, value),
            Ok(Ok(other)) => ExecutionResult::failure(
                name,
                ExecutionStatus::MalformedOutput,
                format!("library tool returned a non-object value: {}", other),
            ),
            Ok(Err(e)) => ExecutionResult::internal_error(name, e.to_string()),
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                debug!(tool = %name, panic = %message, "Library tool panicked");
                ExecutionResult::internal_error(name, format!("library tool panicked: {}", message))
            }
            Err(e) => ExecutionResult::internal_error(name, e.to_string()),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sciquorum_domain::{InvocationMode, LibraryError};
    use serde_json::json;

    enum Mode {
        Echo,
        Panic,
        Fail,
        Scalar,
        Sleep,
    }

    struct TestTool {
        symbol: &'static str,
        mode: Mode,
    }

    #[async_trait]
    impl LibraryTool for TestTool {
        fn symbol(&self) -> &str {
            self.symbol
        }

        async fn call(&self, parameters: &Parameters) -> Result<Value, LibraryError> {
            match self.mode {
                Mode::Echo => Ok(Value::Object(parameters.clone())),
                Mode::Panic => panic!("boom"),
                Mode::Fail => Err(LibraryError::ExecutionFailed("bad input".into())),
                Mode::Scalar => Ok(json!(42)),
                Mode::Sleep => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(json!({}))
                }
            }
        }
    }

    fn registry() -> LibraryRegistry {
        [
            ("echo", Mode::Echo),
            ("panic", Mode::Panic),
            ("fail", Mode::Fail),
            ("scalar", Mode::Scalar),
            ("sleep", Mode::Sleep),
        ]
        .into_iter()
        .fold(LibraryRegistry::new(), |reg, (symbol, mode)| {
            reg.register(Arc::new(TestTool { symbol, mode }))
        })
    }

    async fn call(symbol: &str, timeout: Duration) -> ExecutionResult {
        let descriptor = ToolDescriptor::new("t", InvocationMode::Library, symbol);
        let mut params = Parameters::new();
        params.insert("x".into(), json!(1));
        registry()
            .invoke(&descriptor, &params, timeout, &CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_echo() {
        let result = call("echo", Duration::from_secs(5)).await;
        assert_eq!(result.payload(), Some(&json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_panic_is_internal_error() {
        let result = call("panic", Duration::from_secs(5)).await;
        assert_eq!(result.status(), ExecutionStatus::InternalError);
        assert!(result.raw_stderr.contains("boom"));
    }

    #[tokio::test]
    async fn test_tool_error_is_internal_error() {
        let result = call("fail", Duration::from_secs(5)).await;
        assert_eq!(result.status(), ExecutionStatus::InternalError);
        assert!(result.raw_stderr.contains("bad input"));
    }

    #[tokio::test]
    async fn test_non_object_is_malformed() {
        let result = call("scalar", Duration::from_secs(5)).await;
        assert_eq!(result.status(), ExecutionStatus::MalformedOutput);
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_dependency_missing() {
        let result = call("nope", Duration::from_secs(5)).await;
        assert_eq!(result.status(), ExecutionStatus::DependencyMissing);
    }

    #[tokio::test]
    async fn test_timeout() {
        let result = call("sleep", Duration::from_millis(50)).await;
        assert_eq!(result.status(), ExecutionStatus::Timeout);
    }

    #[test]
    fn test_symbols() {
        let reg = registry();
        assert_eq!(reg.len(), 5);
        assert!(reg.symbols().any(|s| s == "echo"));
    }
}
