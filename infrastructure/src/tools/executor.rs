//! Local tool executor, the concrete implementation of [`ToolExecutorPort`].
//!
//! [`LocalToolExecutor`] dispatches on the descriptor's invocation mode:
//!
//! ```text
//! ToolExecutorPort::invoke()
//!   ├─ required parameters missing? → InternalError (nothing dispatched)
//!   ├─ Process   → ProcessRunner   (child process, JSON on stdout)
//!   ├─ Library   → LibraryRegistry (in-process symbol)
//!   └─ RemoteApi → RemoteInvoker   (HTTP POST, JSON response)
//! ```
//!
//! Every result carries the wall-clock duration of the call. The executor
//! never retries; retry policy belongs to the orchestrator.

use super::library::LibraryRegistry;
use super::process::{DEFAULT_MAX_OUTPUT_BYTES, ProcessRunner};
use super::remote::RemoteInvoker;
use async_trait::async_trait;
use sciquorum_application::ports::tool_executor::ToolExecutorPort;
use sciquorum_domain::{ExecutionResult, InvocationMode, Parameters, ToolDescriptor};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Executor that runs tools on the local machine (or calls them over HTTP).
#[derive(Clone)]
pub struct LocalToolExecutor {
    process: ProcessRunner,
    library: Arc<LibraryRegistry>,
    remote: RemoteInvoker,
}

impl LocalToolExecutor {
    pub fn new() -> Self {
        Self {
            process: ProcessRunner::default(),
            library: Arc::new(LibraryRegistry::new()),
            remote: RemoteInvoker::new(DEFAULT_MAX_OUTPUT_BYTES),
        }
    }

    /// Use `library` to resolve library-mode entry points.
    pub fn with_library(mut self, library: LibraryRegistry) -> Self {
        self.library = Arc::new(library);
        self
    }

    /// Cap on captured stdout/stderr and HTTP response bodies.
    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.process = ProcessRunner::new(max);
        self.remote = RemoteInvoker::new(max);
        self
    }

    pub fn library(&self) -> &LibraryRegistry {
        &self.library
    }
}

impl Default for LocalToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutorPort for LocalToolExecutor {
    async fn invoke(
        &self,
        descriptor: &ToolDescriptor,
        params: &Parameters,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let missing = descriptor.missing_required(params);
        if !missing.is_empty() {
            return ExecutionResult::internal_error(
                &descriptor.name,
                format!("missing required parameter(s): {}", missing.join(", ")),
            )
            .with_duration(0);
        }
        if cancel.is_cancelled() {
            return ExecutionResult::cancelled(&descriptor.name).with_duration(0);
        }

        debug!(
            tool = %descriptor.name,
            mode = %descriptor.invocation_mode,
            timeout_ms = timeout.as_millis() as u64,
            "Invoking tool"
        );
        let started = Instant::now();

        let result = match descriptor.invocation_mode {
            InvocationMode::Process => {
                self.process
                    .invoke(descriptor, params, timeout, cancel)
                    .await
            }
            InvocationMode::Library => {
                self.library
                    .invoke(descriptor, params, timeout, cancel)
                    .await
            }
            InvocationMode::RemoteApi => {
                self.remote.invoke(descriptor, params, timeout, cancel).await
            }
        };
        let result = result.with_duration(started.elapsed().as_millis() as u64);

        info!(
            tool = %descriptor.name,
            status = %result.status().as_str(),
            duration_ms = result.duration_ms,
            "Tool finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sciquorum_application::ports::tool_executor::ChainLink;
    use sciquorum_domain::{
        DeclaredParameter, ExecutionStatus, LibraryError, LibraryTool, ParamTemplate,
    };
    use serde_json::{Value, json};

    /// Wraps its `value` parameter as `{"value": ..., "step": <symbol>}`
    struct Wrap(&'static str);

    #[async_trait]
    impl LibraryTool for Wrap {
        fn symbol(&self) -> &str {
            self.0
        }

        async fn call(&self, parameters: &Parameters) -> Result<Value, LibraryError> {
            match parameters.get("value") {
                Some(v) if !v.is_null() => Ok(json!({ "value": v, "step": self.0 })),
                _ => Err(LibraryError::ExecutionFailed("no value".into())),
            }
        }
    }

    fn executor() -> LocalToolExecutor {
        LocalToolExecutor::new().with_library(
            LibraryRegistry::new()
                .register(Arc::new(Wrap("first")))
                .register(Arc::new(Wrap("second"))),
        )
    }

    fn library_tool(name: &str, symbol: &str) -> Arc<ToolDescriptor> {
        Arc::new(ToolDescriptor::new(name, InvocationMode::Library, symbol))
    }

    #[tokio::test]
    async fn test_missing_required_parameter_is_not_dispatched() {
        let descriptor = ToolDescriptor::new("needs", InvocationMode::Library, "first")
            .with_parameter(DeclaredParameter::new("value", true));
        let result = executor()
            .invoke(
                &descriptor,
                &Parameters::new(),
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(result.status(), ExecutionStatus::InternalError);
        assert!(result.raw_stderr.contains("value"));
    }

    #[tokio::test]
    async fn test_pre_cancelled_token() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = executor()
            .invoke(
                &library_tool("t", "first"),
                &Parameters::new(),
                Duration::from_secs(1),
                &cancel,
            )
            .await;
        assert_eq!(result.status(), ExecutionStatus::InternalError);
        assert!(result.raw_stderr.contains("cancelled"));
    }

    #[tokio::test]
    async fn test_chain_threads_previous_payload() {
        let links = vec![
            ChainLink::new(
                library_tool("a", "first"),
                ParamTemplate::new().with("value", "{{seed}}"),
            ),
            ChainLink::new(
                library_tool("b", "second"),
                ParamTemplate::new().with("value", "{{prev.value}}"),
            ),
        ];
        let results = executor()
            .invoke_chain(
                &links,
                json!("BRCA1"),
                Duration::from_secs(5),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(ExecutionResult::is_ok));
        assert_eq!(
            results[1].payload(),
            Some(&json!({"value": "BRCA1", "step": "second"}))
        );
    }

    #[tokio::test]
    async fn test_chain_halts_on_failure() {
        let links = vec![
            ChainLink::new(library_tool("missing", "nowhere"), ParamTemplate::new()),
            ChainLink::new(
                library_tool("b", "second"),
                ParamTemplate::new().with("value", "x"),
            ),
        ];
        let results = executor()
            .invoke_chain(
                &links,
                Value::Null,
                Duration::from_secs(5),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status(), ExecutionStatus::DependencyMissing);
    }
}
