//! Remote-API tool invocation: POST the parameters as JSON to the entry point
//! URL and expect a JSON object back.

use sciquorum_domain::core::string::bounded_lossy;
use sciquorum_domain::{ExecutionResult, ExecutionStatus, Parameters, ToolDescriptor};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const USER_AGENT: &str = concat!("sciquorum/", env!("CARGO_PKG_VERSION"));

/// HTTP client for remote-mode tools
#[derive(Debug, Clone)]
pub struct RemoteInvoker {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl RemoteInvoker {
    pub fn new(max_body_bytes: usize) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(client, max_body_bytes)
    }

    pub fn with_client(client: reqwest::Client, max_body_bytes: usize) -> Self {
        Self {
            client,
            max_body_bytes: max_body_bytes.max(1),
        }
    }

    pub async fn invoke(
        &self,
        descriptor: &ToolDescriptor,
        params: &Parameters,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let name = descriptor.name.as_str();
        let url = match reqwest::Url::parse(&descriptor.entry_point) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                return ExecutionResult::dependency_missing(
                    name,
                    format!("unsupported URL scheme: {}", url.scheme()),
                );
            }
            Err(e) => {
                return ExecutionResult::dependency_missing(
                    name,
                    format!("invalid entry point URL '{}': {}", descriptor.entry_point, e),
                );
            }
        };

        debug!(tool = %name, url = %url, "Calling remote tool");
        let request = self.client.post(url).timeout(timeout).json(params).send();

        // The request timeout covers connect + response; reading the body is
        // bounded by the same deadline below. At most one byte past the cap is
        // kept, enough to tell an oversized body apart.
        let keep = self.max_body_bytes.saturating_add(1);
        let exchange = async {
            let mut response = request.await?;
            let status = response.status();
            let mut body = Vec::new();
            while let Some(chunk) = response.chunk().await? {
                let room = keep - body.len();
                body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                if body.len() == keep {
                    break;
                }
            }
            Ok::<_, reqwest::Error>((status, body))
        };

        let outcome = tokio::select! {
            outcome = tokio::time::timeout(timeout, exchange) => outcome,
            _ = cancel.cancelled() => return ExecutionResult::cancelled(name),
        };

        let (status, body) = match outcome {
            Err(_) => return ExecutionResult::timeout(name, timeout.as_millis() as u64),
            Ok(Err(e)) if e.is_timeout() || e.is_connect() || e.is_request() => {
                return ExecutionResult::failure(
                    name,
                    ExecutionStatus::Timeout,
                    format!("request failed: {}", e),
                );
            }
            Ok(Err(e)) => {
                return ExecutionResult::internal_error(name, format!("request failed: {}", e));
            }
            Ok(Ok(exchange)) => exchange,
        };

        let text = bounded_lossy(&body, self.max_body_bytes);
        let code = Some(i32::from(status.as_u16()));

        if !status.is_success() {
            return ExecutionResult::failure(
                name,
                ExecutionStatus::NonZeroExit,
                format!("HTTP {}", status),
            )
            .with_output(text, "")
            .with_exit_code(code);
        }
        if body.len() > self.max_body_bytes {
            return ExecutionResult::failure(
                name,
                ExecutionStatus::MalformedOutput,
                format!("response body exceeded {} bytes", self.max_body_bytes),
            )
            .with_output(text, "")
            .with_exit_code(code);
        }

        let result = match serde_json::from_slice::<Value>(&body) {
            Ok(value @ Value::Object(_)) => ExecutionResult::ok(name, value),
            Ok(_) => ExecutionResult::failure(
                name,
                ExecutionStatus::MalformedOutput,
                "response is JSON but not an object",
            ),
            Err(e) => ExecutionResult::failure(
                name,
                ExecutionStatus::MalformedOutput,
                format!("response is not JSON: {}", e),
            ),
        };
        result.with_output(text, "").with_exit_code(code)
    }
}
