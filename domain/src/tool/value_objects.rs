//! Tool domain value objects: the normalized result envelope
//!
//! Every invocation, whatever its [`InvocationMode`](super::entities::InvocationMode),
//! produces one [`ExecutionResult`]. Failures are values, not errors: the
//! orchestrator folds them into step status instead of propagating them.

use serde::{Deserialize, Serialize};

/// Outcome category of one invocation.
///
/// | Status | Process | Library | Remote |
/// |--------|---------|---------|--------|
/// | `Ok` | exit 0 + one JSON object | returned value | 2xx + JSON object |
/// | `Timeout` | killed on expiry | aborted on expiry | request timeout / connect failure |
/// | `NonZeroExit` | exit code != 0 | - | non-2xx status |
/// | `MalformedOutput` | stdout not one JSON object | non-object value | body not a JSON object |
/// | `DependencyMissing` | entry point not found | unknown symbol | invalid URL |
/// | `InternalError` | spawn / I/O failure | error or panic | - |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Ok,
    Timeout,
    NonZeroExit,
    MalformedOutput,
    DependencyMissing,
    InternalError,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionStatus::Ok => "ok",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::NonZeroExit => "non_zero_exit",
            ExecutionStatus::MalformedOutput => "malformed_output",
            ExecutionStatus::DependencyMissing => "dependency_missing",
            ExecutionStatus::InternalError => "internal_error",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ExecutionStatus::Ok)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one executor invocation.
///
/// `payload` is only ever present when `status` is [`ExecutionStatus::Ok`];
/// the constructors are the only way to build one, which keeps that true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub tool_name: String,
    status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<serde_json::Value>,
    /// Captured stdout (or response body), bounded
    #[serde(default)]
    pub raw_stdout: String,
    /// Captured stderr (or error message), bounded
    #[serde(default)]
    pub raw_stderr: String,
    pub duration_ms: u64,
    /// Process exit code, or HTTP status for remote tools
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl ExecutionResult {
    /// Successful invocation carrying the parsed payload.
    pub fn ok(tool_name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            status: ExecutionStatus::Ok,
            payload: Some(payload),
            raw_stdout: String::new(),
            raw_stderr: String::new(),
            duration_ms: 0,
            exit_code: None,
        }
    }

    /// Failed invocation. `message` is appended to the captured stderr.
    ///
    /// Passing [`ExecutionStatus::Ok`] here yields an `Ok` result without a
    /// payload; callers use [`ok`](Self::ok) for successes.
    pub fn failure(
        tool_name: impl Into<String>,
        status: ExecutionStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            status,
            payload: None,
            raw_stdout: String::new(),
            raw_stderr: message.into(),
            duration_ms: 0,
            exit_code: None,
        }
    }

    pub fn timeout(tool_name: impl Into<String>, after_ms: u64) -> Self {
        Self::failure(
            tool_name,
            ExecutionStatus::Timeout,
            format!("timed out after {} ms", after_ms),
        )
    }

    pub fn dependency_missing(tool_name: impl Into<String>, what: impl Into<String>) -> Self {
        Self::failure(tool_name, ExecutionStatus::DependencyMissing, what)
    }

    pub fn internal_error(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::failure(tool_name, ExecutionStatus::InternalError, message)
    }

    pub fn cancelled(tool_name: impl Into<String>) -> Self {
        Self::internal_error(tool_name, "invocation cancelled")
    }

    pub fn with_output(mut self, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.raw_stdout = stdout.into();
        let stderr = stderr.into();
        if !stderr.is_empty() {
            if self.raw_stderr.is_empty() {
                self.raw_stderr = stderr;
            } else {
                self.raw_stderr = format!("{}\n{}", stderr, self.raw_stderr);
            }
        }
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<serde_json::Value> {
        self.payload
    }

    /// Short human-readable reason for a failure (first stderr line).
    pub fn error_summary(&self) -> Option<String> {
        if self.is_ok() {
            return None;
        }
        let line = self
            .raw_stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or(self.status.as_str());
        Some(crate::core::string::truncate(line, 200))
    }
}
