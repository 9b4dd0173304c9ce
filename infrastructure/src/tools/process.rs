//! Process-mode tool invocation
//!
//! Contract for the spawned executable:
//!
//! - parameters arrive as `--name value` flags
//! - exactly one JSON object is written to stdout, then exit 0
//! - diagnostics go to stderr
//!
//! The child runs in its own process group. The whole group is killed on
//! timeout or cancellation, and after a normal exit any background process
//! the tool left behind is killed too.

use sciquorum_domain::core::string::bounded_lossy;
use sciquorum_domain::{ExecutionResult, ExecutionStatus, Parameters, ToolDescriptor};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default cap on captured stdout and stderr, each (1 MB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// How long to wait for pipe readers after the child is gone
const READER_GRACE: Duration = Duration::from_secs(1);

/// Spawns process-mode tools
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    max_output_bytes: usize,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Bytes captured from one pipe
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

/// Reader task for one pipe. Bytes land in `buffer` as they arrive, so an
/// aborted reader still yields what it read.
struct PipeReader {
    buffer: Arc<Mutex<Captured>>,
    task: JoinHandle<()>,
}

enum Ending {
    Exited(std::process::ExitStatus),
    TimedOut,
    Cancelled,
    WaitFailed(std::io::Error),
}

impl ProcessRunner {
    pub fn new(max_output_bytes: usize) -> Self {
        Self {
            max_output_bytes: max_output_bytes.max(1),
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

        let (program, leading_args) = match resolve_entry_point(descriptor) {
            Ok(resolved) => resolved,
            Err(message) => return ExecutionResult::dependency_missing(name, message),
        };
        let args = encode_arguments(descriptor, params);

        let mut cmd = Command::new(&program);
        cmd.args(&leading_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = descriptor.base_dir() {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        // Linux: have the kernel kill the tool if we die first
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL);
                Ok(())
            });
        }

        debug!(tool = %name, program = %program.display(), ?args, "Spawning tool process");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ExecutionResult::dependency_missing(
                    name,
                    format!("cannot execute {}: {}", program.display(), e),
                );
            }
            Err(e) => {
                return ExecutionResult::internal_error(name, format!("failed to spawn: {}", e));
            }
        };

        let pgid = child.id();
        let stdout = child.stdout.take().map(|p| self.capture(p));
        let stderr = child.stderr.take().map(|p| self.capture(p));

        let ending = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => Ending::Exited(status),
                Err(e) => Ending::WaitFailed(e),
            },
            _ = tokio::time::sleep(timeout) => Ending::TimedOut,
            _ = cancel.cancelled() => Ending::Cancelled,
        };
        match ending {
            Ending::TimedOut | Ending::Cancelled => kill_process_group(&mut child, pgid).await,
            Ending::Exited(_) if signal_group(pgid) => {
                debug!(tool = %name, "Killed processes left running by the tool");
            }
            _ => {}
        }

        let stdout = collect(stdout).await;
        let stderr = collect(stderr).await;
        let stdout_text = bounded_lossy(&stdout.bytes, self.max_output_bytes);
        let stderr_text = bounded_lossy(&stderr.bytes, self.max_output_bytes);

        match ending {
            Ending::TimedOut => ExecutionResult::timeout(name, timeout.as_millis() as u64)
                .with_output(stdout_text, stderr_text),
            Ending::Cancelled => {
                ExecutionResult::cancelled(name).with_output(stdout_text, stderr_text)
            }
            Ending::WaitFailed(e) => {
                ExecutionResult::internal_error(name, format!("failed to wait for process: {}", e))
                    .with_output(stdout_text, stderr_text)
            }
            Ending::Exited(status) if !status.success() => ExecutionResult::failure(
                name,
                ExecutionStatus::NonZeroExit,
                match status.code() {
                    Some(code) => format!("exited with status {}", code),
                    None => "terminated by signal".to_string(),
                },
            )
            .with_output(stdout_text, stderr_text)
            .with_exit_code(status.code()),
            Ending::Exited(status) => {
                let result = if stdout.truncated {
                    ExecutionResult::failure(
                        name,
                        ExecutionStatus::MalformedOutput,
                        format!("stdout exceeded {} bytes", self.max_output_bytes),
                    )
                } else {
                    parse_stdout(name, &stdout_text)
                };
                result
                    .with_output(stdout_text, stderr_text)
                    .with_exit_code(status.code())
            }
        }
    }

    /// Read a pipe to EOF, keeping at most `max_output_bytes`.
    ///
    /// The pipe is drained past the limit so the child never blocks on a
    /// full pipe.
    fn capture<R>(&self, mut pipe: R) -> PipeReader
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let limit = self.max_output_bytes;
        let buffer = Arc::new(Mutex::new(Captured::default()));
        let sink = Arc::clone(&buffer);
        let task = tokio::spawn(async move {
            let mut buf = [0u8; 8192];
            loop {
                let n = match pipe.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                let mut captured = sink.lock().unwrap_or_else(|p| p.into_inner());
                let room = limit.saturating_sub(captured.bytes.len());
                if n > room {
                    captured.truncated = true;
                }
                captured.bytes.extend_from_slice(&buf[..n.min(room)]);
            }
        });
        PipeReader { buffer, task }
    }
}

async fn collect(reader: Option<PipeReader>) -> Captured {
    let Some(PipeReader { buffer, mut task }) = reader else {
        return Captured::default();
    };
    if tokio::time::timeout(READER_GRACE, &mut task).await.is_err() {
        // A descendant outside the process group still holds the pipe
        task.abort();
        debug!("Pipe still open after tool exit, keeping partial output");
    }
    let mut captured = buffer.lock().unwrap_or_else(|p| p.into_inner());
    std::mem::take(&mut *captured)
}

/// SIGKILL every process in the tool's group. False when none was left.
#[cfg(unix)]
fn signal_group(pgid: Option<u32>) -> bool {
    let Some(pid) = pgid else {
        return false;
    };
    // SAFETY: signalling a process group we created; no memory involved
    unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) == 0 }
}

#[cfg(not(unix))]
fn signal_group(_pgid: Option<u32>) -> bool {
    false
}

async fn kill_process_group(child: &mut Child, pgid: Option<u32>) {
    if !signal_group(pgid) {
        warn!(pid = ?pgid, "Failed to kill tool process group");
    }
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Tool process already gone");
    }
    let _ = child.wait().await;
}

/// stdout must be exactly one JSON object (surrounding whitespace allowed)
fn parse_stdout(name: &str, stdout: &str) -> ExecutionResult {
    match serde_json::from_str::<Value>(stdout.trim()) {
        Ok(value @ Value::Object(_)) => ExecutionResult::ok(name, value),
        Ok(_) => ExecutionResult::failure(
            name,
            ExecutionStatus::MalformedOutput,
            "stdout is JSON but not an object",
        ),
        Err(e) => ExecutionResult::failure(
            name,
            ExecutionStatus::MalformedOutput,
            format!("stdout is not a single JSON document: {}", e),
        ),
    }
}

/// Resolve the executable and any arguments embedded in the entry point.
///
/// - `./run.sh`, `bin/tool`: relative to the descriptor's directory
/// - `/opt/tool`: used as is
/// - `python3 main.py`: program looked up on `PATH`, `main.py` resolved
///   against the descriptor's directory when it exists there
pub fn resolve_entry_point(descriptor: &ToolDescriptor) -> Result<(PathBuf, Vec<String>), String> {
    let mut parts = descriptor.entry_point.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| "entry point is empty".to_string())?;
    let base = descriptor.base_dir();

    let leading: Vec<String> = parts
        .map(|arg| match base.map(|b| b.join(arg)) {
            Some(candidate) if !Path::new(arg).is_absolute() && candidate.exists() => {
                candidate.to_string_lossy().into_owned()
            }
            _ => arg.to_string(),
        })
        .collect();

    let looks_like_path = program.contains(std::path::MAIN_SEPARATOR) || program.contains('/');
    if looks_like_path {
        let path = Path::new(program);
        let resolved = match base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        if !resolved.is_file() {
            return Err(format!("entry point not found: {}", resolved.display()));
        }
        return Ok((resolved, leading));
    }

    which::which(program)
        .map(|p| (p, leading))
        .map_err(|_| format!("command not found on PATH: {}", program))
}

/// `--name value` for every non-null parameter: declared parameters first in
/// declaration order, then the rest sorted by name.
pub fn encode_arguments(descriptor: &ToolDescriptor, params: &Parameters) -> Vec<String> {
    let mut names: Vec<&str> = descriptor
        .declared_parameters
        .iter()
        .map(|p| p.name.as_str())
        .filter(|n| params.contains_key(*n))
        .collect();
    let mut extra: Vec<&str> = params
        .keys()
        .map(String::as_str)
        .filter(|k| descriptor.parameter(k).is_none())
        .collect();
    extra.sort_unstable();
    names.extend(extra);

    let mut args = Vec::with_capacity(names.len() * 2);
    for name in names {
        let value = match params.get(name) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        args.push(format!("--{}", name));
        args.push(value);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use sciquorum_domain::{DeclaredParameter, InvocationMode};
    use serde_json::json;

    fn params(value: Value) -> Parameters {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_encode_arguments_order_and_values() {
        let descriptor = ToolDescriptor::new("t", InvocationMode::Process, "t")
            .with_parameter(DeclaredParameter::new("query", true))
            .with_parameter(DeclaredParameter::new("limit", false));
        let args = encode_arguments(
            &descriptor,
            &params(json!({
                "zeta": true,
                "limit": 5,
                "query": "crispr",
                "alpha": ["a", "b"],
                "skip": null,
            })),
        );
        assert_eq!(
            args,
            vec![
                "--query", "crispr", "--limit", "5", "--alpha", "[\"a\",\"b\"]", "--zeta", "true"
            ]
        );
    }

    #[test]
    fn test_resolve_missing_command() {
        let descriptor =
            ToolDescriptor::new("t", InvocationMode::Process, "definitely-not-a-real-binary-xyz");
        assert!(resolve_entry_point(&descriptor).is_err());
    }

    #[test]
    fn test_resolve_missing_relative_path() {
        let descriptor = ToolDescriptor::new("t", InvocationMode::Process, "./missing.sh")
            .with_source("/nonexistent/dir/SKILL.md", "h");
        let err = resolve_entry_point(&descriptor).unwrap_err();
        assert!(err.contains("/nonexistent/dir/missing.sh"));
    }

    #[test]
    fn test_parse_stdout_rules() {
        assert!(parse_stdout("t", " {\"a\": 1}\n").is_ok());
        assert_eq!(
            parse_stdout("t", "[1, 2]").status(),
            ExecutionStatus::MalformedOutput
        );
        assert_eq!(
            parse_stdout("t", "{\"a\":1}\n{\"b\":2}").status(),
            ExecutionStatus::MalformedOutput
        );
        assert_eq!(
            parse_stdout("t", "progress...\n{\"a\":1}").status(),
            ExecutionStatus::MalformedOutput
        );
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::time::Instant;

        fn script(dir: &Path, body: &str) -> ToolDescriptor {
            let path = dir.join("tool.sh");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            ToolDescriptor::new("script", InvocationMode::Process, "./tool.sh")
                .with_parameter(DeclaredParameter::new("name", false))
                .with_source(dir.join("SKILL.md"), "h")
        }

        async fn run(descriptor: &ToolDescriptor, p: Value, timeout: Duration) -> ExecutionResult {
            ProcessRunner::default()
                .invoke(descriptor, &params(p), timeout, &CancellationToken::new())
                .await
        }

        #[tokio::test]
        async fn test_ok_with_arguments() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(
                dir.path(),
                r#"echo "log line" >&2
echo "{\"args\": \"$*\"}""#,
            );
            let result = run(&tool, json!({"name": "x"}), Duration::from_secs(5)).await;
            assert!(result.is_ok(), "{:?}", result);
            assert_eq!(result.payload().unwrap()["args"], json!("--name x"));
            assert!(result.raw_stderr.contains("log line"));
            assert_eq!(result.exit_code, Some(0));
        }

        #[tokio::test]
        async fn test_non_zero_exit() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(dir.path(), "echo '{}'; echo oops >&2; exit 3");
            let result = run(&tool, json!({}), Duration::from_secs(5)).await;
            assert_eq!(result.status(), ExecutionStatus::NonZeroExit);
            assert_eq!(result.exit_code, Some(3));
            assert!(result.payload().is_none());
        }

        #[tokio::test]
        async fn test_malformed_output() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(dir.path(), "echo 'not json'");
            let result = run(&tool, json!({}), Duration::from_secs(5)).await;
            assert_eq!(result.status(), ExecutionStatus::MalformedOutput);
            assert_eq!(result.raw_stdout.trim(), "not json");
        }

        #[tokio::test]
        async fn test_timeout_kills_process_group() {
            let dir = tempfile::tempdir().unwrap();
            // the background sleep holds stdout open unless the group dies
            let tool = script(dir.path(), "sleep 30 &\nsleep 30\necho '{}'");
            let started = Instant::now();
            let result = run(&tool, json!({}), Duration::from_millis(200)).await;
            assert_eq!(result.status(), ExecutionStatus::Timeout);
            assert!(started.elapsed() < Duration::from_secs(3));
        }

        #[tokio::test]
        async fn test_background_child_does_not_lose_output() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(dir.path(), "echo '{\"ok\": true}'\nsleep 5 &\nexit 0");
            let started = Instant::now();
            let result = run(&tool, json!({}), Duration::from_secs(10)).await;
            assert!(result.is_ok(), "{:?}", result);
            assert_eq!(result.payload().unwrap()["ok"], json!(true));
            assert!(started.elapsed() < Duration::from_secs(3));
        }

        #[tokio::test]
        async fn test_cancellation() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(dir.path(), "sleep 30");
            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                trigger.cancel();
            });
            let result = ProcessRunner::default()
                .invoke(&tool, &Parameters::new(), Duration::from_secs(30), &cancel)
                .await;
            assert_eq!(result.status(), ExecutionStatus::InternalError);
            assert_eq!(result.error_summary().as_deref(), Some("invocation cancelled"));
        }

        #[tokio::test]
        async fn test_oversized_output_is_malformed() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(dir.path(), "head -c 5000 /dev/zero | tr '\\0' 'a'");
            let result = ProcessRunner::new(100)
                .invoke(&tool, &Parameters::new(), Duration::from_secs(5), &CancellationToken::new())
                .await;
            assert_eq!(result.status(), ExecutionStatus::MalformedOutput);
            assert_eq!(result.raw_stdout.len(), 100);
        }

        #[tokio::test]
        async fn test_bare_command_on_path() {
            let descriptor = ToolDescriptor::new("echo", InvocationMode::Process, "echo {}");
            let result = run(&descriptor, json!({}), Duration::from_secs(5)).await;
            // prints an empty JSON object
            assert!(result.is_ok(), "{:?}", result);
        }
    }
}
