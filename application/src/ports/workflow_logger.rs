//! Port for structured workflow transcripts.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port captures the session
//! transcript (status changes, step runs, tool results, votes) in a
//! machine-readable format (JSONL).

use serde_json::Value;

/// A structured workflow event.
pub struct WorkflowEvent {
    /// Event type identifier (e.g., "step_started", "tool_result", "vote_cast").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl WorkflowEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging workflow events.
///
/// `log` is synchronous and non-fallible; implementations swallow their own
/// write errors so that logging never disrupts a session.
pub trait WorkflowEventLogger: Send + Sync {
    fn log(&self, event: WorkflowEvent);
}

/// No-op implementation for tests and when transcripts are disabled.
pub struct NoWorkflowLogger;

impl WorkflowEventLogger for NoWorkflowLogger {
    fn log(&self, _event: WorkflowEvent) {}
}
