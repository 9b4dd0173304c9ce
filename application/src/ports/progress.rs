//! Progress notification port
//!
//! Defines the interface for reporting progress while a workflow session runs.

use sciquorum_domain::{
    ConsensusReport, SessionId, SessionStatus, StepStatus, ToolRunSummary, Vote, WorkflowStep,
};

/// Callback for progress updates during a workflow session
///
/// Implementations live in the presentation layer.
pub trait WorkflowProgressNotifier: Send + Sync {
    /// Called when a step starts running
    fn on_step_start(&self, step: &WorkflowStep, total_steps: usize);

    /// Called when a step reaches a terminal state
    fn on_step_complete(&self, step_id: &str, status: StepStatus);

    fn on_session_status(&self, _session_id: &SessionId, _status: SessionStatus) {}

    fn on_step_skipped(&self, _step_id: &str) {}

    fn on_tool_result(&self, _step_id: &str, _summary: &ToolRunSummary) {}

    fn on_tool_retry(&self, _step_id: &str, _tool_name: &str, _attempt: u32, _max_attempts: u32) {}

    fn on_vote(&self, _finding_id: &str, _participant: &str, _vote: Vote) {}

    fn on_consensus(&self, _report: &ConsensusReport) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoWorkflowProgress;

impl WorkflowProgressNotifier for NoWorkflowProgress {
    fn on_step_start(&self, _step: &WorkflowStep, _total_steps: usize) {}
    fn on_step_complete(&self, _step_id: &str, _status: StepStatus) {}
}

/// A progress notifier that delegates to multiple inner notifiers.
pub struct CompositeWorkflowProgress<'a> {
    delegates: Vec<&'a dyn WorkflowProgressNotifier>,
}

impl<'a> CompositeWorkflowProgress<'a> {
    pub fn new(delegates: Vec<&'a dyn WorkflowProgressNotifier>) -> Self {
        Self { delegates }
    }
}

/// Macro to delegate a method call to all inner notifiers.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        for d in &$self.delegates {
            d.$method($($arg),*);
        }
    };
}

impl WorkflowProgressNotifier for CompositeWorkflowProgress<'_> {
    fn on_step_start(&self, step: &WorkflowStep, total_steps: usize) {
        delegate!(self, on_step_start, step, total_steps);
    }

    fn on_step_complete(&self, step_id: &str, status: StepStatus) {
        delegate!(self, on_step_complete, step_id, status);
    }

    fn on_session_status(&self, session_id: &SessionId, status: SessionStatus) {
        delegate!(self, on_session_status, session_id, status);
    }

    fn on_step_skipped(&self, step_id: &str) {
        delegate!(self, on_step_skipped, step_id);
    }

    fn on_tool_result(&self, step_id: &str, summary: &ToolRunSummary) {
        delegate!(self, on_tool_result, step_id, summary);
    }

    fn on_tool_retry(&self, step_id: &str, tool_name: &str, attempt: u32, max_attempts: u32) {
        delegate!(self, on_tool_retry, step_id, tool_name, attempt, max_attempts);
    }

    fn on_vote(&self, finding_id: &str, participant: &str, vote: Vote) {
        delegate!(self, on_vote, finding_id, participant, vote);
    }

    fn on_consensus(&self, report: &ConsensusReport) {
        delegate!(self, on_consensus, report);
    }
}
