//! Workflow parameters: orchestrator loop control.
//!
//! [`WorkflowParams`] groups the static parameters that control the
//! coordinator loop in [`WorkflowOrchestrator`](crate::use_cases::run_workflow::WorkflowOrchestrator).

use sciquorum_domain::quorum::DEFAULT_CONSENSUS_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestrator control parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowParams {
    /// Maximum number of steps running at the same time.
    pub max_parallel: usize,
    /// Minimum consensus score every top-level Finding must reach.
    pub consensus_threshold: f64,
    /// Wall-clock budget for the whole session while Active/ConsensusPending.
    pub wall_clock_budget: Duration,
    /// Timeout for each individual tool invocation.
    pub step_timeout: Duration,
    /// Re-invocations of a failing tool within one step (0 = no retry).
    pub max_step_retries: u32,
    /// Tools chosen by the selector for a step that names none.
    pub max_tools_per_step: usize,
}

impl Default for WorkflowParams {
    fn default() -> Self {
        Self {
            max_parallel: 5,
            consensus_threshold: DEFAULT_CONSENSUS_THRESHOLD,
            wall_clock_budget: Duration::from_secs(30 * 60),
            step_timeout: Duration::from_secs(120),
            max_step_retries: 0,
            max_tools_per_step: 3,
        }
    }
}

impl WorkflowParams {
    // ==================== Builder Methods ====================

    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel = max.max(1);
        self
    }

    pub fn with_consensus_threshold(mut self, threshold: f64) -> Self {
        self.consensus_threshold = threshold;
        self
    }

    pub fn with_wall_clock_budget(mut self, budget: Duration) -> Self {
        self.wall_clock_budget = budget;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn with_max_step_retries(mut self, retries: u32) -> Self {
        self.max_step_retries = retries;
        self
    }

    pub fn with_max_tools_per_step(mut self, max: usize) -> Self {
        self.max_tools_per_step = max.max(1);
        self
    }
}
