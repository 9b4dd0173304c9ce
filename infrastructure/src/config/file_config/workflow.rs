//! Workflow configuration from TOML (`[workflow]` section)
//!
//! ```toml
//! [workflow]
//! max_parallel = 4
//! consensus_threshold = 0.66
//! wall_clock_budget_secs = 1800
//! step_timeout_secs = 120
//! max_step_retries = 1
//! ```

use sciquorum_application::WorkflowParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWorkflowConfig {
    pub max_parallel: usize,
    pub consensus_threshold: f64,
    pub wall_clock_budget_secs: u64,
    pub step_timeout_secs: u64,
    pub max_step_retries: u32,
    pub max_tools_per_step: usize,
    /// Where sessions are persisted (`None` = platform data dir)
    pub session_dir: Option<PathBuf>,
}

impl Default for FileWorkflowConfig {
    fn default() -> Self {
        let params = WorkflowParams::default();
        Self {
            max_parallel: params.max_parallel,
            consensus_threshold: params.consensus_threshold,
            wall_clock_budget_secs: params.wall_clock_budget.as_secs(),
            step_timeout_secs: params.step_timeout.as_secs(),
            max_step_retries: params.max_step_retries,
            max_tools_per_step: params.max_tools_per_step,
            session_dir: None,
        }
    }
}

impl FileWorkflowConfig {
    pub fn to_params(&self) -> WorkflowParams {
        WorkflowParams::default()
            .with_max_parallel(self.max_parallel)
            .with_consensus_threshold(self.consensus_threshold)
            .with_wall_clock_budget(Duration::from_secs(self.wall_clock_budget_secs))
            .with_step_timeout(Duration::from_secs(self.step_timeout_secs))
            .with_max_step_retries(self.max_step_retries)
            .with_max_tools_per_step(self.max_tools_per_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_params() {
        let params = FileWorkflowConfig::default().to_params();
        let defaults = WorkflowParams::default();
        assert_eq!(params.max_parallel, defaults.max_parallel);
        assert_eq!(params.wall_clock_budget, defaults.wall_clock_budget);
        assert_eq!(params.step_timeout, defaults.step_timeout);
    }
}
