//! Selector parameters.

use sciquorum_domain::selection::DEFAULT_MAX_CHOSEN;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Controls how [`ToolSelector`](crate::use_cases::select_tools::ToolSelector)
/// talks to the text-completion capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorParams {
    /// Default cap on chosen tools
    pub max_chosen: usize,
    /// A completion call running longer than this triggers the fallback
    pub completion_timeout: Duration,
}

impl Default for SelectorParams {
    fn default() -> Self {
        Self {
            max_chosen: DEFAULT_MAX_CHOSEN,
            completion_timeout: Duration::from_secs(60),
        }
    }
}

impl SelectorParams {
    pub fn with_max_chosen(mut self, max: usize) -> Self {
        self.max_chosen = max;
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }
}
