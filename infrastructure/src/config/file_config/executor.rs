//! Executor configuration from TOML (`[executor]` section)

use crate::tools::DEFAULT_MAX_OUTPUT_BYTES;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExecutorConfig {
    /// Timeout for a single `invoke` from the CLI
    pub default_timeout_secs: u64,
    /// Cap on captured stdout/stderr per invocation
    pub max_output_bytes: usize,
}

impl Default for FileExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 120,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl FileExecutorConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}
