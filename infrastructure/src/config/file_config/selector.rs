//! Selector configuration from TOML (`[selector]` section)

use sciquorum_application::SelectorParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSelectorConfig {
    pub max_chosen: usize,
    pub completion_timeout_secs: u64,
}

impl Default for FileSelectorConfig {
    fn default() -> Self {
        let params = SelectorParams::default();
        Self {
            max_chosen: params.max_chosen,
            completion_timeout_secs: params.completion_timeout.as_secs(),
        }
    }
}

impl FileSelectorConfig {
    pub fn to_params(&self) -> SelectorParams {
        SelectorParams::default()
            .with_max_chosen(self.max_chosen)
            .with_completion_timeout(Duration::from_secs(self.completion_timeout_secs))
    }
}
