//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Diagnostic log file (in addition to stderr)
    pub file: Option<PathBuf>,
    /// Directory for per-session JSONL transcripts (`None` = no transcripts)
    pub transcript_dir: Option<PathBuf>,
}
