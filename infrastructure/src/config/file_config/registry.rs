//! Registry configuration from TOML (`[registry]` section)
//!
//! ```toml
//! [registry]
//! root = "~/skills"
//! descriptor_glob = "**/SKILL.md"
//! cache_dir = "~/.cache/sciquorum/catalog"
//! ```

use crate::tools::DEFAULT_DESCRIPTOR_GLOB;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRegistryConfig {
    /// Directory tree scanned for descriptor files
    pub root: Option<PathBuf>,
    /// Glob matched relative to `root`
    pub descriptor_glob: String,
    /// Snapshot directory (`None` = platform cache dir)
    pub cache_dir: Option<PathBuf>,
    /// Disable the snapshot cache entirely
    pub no_cache: bool,
}

impl Default for FileRegistryConfig {
    fn default() -> Self {
        Self {
            root: None,
            descriptor_glob: DEFAULT_DESCRIPTOR_GLOB.to_string(),
            cache_dir: None,
            no_cache: false,
        }
    }
}
