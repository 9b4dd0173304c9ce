//! Publication configuration from TOML (`[publication]` section)
//!
//! ```toml
//! [publication]
//! kind = "directory"
//! target = "./reports"
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationKind {
    /// Finalized reports are not published
    #[default]
    None,
    /// Write reports into the `target` directory
    Directory,
    /// POST reports to the `target` URL
    Http,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePublicationConfig {
    pub kind: PublicationKind,
    /// Directory path or URL, depending on `kind`
    pub target: Option<String>,
}
