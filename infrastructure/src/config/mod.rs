//! Configuration file loading for sciquorum
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment: `SCIQUORUM_<SECTION>__<KEY>`
//! 2. `--config <path>` specified file
//! 3. Project root: `./sciquorum.toml` or `./.sciquorum.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/sciquorum/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileCompletionConfig, FileConfig, FileExecutorConfig,
    FileLoggingConfig, FileOutputConfig, FileOutputFormat, FilePublicationConfig,
    FileRegistryConfig, FileSelectorConfig, FileWorkflowConfig, PublicationKind,
};
pub use loader::ConfigLoader;
