//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section is optional; missing keys take their defaults.

mod completion;
mod executor;
mod logging;
mod output;
mod publication;
mod registry;
mod selector;
mod workflow;

pub use completion::FileCompletionConfig;
pub use executor::FileExecutorConfig;
pub use logging::FileLoggingConfig;
pub use output::{FileOutputConfig, FileOutputFormat};
pub use publication::{FilePublicationConfig, PublicationKind};
pub use registry::FileRegistryConfig;
pub use selector::FileSelectorConfig;
pub use workflow::FileWorkflowConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    Zero(&'static str),

    #[error("workflow.consensus_threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("registry.descriptor_glob cannot be empty")]
    EmptyGlob,

    #[error("publication.target is required when publication.kind = \"{0}\"")]
    MissingPublicationTarget(&'static str),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub registry: FileRegistryConfig,
    pub executor: FileExecutorConfig,
    pub selector: FileSelectorConfig,
    pub completion: FileCompletionConfig,
    pub workflow: FileWorkflowConfig,
    pub publication: FilePublicationConfig,
    pub logging: FileLoggingConfig,
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the configuration, reporting the first problem found.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let zero_checks: [(&'static str, bool); 7] = [
            ("selector.max_chosen", self.selector.max_chosen == 0),
            (
                "selector.completion_timeout_secs",
                self.selector.completion_timeout_secs == 0,
            ),
            ("workflow.max_parallel", self.workflow.max_parallel == 0),
            ("workflow.step_timeout_secs", self.workflow.step_timeout_secs == 0),
            (
                "workflow.wall_clock_budget_secs",
                self.workflow.wall_clock_budget_secs == 0,
            ),
            (
                "executor.default_timeout_secs",
                self.executor.default_timeout_secs == 0,
            ),
            ("executor.max_output_bytes", self.executor.max_output_bytes == 0),
        ];
        if let Some((field, _)) = zero_checks.iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigValidationError::Zero(field));
        }

        let threshold = self.workflow.consensus_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigValidationError::ThresholdOutOfRange(threshold));
        }

        if self.registry.descriptor_glob.trim().is_empty() {
            return Err(ConfigValidationError::EmptyGlob);
        }

        let target_missing = self
            .publication
            .target
            .as_deref()
            .is_none_or(|t| t.trim().is_empty());
        match self.publication.kind {
            PublicationKind::Directory if target_missing => {
                return Err(ConfigValidationError::MissingPublicationTarget("directory"));
            }
            PublicationKind::Http if target_missing => {
                return Err(ConfigValidationError::MissingPublicationTarget("http"));
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[registry]
root = "/srv/skills"
descriptor_glob = "**/*.skill.md"

[executor]
default_timeout_secs = 30

[selector]
max_chosen = 3

[completion]
endpoint = "http://localhost:11434"
model = "llama3.1"

[workflow]
max_parallel = 2
consensus_threshold = 0.75
max_step_retries = 1

[publication]
kind = "directory"
target = "./reports"

[logging]
transcript_dir = "./transcripts"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.registry.root, Some(PathBuf::from("/srv/skills")));
        assert_eq!(config.registry.descriptor_glob, "**/*.skill.md");
        assert_eq!(config.executor.default_timeout_secs, 30);
        assert_eq!(config.selector.max_chosen, 3);
        assert_eq!(config.completion.model.as_deref(), Some("llama3.1"));
        assert_eq!(config.workflow.max_parallel, 2);
        assert_eq!(config.publication.kind, PublicationKind::Directory);
        assert!(config.validate().is_ok());

        let params = config.workflow.to_params();
        assert_eq!(params.consensus_threshold, 0.75);
        assert_eq!(params.max_step_retries, 1);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: FileConfig = toml::from_str("[workflow]\nmax_parallel = 8\n").unwrap();
        assert_eq!(config.workflow.max_parallel, 8);
        assert_eq!(
            config.workflow.step_timeout_secs,
            FileWorkflowConfig::default().step_timeout_secs
        );
        assert_eq!(config.publication.kind, PublicationKind::None);
        assert!(config.output.color);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(FileConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_values() {
        let config: FileConfig = toml::from_str("[selector]\nmax_chosen = 0\n").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::Zero("selector.max_chosen"))
        );

        let config: FileConfig = toml::from_str("[workflow]\nstep_timeout_secs = 0\n").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::Zero("workflow.step_timeout_secs"))
        );
    }

    #[test]
    fn test_validate_threshold_range() {
        let config: FileConfig =
            toml::from_str("[workflow]\nconsensus_threshold = 1.5\n").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::ThresholdOutOfRange(1.5))
        );
    }

    #[test]
    fn test_validate_publication_target() {
        let config: FileConfig = toml::from_str("[publication]\nkind = \"http\"\n").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::MissingPublicationTarget("http"))
        );
    }
}
