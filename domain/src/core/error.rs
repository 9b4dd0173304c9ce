//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid workflow pattern: {0}")]
    InvalidPattern(String),

    #[error("Duplicate step id: {0}")]
    DuplicateStep(String),

    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("Dependency cycle detected at step '{0}'")]
    DependencyCycle(String),

    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Unknown finding: {0}")]
    UnknownFinding(String),

    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("Invalid transition for {subject}: {from} -> {to}")]
    InvalidTransition {
        subject: String,
        from: String,
        to: String,
    },

    #[error("Session {0} is closed")]
    SessionClosed(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }

    pub(crate) fn transition(
        subject: impl Into<String>,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        DomainError::InvalidTransition {
            subject: subject.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
