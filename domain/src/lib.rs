//! Domain layer for sciquorum
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Tools
//!
//! A tool ("skill") is an external executable, in-process library call, or
//! HTTP endpoint described by a [`ToolDescriptor`]. Descriptors are grouped in
//! an immutable [`Catalog`] that supports keyword search and suggestion.
//!
//! ## Selection
//!
//! A [`SelectionDecision`] records which tools were chosen for a topic, why,
//! and whether the deterministic keyword fallback was used.
//!
//! ## Sessions
//!
//! A [`Session`] is one coordinated investigation: a dependency graph of
//! [`WorkflowStep`]s built from a [`WorkflowPattern`], the [`Finding`]s those
//! steps produced, and the votes cast on them.
//!
//! ## Quorum
//!
//! Findings reach consensus through agree/disagree/abstain [`Vote`]s.
//! The consensus score is `agree / (agree + disagree)`; abstentions are
//! excluded and a Finding nobody voted on scores zero.

pub mod core;
pub mod prompt;
pub mod quorum;
pub mod selection;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use core::{error::DomainError, string::truncate};
pub use prompt::SelectionPrompt;
pub use quorum::{ConsensusOutcome, ConsensusReport, FindingConsensus, Vote, VoteTally};
pub use selection::{
    SelectionDecision, parse_selection_response, rank_by_keyword_overlap, significant_words,
};
pub use session::{
    entities::{AbandonReason, Participant, Session, SessionId, SessionStatus},
    finding::{EvidenceRef, Finding, FindingContent},
    pattern::{Stage, StepTemplate, WorkflowDefinition, WorkflowPattern},
    step::{StepOutcome, StepRole, StepStatus, ToolRunSummary, WorkflowStep},
};
pub use tool::{
    catalog::{Catalog, CatalogStats, SearchFilter},
    entities::{DeclaredParameter, InvocationMode, Parameters, ToolDescriptor},
    library::{LibraryError, LibraryTool},
    template::{ParamTemplate, TemplateContext},
    value_objects::{ExecutionResult, ExecutionStatus},
};
