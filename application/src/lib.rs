//! Application layer for sciquorum
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{SelectorParams, WorkflowParams};
pub use ports::{
    progress::{CompositeWorkflowProgress, NoWorkflowProgress, WorkflowProgressNotifier},
    publication::{PublicationAdapter, PublishError},
    session_store::{NoSessionStore, SessionStore, SessionSummary, StoreError},
    text_completion::{CompletionError, TextCompletion},
    tool_catalog::{FixedCatalog, ToolCatalogPort},
    tool_executor::{ChainLink, ToolExecutorPort},
    workflow_logger::{NoWorkflowLogger, WorkflowEvent, WorkflowEventLogger},
};
pub use use_cases::run_workflow::{
    ExecutionEnd, RunWorkflowError, RunWorkflowOutput, WorkflowOrchestrator,
};
pub use use_cases::select_tools::{SelectionError, ToolSelector};
