//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod progress;
pub mod publication;
pub mod session_store;
pub mod text_completion;
pub mod tool_catalog;
pub mod tool_executor;
pub mod workflow_logger;
