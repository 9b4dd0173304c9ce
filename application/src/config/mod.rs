//! Application-level configuration.
//!
//! - [`WorkflowParams`]: orchestrator loop control (parallelism, budgets, retries)
//! - [`SelectorParams`]: tool selection bounds and completion timeout

pub mod selector_params;
pub mod workflow_params;

pub use selector_params::SelectorParams;
pub use workflow_params::WorkflowParams;
