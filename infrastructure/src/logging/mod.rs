//! Logging infrastructure: the JSONL session transcript.
//!
//! Provides [`JsonlWorkflowLogger`], a JSONL file writer that implements
//! the [`WorkflowEventLogger`](sciquorum_application::WorkflowEventLogger) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlWorkflowLogger;
