//! Use cases: tool selection and workflow orchestration

pub mod run_workflow;
pub mod select_tools;
