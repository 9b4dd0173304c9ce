//! Workflow session domain.
//!
//! - [`entities::Session`]: the aggregate: participants, steps, findings, status
//! - [`step::WorkflowStep`]: one node of the dependency graph
//! - [`finding::Finding`]: a claim subject to peer voting
//! - [`pattern::WorkflowPattern`]: declarative dependency shapes (chain, fan-out, pipeline)
//!
//! The session is pure data plus transition logic. Whoever owns a `Session`
//! value owns all of its state; the orchestrator is the only owner at run time.

pub mod entities;
pub mod finding;
pub mod pattern;
pub mod step;
