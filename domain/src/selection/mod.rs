//! Tool selection domain
//!
//! - [`SelectionDecision`]: which tools were chosen for a topic and why
//! - [`ranking`]: deterministic keyword-overlap scoring, shared by catalog
//!   suggestion and the selector fallback
//! - [`parsing`]: turning a text-completion response into a decision

pub mod parsing;
pub mod ranking;

pub use parsing::{ParsedChoice, parse_selection_response};
pub use ranking::{rank_by_keyword_overlap, significant_words};

use crate::tool::entities::Parameters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default cap on the number of tools chosen for one task.
pub const DEFAULT_MAX_CHOSEN: usize = 5;

/// Output of the selector for one task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionDecision {
    /// Chosen tool names, best first, never longer than the requested cap
    pub chosen_tools: Vec<String>,
    pub rationale_per_tool: BTreeMap<String, String>,
    pub suggested_parameters: BTreeMap<String, Parameters>,
    /// True when the text-completion capability was unavailable or unusable
    pub used_fallback: bool,
}

impl SelectionDecision {
    pub fn is_empty(&self) -> bool {
        self.chosen_tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chosen_tools.len()
    }

    pub fn rationale(&self, tool: &str) -> Option<&str> {
        self.rationale_per_tool.get(tool).map(String::as_str)
    }

    pub fn parameters_for(&self, tool: &str) -> Option<&Parameters> {
        self.suggested_parameters.get(tool)
    }
}
