//! Workflow steps: one node of a session's dependency graph.

use crate::tool::template::ParamTemplate;
use crate::tool::value_objects::{ExecutionResult, ExecutionStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Per-step lifecycle.
///
/// ```text
/// Pending ─▶ Ready ─▶ Running ─▶ Done | Failed
///    └──────────────────────────▶ Skipped   (a dependency Failed/Skipped)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Ready,
    Running,
    Done,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Ready => "ready",
            StepStatus::Running => "running",
            StepStatus::Done => "done",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Done | StepStatus::Failed | StepStatus::Skipped
        )
    }

    /// A dependency in this state prevents its dependents from ever running
    pub fn blocks_dependents(&self) -> bool {
        matches!(self, StepStatus::Failed | StepStatus::Skipped)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Logical participant type of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepRole {
    Investigator,
    Validator,
    Critic,
    Synthesizer,
    Screener,
    Aggregator,
    Analyst,
}

impl StepRole {
    pub fn as_str(&self) -> &str {
        match self {
            StepRole::Investigator => "investigator",
            StepRole::Validator => "validator",
            StepRole::Critic => "critic",
            StepRole::Synthesizer => "synthesizer",
            StepRole::Screener => "screener",
            StepRole::Aggregator => "aggregator",
            StepRole::Analyst => "analyst",
        }
    }

    /// Reviewers vote on the Findings of the steps they depend on
    pub fn is_reviewer(&self) -> bool {
        matches!(self, StepRole::Validator | StepRole::Critic)
    }
}

impl std::fmt::Display for StepRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StepRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "investigator" => Ok(StepRole::Investigator),
            "validator" => Ok(StepRole::Validator),
            "critic" => Ok(StepRole::Critic),
            "synthesizer" | "synthesiser" => Ok(StepRole::Synthesizer),
            "screener" => Ok(StepRole::Screener),
            "aggregator" => Ok(StepRole::Aggregator),
            "analyst" => Ok(StepRole::Analyst),
            other => Err(format!("Unknown step role: {}", other)),
        }
    }
}

/// Compact record of one tool invocation inside a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRunSummary {
    pub tool_name: String,
    pub status: ExecutionStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of invocations including retries
    #[serde(default = "one")]
    pub attempts: u32,
}

fn one() -> u32 {
    1
}

impl ToolRunSummary {
    pub fn from_result(result: &ExecutionResult, attempts: u32) -> Self {
        Self {
            tool_name: result.tool_name.clone(),
            status: result.status(),
            duration_ms: result.duration_ms,
            error: result.error_summary(),
            attempts,
        }
    }
}

/// What happened when a step ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// `Ok` if at least one tool succeeded, otherwise the last failure status
    pub status: ExecutionStatus,
    pub tools: Vec<ToolRunSummary>,
    /// Finding produced by the step, if it completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finding_id: Option<String>,
    /// The selector fell back to keyword ranking when choosing tools
    #[serde(default)]
    pub used_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn new(status: ExecutionStatus, tools: Vec<ToolRunSummary>) -> Self {
        Self {
            status,
            tools,
            finding_id: None,
            used_fallback: false,
            error: None,
        }
    }

    pub fn with_fallback(mut self, used_fallback: bool) -> Self {
        self.used_fallback = used_fallback;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// One node in the dependency graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub name: String,
    pub role: StepRole,
    /// Participant identity acting for this step
    pub participant: String,
    /// Tools this step may invoke; empty means "select from the catalog"
    pub tool_names: Vec<String>,
    pub depends_on: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "ParamTemplate::is_empty")]
    pub parameters: ParamTemplate,
    /// Step-specific input (e.g. a screening slice), exposed as `{{seed}}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<StepOutcome>,
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>, role: StepRole) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            participant: format!("{}:{}", role, id),
            id,
            role,
            tool_names: Vec::new(),
            depends_on: BTreeSet::new(),
            parameters: ParamTemplate::default(),
            input: None,
            status: StepStatus::Pending,
            outcome: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_participant(mut self, participant: impl Into<String>) -> Self {
        self.participant = participant.into();
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool_names.push(tool.into());
        self
    }

    pub fn with_dependency(mut self, step_id: impl Into<String>) -> Self {
        self.depends_on.insert(step_id.into());
        self
    }

    pub fn with_parameters(mut self, parameters: ParamTemplate) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn is_reviewer(&self) -> bool {
        self.role.is_reviewer()
    }
}
