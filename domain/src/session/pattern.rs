//! Workflow patterns and their instantiation into steps.
//!
//! | Pattern | Dependency shape |
//! |---------|------------------|
//! | `chain` | each link depends on the previous one |
//! | `validation_chain` | investigator → N validators (parallel) → synthesizer |
//! | `parallel_fan_out` | N independent branches → one aggregator |
//! | `parallel_screening` | K screeners over disjoint input slices → one aggregator |
//! | `staged_pipeline` | every step of a stage depends on all steps of the previous stage |
//!
//! Patterns are plain data and deserialize from workflow files:
//!
//! ```toml
//! topic = "CRISPR off-target effects"
//!
//! [pattern]
//! kind = "chain"
//!
//! [[pattern.links]]
//! id = "search"
//! tools = ["pubmed"]
//!
//! [[pattern.links]]
//! id = "critique"
//! role = "critic"
//! ```

use super::step::{StepRole, WorkflowStep};
use crate::core::error::DomainError;
use crate::tool::template::ParamTemplate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declarative description of one step inside a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTemplate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Defaults to the role implied by the step's position in the pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<StepRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<String>,
    #[serde(default, alias = "tool_names", skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default, alias = "params", skip_serializing_if = "ParamTemplate::is_empty")]
    pub parameters: ParamTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

impl StepTemplate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            role: None,
            participant: None,
            tools: Vec::new(),
            parameters: ParamTemplate::default(),
            input: None,
        }
    }

    pub fn with_role(mut self, role: StepRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn with_parameters(mut self, parameters: ParamTemplate) -> Self {
        self.parameters = parameters;
        self
    }

    fn build(&self, default_role: StepRole) -> WorkflowStep {
        let role = self.role.unwrap_or(default_role);
        let mut step = WorkflowStep::new(self.id.clone(), role)
            .with_parameters(self.parameters.clone());
        if let Some(name) = &self.name {
            step = step.with_name(name.clone());
        }
        if let Some(participant) = &self.participant {
            step = step.with_participant(participant.clone());
        }
        if let Some(input) = &self.input {
            step = step.with_input(input.clone());
        }
        step.tool_names = self.tools.clone();
        step
    }
}

/// A named group of steps in a staged pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub steps: Vec<StepTemplate>,
}

/// Dependency shape of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowPattern {
    Chain {
        links: Vec<StepTemplate>,
    },
    ValidationChain {
        investigator: StepTemplate,
        validators: Vec<StepTemplate>,
        synthesizer: StepTemplate,
    },
    ParallelFanOut {
        branches: Vec<StepTemplate>,
        aggregator: StepTemplate,
    },
    /// `slices` copies of `screener`, each given a disjoint chunk of `inputs`
    ParallelScreening {
        screener: StepTemplate,
        inputs: Vec<Value>,
        slices: usize,
        aggregator: StepTemplate,
    },
    StagedPipeline {
        stages: Vec<Stage>,
    },
}

impl WorkflowPattern {
    pub fn kind(&self) -> &str {
        match self {
            WorkflowPattern::Chain { .. } => "chain",
            WorkflowPattern::ValidationChain { .. } => "validation_chain",
            WorkflowPattern::ParallelFanOut { .. } => "parallel_fan_out",
            WorkflowPattern::ParallelScreening { .. } => "parallel_screening",
            WorkflowPattern::StagedPipeline { .. } => "staged_pipeline",
        }
    }

    /// Expand the pattern into `Pending` steps with their `depends_on` sets.
    ///
    /// Graph-level checks (unique ids, known dependencies, acyclicity) are
    /// done by [`Session::new`](super::entities::Session::new).
    pub fn instantiate(&self) -> Result<Vec<WorkflowStep>, DomainError> {
        match self {
            WorkflowPattern::Chain { links } => {
                if links.is_empty() {
                    return Err(DomainError::InvalidPattern(
                        "chain needs at least one link".to_string(),
                    ));
                }
                let mut steps: Vec<WorkflowStep> = Vec::with_capacity(links.len());
                for (i, link) in links.iter().enumerate() {
                    let default_role = if i == 0 {
                        StepRole::Investigator
                    } else {
                        StepRole::Analyst
                    };
                    let mut step = link.build(default_role);
                    if let Some(prev) = steps.last() {
                        step.depends_on.insert(prev.id.clone());
                    }
                    steps.push(step);
                }
                Ok(steps)
            }
            WorkflowPattern::ValidationChain {
                investigator,
                validators,
                synthesizer,
            } => {
                let lead = investigator.build(StepRole::Investigator);
                let mut steps = vec![lead.clone()];
                for validator in validators {
                    steps.push(validator.build(StepRole::Validator).with_dependency(&lead.id));
                }
                let mut synth = synthesizer.build(StepRole::Synthesizer);
                if validators.is_empty() {
                    synth.depends_on.insert(lead.id.clone());
                } else {
                    synth
                        .depends_on
                        .extend(validators.iter().map(|v| v.id.clone()));
                }
                steps.push(synth);
                Ok(steps)
            }
            WorkflowPattern::ParallelFanOut {
                branches,
                aggregator,
            } => {
                if branches.is_empty() {
                    return Err(DomainError::InvalidPattern(
                        "fan-out needs at least one branch".to_string(),
                    ));
                }
                let mut steps: Vec<WorkflowStep> = branches
                    .iter()
                    .map(|b| b.build(StepRole::Investigator))
                    .collect();
                let mut agg = aggregator.build(StepRole::Aggregator);
                agg.depends_on.extend(steps.iter().map(|s| s.id.clone()));
                steps.push(agg);
                Ok(steps)
            }
            WorkflowPattern::ParallelScreening {
                screener,
                inputs,
                slices,
                aggregator,
            } => {
                if *slices == 0 {
                    return Err(DomainError::InvalidPattern(
                        "screening needs at least one slice".to_string(),
                    ));
                }
                let chunks = split_disjoint(inputs, *slices);
                let mut steps: Vec<WorkflowStep> = chunks
                    .into_iter()
                    .enumerate()
                    .map(|(i, chunk)| {
                        let mut template = screener.clone();
                        template.id = format!("{}-{}", screener.id, i + 1);
                        template.participant = None;
                        template.input = Some(Value::Array(chunk));
                        template.build(StepRole::Screener)
                    })
                    .collect();
                let mut agg = aggregator.build(StepRole::Aggregator);
                agg.depends_on.extend(steps.iter().map(|s| s.id.clone()));
                steps.push(agg);
                Ok(steps)
            }
            WorkflowPattern::StagedPipeline { stages } => {
                if stages.is_empty() {
                    return Err(DomainError::InvalidPattern(
                        "pipeline needs at least one stage".to_string(),
                    ));
                }
                let mut steps = Vec::new();
                let mut previous: Vec<String> = Vec::new();
                for stage in stages {
                    if stage.steps.is_empty() {
                        return Err(DomainError::InvalidPattern(format!(
                            "stage '{}' has no steps",
                            stage.name
                        )));
                    }
                    let mut current = Vec::with_capacity(stage.steps.len());
                    for template in &stage.steps {
                        let mut step = template.build(StepRole::Analyst);
                        if template.name.is_none() {
                            step.name = format!("{}/{}", stage.name, template.id);
                        }
                        step.depends_on.extend(previous.iter().cloned());
                        current.push(step.id.clone());
                        steps.push(step);
                    }
                    previous = current;
                }
                Ok(steps)
            }
        }
    }
}

/// Split `items` into at most `k` contiguous, non-empty, disjoint chunks
/// whose sizes differ by at most one. An empty input yields one empty chunk.
fn split_disjoint(items: &[Value], k: usize) -> Vec<Vec<Value>> {
    if items.is_empty() {
        return vec![Vec::new()];
    }
    let k = k.min(items.len());
    let base = items.len() / k;
    let extra = items.len() % k;
    let mut chunks = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let len = base + usize::from(i < extra);
        chunks.push(items[start..start + len].to_vec());
        start += len;
    }
    chunks
}

/// A workflow file: the topic to investigate and the pattern to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub topic: String,
    /// Seed input available to every step as `{{seed}}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<Value>,
    pub pattern: WorkflowPattern,
}

impl WorkflowDefinition {
    pub fn new(topic: impl Into<String>, pattern: WorkflowPattern) -> Self {
        Self {
            topic: topic.into(),
            seed: None,
            pattern,
        }
    }

    pub fn with_seed(mut self, seed: Value) -> Self {
        self.seed = Some(seed);
        self
    }
}
