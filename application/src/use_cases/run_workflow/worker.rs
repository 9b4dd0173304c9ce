//! Step worker: tool resolution, selection and invocation for one step.
//!
//! A worker owns a snapshot of everything the step needs and never touches
//! the session; it reports back to the coordinator with a [`StepReport`].

use super::WorkflowOrchestrator;
use crate::ports::tool_catalog::ToolCatalogPort;
use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::select_tools::ToolSelector;
use sciquorum_domain::{ExecutionResult, Parameters, TemplateContext, ToolDescriptor, WorkflowStep};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything a worker needs, detached from the session
pub(super) struct StepJob {
    pub step: WorkflowStep,
    pub topic: String,
    pub seed: Option<Value>,
    pub upstream: BTreeMap<String, Value>,
}

/// One tool's final result and how many invocations it took
pub(super) struct ToolAttempt {
    pub result: ExecutionResult,
    pub attempts: u32,
}

/// What a worker hands back to the coordinator
pub(super) struct StepReport {
    pub step_id: String,
    pub attempts: Vec<ToolAttempt>,
    /// `(tool, attempt)` for every retry performed
    pub retries: Vec<(String, u32)>,
    pub used_fallback: bool,
    /// Set when the step could not run any tool at all
    pub error: Option<String>,
}

impl StepReport {
    fn new(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            attempts: Vec::new(),
            retries: Vec::new(),
            used_fallback: false,
            error: None,
        }
    }
}

/// Tools to run (or the names that could not be found) plus parameters
/// suggested by the selector
type ResolvedTools = (
    Vec<Result<Arc<ToolDescriptor>, String>>,
    BTreeMap<String, Parameters>,
);

/// Shared handles cloned into each worker task
#[derive(Clone)]
pub(super) struct WorkerContext {
    pub catalog: Arc<dyn ToolCatalogPort>,
    pub executor: Arc<dyn ToolExecutorPort>,
    pub selector: Arc<ToolSelector>,
    pub step_timeout: Duration,
    pub max_retries: u32,
    pub max_tools_per_step: usize,
}

impl WorkerContext {
    pub fn from_orchestrator(orchestrator: &WorkflowOrchestrator) -> Self {
        Self {
            catalog: Arc::clone(&orchestrator.catalog),
            executor: Arc::clone(&orchestrator.executor),
            selector: Arc::clone(&orchestrator.selector),
            step_timeout: orchestrator.params.step_timeout,
            max_retries: orchestrator.params.max_step_retries,
            max_tools_per_step: orchestrator.params.max_tools_per_step,
        }
    }

    /// Run one step to completion (or cancellation).
    ///
    /// Tools run in order; each sees the previous successful payload as
    /// `{{prev}}`. A failing tool does not stop the tools after it.
    pub async fn run(self, job: StepJob, cancel: CancellationToken) -> StepReport {
        let step = &job.step;
        let mut report = StepReport::new(&step.id);

        let (tools, suggested) = match self.resolve_tools(&job, &mut report).await {
            Some(resolved) => resolved,
            None => return report,
        };

        let mut ctx = TemplateContext::new().with_topic(job.topic.clone());
        if let Some(seed) = step.input.clone().or_else(|| job.seed.clone()) {
            ctx = ctx.with_seed(seed);
        }
        for (dep, value) in &job.upstream {
            ctx = ctx.with_upstream(dep.clone(), value.clone());
        }

        for tool in tools {
            let descriptor = match tool {
                Ok(descriptor) => descriptor,
                Err(missing) => {
                    report.attempts.push(ToolAttempt {
                        result: ExecutionResult::dependency_missing(
                            &missing,
                            format!("tool '{}' is not in the catalog", missing),
                        ),
                        attempts: 0,
                    });
                    continue;
                }
            };

            let mut params: Parameters = suggested
                .get(&descriptor.name)
                .cloned()
                .unwrap_or_default();
            params.extend(step.parameters.render(&ctx));

            let mut attempt = 1;
            let mut result = self
                .executor
                .invoke(&descriptor, &params, self.step_timeout, &cancel)
                .await;
            while !result.is_ok() && attempt <= self.max_retries && !cancel.is_cancelled() {
                attempt += 1;
                debug!(
                    step = %step.id,
                    tool = %descriptor.name,
                    attempt,
                    status = %result.status(),
                    "Retrying tool"
                );
                report.retries.push((descriptor.name.clone(), attempt));
                result = self
                    .executor
                    .invoke(&descriptor, &params, self.step_timeout, &cancel)
                    .await;
            }

            if let Some(payload) = result.payload() {
                ctx.prev = Some(payload.clone());
            }
            report.attempts.push(ToolAttempt {
                result,
                attempts: attempt,
            });

            if cancel.is_cancelled() {
                break;
            }
        }

        report
    }

    /// Named tools are looked up; a step naming none asks the selector.
    ///
    /// Returns `None` (with `report.error` set) when nothing can run.
    async fn resolve_tools(&self, job: &StepJob, report: &mut StepReport) -> Option<ResolvedTools> {
        let step = &job.step;
        let catalog = self.catalog.snapshot();

        if !step.tool_names.is_empty() {
            let tools = step
                .tool_names
                .iter()
                .map(|name| catalog.get(name).cloned().ok_or_else(|| name.clone()))
                .collect();
            return Some((tools, BTreeMap::new()));
        }

        let query = format!("{} {}", job.topic, step.name);
        let decision = match self
            .selector
            .select(&query, catalog.all(), self.max_tools_per_step)
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                warn!(step = %step.id, error = %e, "Tool selection rejected");
                report.error = Some(e.to_string());
                return None;
            }
        };
        report.used_fallback = decision.used_fallback;

        if decision.is_empty() {
            report.error = Some("no tools available for selection".to_string());
            return None;
        }
        info!(
            step = %step.id,
            tools = ?decision.chosen_tools,
            fallback = decision.used_fallback,
            "Selected tools for step"
        );

        let tools = decision
            .chosen_tools
            .iter()
            .map(|name| catalog.get(name).cloned().ok_or_else(|| name.clone()))
            .collect();
        Some((tools, decision.suggested_parameters))
    }
}
