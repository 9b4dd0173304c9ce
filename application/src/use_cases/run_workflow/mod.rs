//! Run Workflow use case
//!
//! Drives a [`Session`] from `Created` to a terminal state.
//!
//! ```text
//! coordinator (owns Session)          workers (JoinSet, ≤ max_parallel)
//! ──────────────────────────          ─────────────────────────────────
//! skip blocked / promote ready  ──▶   select tools → invoke (+ retries)
//! mark Running, spawn job             │
//! join_next ◀───────────────────────  StepReport
//! complete/fail step, cast votes
//! persist snapshot
//! ...all steps terminal
//! ConsensusPending → evaluate → Finalized (publish) | Abandoned
//! ```
//!
//! Only the coordinator mutates the session. Workers get a detached
//! [`StepJob`](worker::StepJob) and send back a report, so no locking is
//! needed around session state.

mod worker;

use crate::config::WorkflowParams;
use crate::ports::progress::{NoWorkflowProgress, WorkflowProgressNotifier};
use crate::ports::publication::PublicationAdapter;
use crate::ports::session_store::{NoSessionStore, SessionStore, StoreError};
use crate::ports::text_completion::TextCompletion;
use crate::ports::tool_catalog::ToolCatalogPort;
use crate::ports::tool_executor::ToolExecutorPort;
use crate::ports::workflow_logger::{NoWorkflowLogger, WorkflowEvent, WorkflowEventLogger};
use crate::use_cases::select_tools::ToolSelector;
use sciquorum_domain::{
    AbandonReason, ConsensusOutcome, DomainError, EvidenceRef, ExecutionStatus, FindingContent,
    Session, SessionStatus, StepOutcome, StepStatus, ToolRunSummary, Vote, WorkflowDefinition,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use worker::{StepJob, StepReport, WorkerContext};

/// How long in-flight workers get to wind down after cancellation
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Deadline used when the wall-clock budget does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Errors that can occur while running a workflow.
///
/// Tool failures, selection degradation and consensus shortfall are not
/// errors; they show up in the returned session.
#[derive(Error, Debug)]
pub enum RunWorkflowError {
    #[error("Invalid workflow: {0}")]
    Domain(#[from] DomainError),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of a workflow run
#[derive(Debug)]
pub struct RunWorkflowOutput {
    /// The session in its terminal state
    pub session: Session,
    pub published_id: Option<String>,
    /// Publication failure, if any; the session stays finalized
    pub publish_error: Option<String>,
    pub elapsed: Duration,
}

/// How the step-execution phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionEnd {
    /// Every step reached a terminal state
    Completed,
    BudgetExceeded,
    Cancelled,
}

/// Use case that owns and drives workflow sessions
pub struct WorkflowOrchestrator {
    catalog: Arc<dyn ToolCatalogPort>,
    executor: Arc<dyn ToolExecutorPort>,
    selector: Arc<ToolSelector>,
    store: Arc<dyn SessionStore>,
    publisher: Option<Arc<dyn PublicationAdapter>>,
    logger: Arc<dyn WorkflowEventLogger>,
    params: WorkflowParams,
}

impl WorkflowOrchestrator {
    pub fn new(
        catalog: Arc<dyn ToolCatalogPort>,
        executor: Arc<dyn ToolExecutorPort>,
        completion: Arc<dyn TextCompletion>,
    ) -> Self {
        Self {
            catalog,
            executor,
            selector: Arc::new(ToolSelector::new(completion)),
            store: Arc::new(NoSessionStore),
            publisher: None,
            logger: Arc::new(NoWorkflowLogger),
            params: WorkflowParams::default(),
        }
    }

    pub fn with_selector(mut self, selector: ToolSelector) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn PublicationAdapter>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn WorkflowEventLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_params(mut self, params: WorkflowParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &WorkflowParams {
        &self.params
    }

    /// Build and persist a `Created` session from a workflow definition.
    pub async fn create_session(
        &self,
        definition: WorkflowDefinition,
    ) -> Result<Session, RunWorkflowError> {
        let session = Session::from_definition(definition)?;
        self.store.save(&session).await?;
        info!(
            session = %session.id(),
            pattern = session.pattern().kind(),
            steps = session.steps().len(),
            "Session created"
        );
        self.logger.log(WorkflowEvent::new(
            "session_created",
            json!({
                "session_id": session.id(),
                "topic": session.topic(),
                "pattern": session.pattern().kind(),
                "steps": session.steps().len(),
            }),
        ));
        Ok(session)
    }

    /// Create a session and run it to a terminal state with no progress output.
    pub async fn run(
        &self,
        definition: WorkflowDefinition,
        cancel: CancellationToken,
    ) -> Result<RunWorkflowOutput, RunWorkflowError> {
        self.run_with_progress(definition, &NoWorkflowProgress, cancel)
            .await
    }

    pub async fn run_with_progress(
        &self,
        definition: WorkflowDefinition,
        progress: &dyn WorkflowProgressNotifier,
        cancel: CancellationToken,
    ) -> Result<RunWorkflowOutput, RunWorkflowError> {
        let session = self.create_session(definition).await?;
        self.run_session(session, progress, cancel).await
    }

    /// Run an existing `Created` session to a terminal state.
    pub async fn run_session(
        &self,
        mut session: Session,
        progress: &dyn WorkflowProgressNotifier,
        cancel: CancellationToken,
    ) -> Result<RunWorkflowOutput, RunWorkflowError> {
        let started = Instant::now();
        let deadline = started
            .checked_add(self.params.wall_clock_budget)
            .unwrap_or_else(|| started + FAR_FUTURE);

        let end = self
            .execute_steps(&mut session, progress, &cancel, deadline)
            .await?;

        let (published_id, publish_error) = match end {
            ExecutionEnd::Completed if Instant::now() >= deadline => {
                self.abandon(&mut session, self.budget_reason(), progress)
                    .await?;
                (None, None)
            }
            ExecutionEnd::Completed => self.conclude(&mut session, progress).await?,
            ExecutionEnd::BudgetExceeded => {
                self.abandon(&mut session, self.budget_reason(), progress)
                    .await?;
                (None, None)
            }
            ExecutionEnd::Cancelled => {
                self.abandon(&mut session, AbandonReason::Cancelled, progress)
                    .await?;
                (None, None)
            }
        };

        Ok(RunWorkflowOutput {
            session,
            published_id,
            publish_error,
            elapsed: started.elapsed(),
        })
    }

    /// Activate the session and run steps until all are terminal, the
    /// deadline passes, or `cancel` fires.
    ///
    /// On [`ExecutionEnd::Completed`] the session is `ConsensusPending`;
    /// otherwise it is still `Active` and the caller decides how to close it.
    pub async fn execute_steps(
        &self,
        session: &mut Session,
        progress: &dyn WorkflowProgressNotifier,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Result<ExecutionEnd, RunWorkflowError> {
        session.activate()?;
        self.status_changed(session, progress).await;

        let run_token = cancel.child_token();
        let worker_ctx = WorkerContext::from_orchestrator(self);
        let total = session.steps().len();
        let mut join_set: JoinSet<StepReport> = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, String> = HashMap::new();

        loop {
            let mut changed = false;

            for step_id in session.skip_blocked_steps()? {
                debug!(session = %session.id(), step = %step_id, "Step skipped");
                progress.on_step_skipped(&step_id);
                self.logger.log(WorkflowEvent::new(
                    "step_skipped",
                    json!({ "session_id": session.id(), "step_id": step_id }),
                ));
                changed = true;
            }
            changed |= !session.promote_ready_steps()?.is_empty();

            let free = self.params.max_parallel.saturating_sub(join_set.len());
            for step_id in session.ready_steps().into_iter().take(free) {
                session.mark_running(&step_id)?;
                changed = true;

                let Some(step) = session.step(&step_id).cloned() else {
                    continue;
                };
                info!(session = %session.id(), step = %step.id, role = %step.role, "Step started");
                progress.on_step_start(&step, total);
                self.logger.log(WorkflowEvent::new(
                    "step_started",
                    json!({
                        "session_id": session.id(),
                        "step_id": step.id,
                        "role": step.role,
                        "tools": step.tool_names,
                    }),
                ));

                let job = StepJob {
                    upstream: session.upstream_findings(&step.id),
                    topic: session.topic().to_string(),
                    seed: session.seed().cloned(),
                    step,
                };
                let handle = join_set.spawn(worker_ctx.clone().run(job, run_token.clone()));
                in_flight.insert(handle.id(), step_id);
            }

            if changed {
                self.persist(session).await;
            }

            if join_set.is_empty() {
                if session.all_steps_terminal() {
                    session.enter_consensus()?;
                    self.status_changed(session, progress).await;
                    return Ok(ExecutionEnd::Completed);
                }
                // Unreachable for a validated acyclic graph
                warn!(session = %session.id(), "No runnable steps left");
                return Ok(ExecutionEnd::Cancelled);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(session = %session.id(), "Session cancelled");
                    run_token.cancel();
                    self.drain(session, &mut join_set, &mut in_flight, progress).await;
                    return Ok(ExecutionEnd::Cancelled);
                }
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(session = %session.id(), "Wall-clock budget exceeded");
                    run_token.cancel();
                    self.drain(session, &mut join_set, &mut in_flight, progress).await;
                    return Ok(ExecutionEnd::BudgetExceeded);
                }
                Some(joined) = join_set.join_next_with_id() => {
                    self.handle_joined(session, joined, &mut in_flight, progress).await?;
                }
            }
        }
    }

    /// Evaluate consensus on a `ConsensusPending` session, then finalize
    /// (and publish) or abandon it.
    pub async fn conclude(
        &self,
        session: &mut Session,
        progress: &dyn WorkflowProgressNotifier,
    ) -> Result<(Option<String>, Option<String>), RunWorkflowError> {
        let report = session.evaluate_consensus(self.params.consensus_threshold)?;
        progress.on_consensus(&report);
        self.logger.log(WorkflowEvent::new(
            "consensus_evaluated",
            json!({ "session_id": session.id(), "report": report }),
        ));

        match report.outcome {
            ConsensusOutcome::Reached => {
                session.finalize()?;
                self.status_changed(session, progress).await;
                Ok(self.publish(session).await)
            }
            ConsensusOutcome::NoFindings => {
                self.abandon(session, AbandonReason::NoFindings, progress)
                    .await?;
                Ok((None, None))
            }
            ConsensusOutcome::Shortfall => {
                let detail = report.shortfall_summary();
                self.abandon(
                    session,
                    AbandonReason::ConsensusShortfall { detail },
                    progress,
                )
                .await?;
                Ok((None, None))
            }
        }
    }

    // ==================== Coordinator internals ====================

    async fn handle_joined(
        &self,
        session: &mut Session,
        joined: Result<(tokio::task::Id, StepReport), tokio::task::JoinError>,
        in_flight: &mut HashMap<tokio::task::Id, String>,
        progress: &dyn WorkflowProgressNotifier,
    ) -> Result<(), RunWorkflowError> {
        match joined {
            Ok((id, report)) => {
                in_flight.remove(&id);
                self.apply_report(session, report, progress)?;
            }
            Err(e) => {
                warn!(session = %session.id(), error = %e, "Step worker failed");
                if let Some(step_id) = in_flight.remove(&e.id()) {
                    let outcome = StepOutcome::new(ExecutionStatus::InternalError, vec![])
                        .with_error(format!("worker failed: {}", e));
                    session.fail_step(&step_id, outcome)?;
                    progress.on_step_complete(&step_id, StepStatus::Failed);
                }
            }
        }
        self.persist(session).await;
        Ok(())
    }

    /// Fold a worker report into the session: Done with a Finding if any
    /// tool succeeded, Failed otherwise. Completed reviewers vote.
    fn apply_report(
        &self,
        session: &mut Session,
        report: StepReport,
        progress: &dyn WorkflowProgressNotifier,
    ) -> Result<(), RunWorkflowError> {
        let step_id = report.step_id.clone();

        for (tool, attempt) in &report.retries {
            progress.on_tool_retry(&step_id, tool, *attempt, self.params.max_step_retries + 1);
        }

        let summaries: Vec<ToolRunSummary> = report
            .attempts
            .iter()
            .map(|a| ToolRunSummary::from_result(&a.result, a.attempts))
            .collect();
        for summary in &summaries {
            progress.on_tool_result(&step_id, summary);
            self.logger.log(WorkflowEvent::new(
                "tool_result",
                json!({ "session_id": session.id(), "step_id": step_id, "result": summary }),
            ));
        }

        let evidence: Vec<EvidenceRef> = report
            .attempts
            .iter()
            .filter_map(|a| {
                a.result.payload().map(|payload| EvidenceRef {
                    tool_name: a.result.tool_name.clone(),
                    payload: payload.clone(),
                })
            })
            .collect();

        let status = if evidence.is_empty() {
            summaries
                .last()
                .map(|s| s.status)
                .unwrap_or(ExecutionStatus::InternalError)
        } else {
            ExecutionStatus::Ok
        };
        let mut outcome =
            StepOutcome::new(status, summaries).with_fallback(report.used_fallback);
        if let Some(error) = report.error {
            outcome = outcome.with_error(error);
        }

        let final_status = if evidence.is_empty() {
            warn!(session = %session.id(), step = %step_id, status = %status, "Step failed");
            session.fail_step(&step_id, outcome)?;
            StepStatus::Failed
        } else {
            let step_name = session
                .step(&step_id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| step_id.clone());
            let content = FindingContent::from_evidence(&step_name, evidence);
            let finding_id = session.complete_step(&step_id, outcome, content)?;
            info!(session = %session.id(), step = %step_id, finding = %finding_id, "Step done");
            self.cast_reviewer_votes(session, &step_id, &report.attempts, progress)?;
            StepStatus::Done
        };

        progress.on_step_complete(&step_id, final_status);
        self.logger.log(WorkflowEvent::new(
            "step_finished",
            json!({
                "session_id": session.id(),
                "step_id": step_id,
                "status": final_status,
            }),
        ));
        Ok(())
    }

    /// A completed reviewer votes on each Finding of its direct dependencies,
    /// reading its verdict from the first tool payload that carries one.
    fn cast_reviewer_votes(
        &self,
        session: &mut Session,
        step_id: &str,
        attempts: &[worker::ToolAttempt],
        progress: &dyn WorkflowProgressNotifier,
    ) -> Result<(), RunWorkflowError> {
        let Some(step) = session.step(step_id) else {
            return Ok(());
        };
        if !step.is_reviewer() {
            return Ok(());
        }
        let participant = step.participant.clone();
        let verdict_payload = attempts
            .iter()
            .filter_map(|a| a.result.payload())
            .find(|p| p.get("verdicts").is_some() || p.get("verdict").is_some());

        let targets: Vec<(String, String)> = step
            .depends_on
            .iter()
            .filter_map(|dep| {
                session
                    .finding_for_step(dep)
                    .map(|f| (f.id().to_string(), dep.clone()))
            })
            .collect();

        for (finding_id, target_step) in targets {
            let vote = verdict_payload
                .map(|p| Vote::from_payload(p, &target_step))
                .unwrap_or(Vote::Abstain);
            session.record_vote(&finding_id, &participant, vote)?;
            debug!(
                session = %session.id(),
                finding = %finding_id,
                participant = %participant,
                vote = %vote,
                "Vote recorded"
            );
            progress.on_vote(&finding_id, &participant, vote);
            self.logger.log(WorkflowEvent::new(
                "vote_cast",
                json!({
                    "session_id": session.id(),
                    "finding_id": finding_id,
                    "participant": participant,
                    "vote": vote,
                }),
            ));
        }
        Ok(())
    }

    /// Collect reports from workers after their token was cancelled.
    ///
    /// Workers that ignore cancellation past [`DRAIN_GRACE`] are aborted;
    /// their steps are closed out by `Session::abandon`.
    async fn drain(
        &self,
        session: &mut Session,
        join_set: &mut JoinSet<StepReport>,
        in_flight: &mut HashMap<tokio::task::Id, String>,
        progress: &dyn WorkflowProgressNotifier,
    ) {
        let grace = tokio::time::sleep(DRAIN_GRACE);
        tokio::pin!(grace);
        loop {
            tokio::select! {
                _ = &mut grace => {
                    warn!(remaining = join_set.len(), "Aborting workers that ignored cancellation");
                    join_set.abort_all();
                    break;
                }
                joined = join_set.join_next_with_id() => {
                    let Some(joined) = joined else { break };
                    if let Err(e) = self.handle_joined(session, joined, in_flight, progress).await {
                        warn!(error = %e, "Could not apply report while draining");
                    }
                }
            }
        }
    }

    async fn abandon(
        &self,
        session: &mut Session,
        reason: AbandonReason,
        progress: &dyn WorkflowProgressNotifier,
    ) -> Result<(), RunWorkflowError> {
        warn!(session = %session.id(), reason = %reason, "Session abandoned");
        session.abandon(reason)?;
        self.status_changed(session, progress).await;
        Ok(())
    }

    async fn publish(&self, session: &Session) -> (Option<String>, Option<String>) {
        let Some(publisher) = &self.publisher else {
            return (None, None);
        };
        match publisher
            .publish(session.id(), &session.publication_payload())
            .await
        {
            Ok(published_id) => {
                info!(session = %session.id(), published = %published_id, "Session published");
                self.logger.log(WorkflowEvent::new(
                    "published",
                    json!({ "session_id": session.id(), "published_id": published_id }),
                ));
                (Some(published_id), None)
            }
            Err(e) => {
                warn!(session = %session.id(), error = %e, "Publication failed");
                self.logger.log(WorkflowEvent::new(
                    "publish_failed",
                    json!({ "session_id": session.id(), "error": e.to_string() }),
                ));
                (None, Some(e.to_string()))
            }
        }
    }

    async fn status_changed(&self, session: &Session, progress: &dyn WorkflowProgressNotifier) {
        let status: SessionStatus = session.status();
        debug!(session = %session.id(), status = %status, "Session status changed");
        progress.on_session_status(session.id(), status);
        self.logger.log(WorkflowEvent::new(
            "session_status",
            json!({
                "session_id": session.id(),
                "status": status,
                "reason": session.abandon_reason(),
            }),
        ));
        self.persist(session).await;
    }

    /// Write-after-transition snapshot. A failing store is logged, not fatal:
    /// the in-memory session stays authoritative for this run.
    async fn persist(&self, session: &Session) {
        if let Err(e) = self.store.save(session).await {
            warn!(session = %session.id(), error = %e, "Failed to persist session");
        }
    }

    fn budget_reason(&self) -> AbandonReason {
        AbandonReason::BudgetExceeded {
            budget_secs: self.params.wall_clock_budget.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests;
