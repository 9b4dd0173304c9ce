//! Session aggregate and its state machine

use super::finding::{Finding, FindingContent};
use super::pattern::{WorkflowDefinition, WorkflowPattern};
use super::step::{StepOutcome, StepRole, StepStatus, WorkflowStep};
use crate::core::error::DomainError;
use crate::quorum::consensus::ConsensusReport;
use crate::quorum::vote::Vote;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Opaque unique session identifier (`sess-<uuid>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(format!("sess-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session lifecycle.
///
/// ```text
/// Created ─▶ Active ─▶ ConsensusPending ─▶ Finalized
///               │              │
///               └──────────────┴─────────▶ Abandoned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Active,
    ConsensusPending,
    Finalized,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SessionStatus::Created => "created",
            SessionStatus::Active => "active",
            SessionStatus::ConsensusPending => "consensus_pending",
            SessionStatus::Finalized => "finalized",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Finalized | SessionStatus::Abandoned)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An agent identity taking part in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub role: StepRole,
}

/// Why a session ended without being finalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbandonReason {
    BudgetExceeded { budget_secs: u64 },
    NoFindings,
    ConsensusShortfall { detail: String },
    Cancelled,
}

impl std::fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbandonReason::BudgetExceeded { budget_secs } => {
                write!(f, "wall-clock budget of {}s exceeded", budget_secs)
            }
            AbandonReason::NoFindings => write!(f, "no findings were produced"),
            AbandonReason::ConsensusShortfall { detail } => {
                write!(f, "consensus shortfall: {}", detail)
            }
            AbandonReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A unit of coordinated investigation.
///
/// All fields are private; state changes only through the transition methods
/// below, each of which rejects changes once the session is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seed: Option<Value>,
    pattern: WorkflowPattern,
    status: SessionStatus,
    participants: Vec<Participant>,
    steps: Vec<WorkflowStep>,
    findings: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    consensus: Option<ConsensusReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    abandon_reason: Option<AbandonReason>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a session from a pattern, validating its dependency graph.
    pub fn new(topic: impl Into<String>, pattern: WorkflowPattern) -> Result<Self, DomainError> {
        let steps = pattern.instantiate()?;
        validate_graph(&steps)?;

        let mut participants: Vec<Participant> = Vec::new();
        for step in &steps {
            if !participants.iter().any(|p| p.id == step.participant) {
                participants.push(Participant {
                    id: step.participant.clone(),
                    role: step.role,
                });
            }
        }

        let now = Utc::now();
        Ok(Self {
            id: SessionId::new(),
            topic: topic.into(),
            seed: None,
            pattern,
            status: SessionStatus::Created,
            participants,
            steps,
            findings: Vec::new(),
            consensus: None,
            abandon_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn from_definition(definition: WorkflowDefinition) -> Result<Self, DomainError> {
        let mut session = Self::new(definition.topic, definition.pattern)?;
        session.seed = definition.seed;
        Ok(session)
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn seed(&self) -> Option<&Value> {
        self.seed.as_ref()
    }

    pub fn pattern(&self) -> &WorkflowPattern {
        &self.pattern
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn finding(&self, id: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.id() == id)
    }

    pub fn finding_for_step(&self, step_id: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.step_id() == step_id)
    }

    pub fn consensus(&self) -> Option<&ConsensusReport> {
        self.consensus.as_ref()
    }

    pub fn abandon_reason(&self) -> Option<&AbandonReason> {
        self.abandon_reason.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn count_steps(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    pub fn all_steps_terminal(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    /// Ids of steps currently `Ready`, in step order
    pub fn ready_steps(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Ready)
            .map(|s| s.id.clone())
            .collect()
    }

    /// Findings of the given step's direct dependencies, keyed by step id
    pub fn upstream_findings(&self, step_id: &str) -> BTreeMap<String, Value> {
        let Some(step) = self.step(step_id) else {
            return BTreeMap::new();
        };
        step.depends_on
            .iter()
            .filter_map(|dep| {
                self.finding_for_step(dep)
                    .map(|f| (dep.clone(), f.content().to_value()))
            })
            .collect()
    }

    /// Findings produced by non-reviewer steps that at least one completed
    /// reviewer step depends on. These are the Findings the consensus
    /// threshold applies to; a reviewer that failed reviews nothing.
    pub fn top_level_findings(&self) -> Vec<&Finding> {
        let reviewed: HashSet<&str> = self
            .steps
            .iter()
            .filter(|s| s.is_reviewer() && s.status == StepStatus::Done)
            .flat_map(|s| s.depends_on.iter().map(String::as_str))
            .collect();
        self.findings
            .iter()
            .filter(|f| {
                reviewed.contains(f.step_id())
                    && self.step(f.step_id()).is_some_and(|s| !s.is_reviewer())
            })
            .collect()
    }

    // ==================== Transitions ====================

    /// `Created -> Active`
    pub fn activate(&mut self) -> Result<(), DomainError> {
        self.ensure_open()?;
        if self.status != SessionStatus::Created {
            return Err(self.session_transition(SessionStatus::Active));
        }
        self.status = SessionStatus::Active;
        self.touch();
        Ok(())
    }

    /// Mark every `Pending` step with a `Failed` or `Skipped` dependency as
    /// `Skipped`, transitively. Returns the ids newly skipped.
    pub fn skip_blocked_steps(&mut self) -> Result<Vec<String>, DomainError> {
        self.ensure_active()?;
        let mut skipped = Vec::new();
        loop {
            let statuses: HashMap<String, StepStatus> = self
                .steps
                .iter()
                .map(|s| (s.id.clone(), s.status))
                .collect();
            let mut changed = false;
            for step in &mut self.steps {
                if step.status == StepStatus::Pending
                    && step
                        .depends_on
                        .iter()
                        .any(|d| statuses.get(d).is_some_and(|s| s.blocks_dependents()))
                {
                    step.status = StepStatus::Skipped;
                    skipped.push(step.id.clone());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        if !skipped.is_empty() {
            self.touch();
        }
        Ok(skipped)
    }

    /// Mark every `Pending` step whose dependencies are all `Done` as
    /// `Ready`. Returns the ids newly promoted.
    pub fn promote_ready_steps(&mut self) -> Result<Vec<String>, DomainError> {
        self.ensure_active()?;
        let done: HashSet<String> = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Done)
            .map(|s| s.id.clone())
            .collect();
        let mut promoted = Vec::new();
        for step in &mut self.steps {
            if step.status == StepStatus::Pending && step.depends_on.iter().all(|d| done.contains(d))
            {
                step.status = StepStatus::Ready;
                promoted.push(step.id.clone());
            }
        }
        if !promoted.is_empty() {
            self.touch();
        }
        Ok(promoted)
    }

    /// `Ready -> Running`
    pub fn mark_running(&mut self, step_id: &str) -> Result<(), DomainError> {
        self.ensure_active()?;
        let step = self.step_mut(step_id)?;
        if step.status != StepStatus::Ready {
            return Err(DomainError::transition(
                format!("step {}", step_id),
                step.status,
                StepStatus::Running,
            ));
        }
        step.status = StepStatus::Running;
        self.touch();
        Ok(())
    }

    /// `Running -> Done`, recording a Finding. Returns the Finding id.
    pub fn complete_step(
        &mut self,
        step_id: &str,
        mut outcome: StepOutcome,
        content: FindingContent,
    ) -> Result<String, DomainError> {
        self.ensure_active()?;
        let finding_id = format!("finding-{}", step_id);
        let step = self.step_mut(step_id)?;
        if step.status != StepStatus::Running {
            return Err(DomainError::transition(
                format!("step {}", step_id),
                step.status,
                StepStatus::Done,
            ));
        }
        outcome.finding_id = Some(finding_id.clone());
        step.status = StepStatus::Done;
        step.outcome = Some(outcome);
        self.findings
            .push(Finding::new(finding_id.clone(), step_id, content));
        self.touch();
        Ok(finding_id)
    }

    /// `Running -> Failed`. Dependents are not failed; they are skipped by
    /// the next [`skip_blocked_steps`](Self::skip_blocked_steps).
    pub fn fail_step(&mut self, step_id: &str, outcome: StepOutcome) -> Result<(), DomainError> {
        self.ensure_active()?;
        let step = self.step_mut(step_id)?;
        if step.status != StepStatus::Running {
            return Err(DomainError::transition(
                format!("step {}", step_id),
                step.status,
                StepStatus::Failed,
            ));
        }
        step.status = StepStatus::Failed;
        step.outcome = Some(outcome);
        self.touch();
        Ok(())
    }

    /// Record a participant's vote on a Finding.
    ///
    /// Accepted while `Active` or `ConsensusPending`.
    pub fn record_vote(
        &mut self,
        finding_id: &str,
        participant: &str,
        vote: Vote,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;
        if self.status == SessionStatus::Created {
            return Err(DomainError::transition(
                format!("vote on {}", finding_id),
                self.status,
                "voting",
            ));
        }
        if !self.participants.iter().any(|p| p.id == participant) {
            return Err(DomainError::UnknownParticipant(participant.to_string()));
        }
        let finding = self
            .findings
            .iter_mut()
            .find(|f| f.id() == finding_id)
            .ok_or_else(|| DomainError::UnknownFinding(finding_id.to_string()))?;
        finding.cast_vote(participant, vote);
        self.touch();
        Ok(())
    }

    /// `Active -> ConsensusPending`, once every step is terminal
    pub fn enter_consensus(&mut self) -> Result<(), DomainError> {
        self.ensure_active()?;
        if let Some(step) = self.steps.iter().find(|s| !s.status.is_terminal()) {
            return Err(DomainError::transition(
                format!("step {}", step.id),
                step.status,
                "consensus",
            ));
        }
        self.status = SessionStatus::ConsensusPending;
        self.touch();
        Ok(())
    }

    /// Evaluate the top-level Findings against `threshold` and keep the report.
    pub fn evaluate_consensus(&mut self, threshold: f64) -> Result<ConsensusReport, DomainError> {
        self.ensure_open()?;
        if self.status != SessionStatus::ConsensusPending {
            return Err(DomainError::transition(
                "consensus",
                self.status,
                SessionStatus::ConsensusPending,
            ));
        }
        let report = ConsensusReport::evaluate(
            self.findings.len(),
            self.top_level_findings()
                .into_iter()
                .map(|f| (f.id(), f.step_id(), f.tally())),
            threshold,
        );
        self.consensus = Some(report.clone());
        self.touch();
        Ok(report)
    }

    /// `ConsensusPending -> Finalized`; requires a reached consensus report
    pub fn finalize(&mut self) -> Result<(), DomainError> {
        self.ensure_open()?;
        let reached = self
            .consensus
            .as_ref()
            .is_some_and(|r| r.outcome.is_reached());
        if self.status != SessionStatus::ConsensusPending || !reached {
            return Err(self.session_transition(SessionStatus::Finalized));
        }
        self.status = SessionStatus::Finalized;
        self.touch();
        Ok(())
    }

    /// Any non-terminal state `-> Abandoned`.
    ///
    /// Steps that never finished are closed out: `Running` steps become
    /// `Failed`, `Pending`/`Ready` steps become `Skipped`. Existing Findings
    /// are kept.
    pub fn abandon(&mut self, reason: AbandonReason) -> Result<(), DomainError> {
        self.ensure_open()?;
        for step in &mut self.steps {
            match step.status {
                StepStatus::Running => step.status = StepStatus::Failed,
                StepStatus::Pending | StepStatus::Ready => step.status = StepStatus::Skipped,
                _ => {}
            }
        }
        self.status = SessionStatus::Abandoned;
        self.abandon_reason = Some(reason);
        self.touch();
        Ok(())
    }

    // ==================== Output ====================

    /// Structured payload handed to a publication target
    pub fn publication_payload(&self) -> Value {
        let findings: Vec<Value> = self
            .findings
            .iter()
            .map(|f| {
                json!({
                    "id": f.id(),
                    "step_id": f.step_id(),
                    "claim": f.content().claim,
                    "evidence": f.content().evidence,
                    "votes": f.votes(),
                    "consensus_score": f.consensus_score(),
                })
            })
            .collect();
        json!({
            "session_id": self.id,
            "topic": self.topic,
            "status": self.status,
            "finalized": self.status == SessionStatus::Finalized,
            "findings": findings,
            "participants": self.participants,
            "consensus": self.consensus,
        })
    }

    // ==================== Internals ====================

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::SessionClosed(self.id.to_string()));
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        self.ensure_open()?;
        if self.status != SessionStatus::Active {
            return Err(DomainError::transition(
                format!("session {}", self.id),
                self.status,
                "step execution",
            ));
        }
        Ok(())
    }

    fn step_mut(&mut self, step_id: &str) -> Result<&mut WorkflowStep, DomainError> {
        self.steps
            .iter_mut()
            .find(|s| s.id == step_id)
            .ok_or_else(|| DomainError::UnknownStep(step_id.to_string()))
    }

    fn session_transition(&self, to: SessionStatus) -> DomainError {
        DomainError::transition(format!("session {}", self.id), self.status, to)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Check unique ids, known dependencies and acyclicity.
fn validate_graph(steps: &[WorkflowStep]) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for step in steps {
        if !seen.insert(step.id.as_str()) {
            return Err(DomainError::DuplicateStep(step.id.clone()));
        }
    }
    for step in steps {
        if let Some(dep) = step.depends_on.iter().find(|d| !seen.contains(d.as_str())) {
            return Err(DomainError::UnknownDependency {
                step: step.id.clone(),
                dependency: dep.clone(),
            });
        }
    }

    // Kahn's algorithm; anything left unvisited sits on a cycle
    let mut indegree: HashMap<&str, usize> = steps
        .iter()
        .map(|s| (s.id.as_str(), s.depends_on.len()))
        .collect();
    let mut queue: Vec<&str> = steps
        .iter()
        .filter(|s| s.depends_on.is_empty())
        .map(|s| s.id.as_str())
        .collect();
    let mut visited = 0;
    while let Some(id) = queue.pop() {
        visited += 1;
        for step in steps.iter().filter(|s| s.depends_on.contains(id)) {
            if let Some(n) = indegree.get_mut(step.id.as_str()) {
                *n -= 1;
                if *n == 0 {
                    queue.push(step.id.as_str());
                }
            }
        }
    }
    if visited != steps.len() {
        let stuck = steps
            .iter()
            .find(|s| indegree.get(s.id.as_str()).is_some_and(|n| *n > 0))
            .map(|s| s.id.clone())
            .unwrap_or_default();
        return Err(DomainError::DependencyCycle(stuck));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quorum::consensus::ConsensusOutcome;
    use crate::session::finding::EvidenceRef;
    use crate::session::pattern::StepTemplate;
    use crate::tool::value_objects::ExecutionStatus;

    fn chain(ids: &[(&str, Option<StepRole>)]) -> WorkflowPattern {
        WorkflowPattern::Chain {
            links: ids
                .iter()
                .map(|(id, role)| {
                    let t = StepTemplate::new(*id);
                    match role {
                        Some(r) => t.with_role(*r),
                        None => t,
                    }
                })
                .collect(),
        }
    }

    fn ok_outcome() -> StepOutcome {
        StepOutcome::new(ExecutionStatus::Ok, vec![])
    }

    fn content(claim: &str) -> FindingContent {
        FindingContent::from_evidence(
            "step",
            vec![EvidenceRef {
                tool_name: "t".to_string(),
                payload: json!({ "claim": claim }),
            }],
        )
    }

    fn run_step(session: &mut Session, id: &str) -> String {
        session.promote_ready_steps().unwrap();
        session.mark_running(id).unwrap();
        session.complete_step(id, ok_outcome(), content(id)).unwrap()
    }

    #[test]
    fn test_new_session_is_created_with_pending_steps() {
        let session = Session::new("topic", chain(&[("a", None), ("b", None)])).unwrap();
        assert_eq!(session.status(), SessionStatus::Created);
        assert!(session.id().as_str().starts_with("sess-"));
        assert_eq!(session.count_steps(StepStatus::Pending), 2);
        assert_eq!(session.participants().len(), 2);
    }

    #[test]
    fn test_duplicate_step_ids_rejected() {
        let err = Session::new("t", chain(&[("a", None), ("a", None)])).unwrap_err();
        assert_eq!(err, DomainError::DuplicateStep("a".to_string()));
    }

    #[test]
    fn test_graph_validation() {
        let a = WorkflowStep::new("a", StepRole::Analyst).with_dependency("b");
        let b = WorkflowStep::new("b", StepRole::Analyst).with_dependency("a");
        assert!(matches!(
            validate_graph(&[a, b]),
            Err(DomainError::DependencyCycle(_))
        ));

        let orphan = WorkflowStep::new("c", StepRole::Analyst).with_dependency("zzz");
        assert!(matches!(
            validate_graph(&[orphan]),
            Err(DomainError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_steps_require_active_session() {
        let mut session = Session::new("t", chain(&[("a", None)])).unwrap();
        assert!(session.promote_ready_steps().is_err());
        session.activate().unwrap();
        assert!(session.activate().is_err());
        assert_eq!(session.promote_ready_steps().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_dependency_order() {
        let mut session = Session::new("t", chain(&[("a", None), ("b", None)])).unwrap();
        session.activate().unwrap();
        assert_eq!(session.promote_ready_steps().unwrap(), vec!["a"]);
        assert!(session.mark_running("b").is_err());

        session.mark_running("a").unwrap();
        assert!(session.promote_ready_steps().unwrap().is_empty());
        session.complete_step("a", ok_outcome(), content("x")).unwrap();
        assert_eq!(session.promote_ready_steps().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_failure_skips_dependents_transitively() {
        let mut session =
            Session::new("t", chain(&[("a", None), ("b", None), ("c", None)])).unwrap();
        session.activate().unwrap();
        session.promote_ready_steps().unwrap();
        session.mark_running("a").unwrap();
        session.fail_step("a", ok_outcome()).unwrap();

        assert_eq!(session.skip_blocked_steps().unwrap(), vec!["b", "c"]);
        assert!(session.all_steps_terminal());
        session.enter_consensus().unwrap();
        let report = session.evaluate_consensus(0.5).unwrap();
        assert_eq!(report.outcome, ConsensusOutcome::NoFindings);
    }

    #[test]
    fn test_chain_with_failed_critic_reaches_consensus_pending() {
        let mut session = Session::new(
            "t",
            chain(&[("search", None), ("critique", Some(StepRole::Critic))]),
        )
        .unwrap();
        session.activate().unwrap();
        run_step(&mut session, "search");
        session.promote_ready_steps().unwrap();
        session.mark_running("critique").unwrap();
        session
            .fail_step(
                "critique",
                StepOutcome::new(ExecutionStatus::Timeout, vec![]),
            )
            .unwrap();

        session.enter_consensus().unwrap();
        assert_eq!(session.status(), SessionStatus::ConsensusPending);
        assert_eq!(session.findings().len(), 1);
        assert_eq!(session.count_steps(StepStatus::Failed), 1);

        // the critic failed, so nothing is under review and the lone
        // finding carries the session
        assert!(session.top_level_findings().is_empty());
        let report = session.evaluate_consensus(0.5).unwrap();
        assert_eq!(report.outcome, ConsensusOutcome::Reached);
    }

    #[test]
    fn test_unvoted_reviewed_finding_falls_short() {
        let mut session = Session::new(
            "t",
            chain(&[("search", None), ("critique", Some(StepRole::Critic))]),
        )
        .unwrap();
        session.activate().unwrap();
        run_step(&mut session, "search");
        run_step(&mut session, "critique");
        session.enter_consensus().unwrap();

        assert_eq!(session.top_level_findings().len(), 1);
        let report = session.evaluate_consensus(0.5).unwrap();
        assert_eq!(report.outcome, ConsensusOutcome::Shortfall);
        assert!(session.finalize().is_err());
    }

    #[test]
    fn test_votes_drive_finalization() {
        let mut session = Session::new(
            "t",
            chain(&[("search", None), ("critique", Some(StepRole::Critic))]),
        )
        .unwrap();
        session.activate().unwrap();
        let finding = run_step(&mut session, "search");
        run_step(&mut session, "critique");

        assert!(
            session
                .record_vote(&finding, "stranger", Vote::Agree)
                .is_err()
        );
        session
            .record_vote(&finding, "critic:critique", Vote::Agree)
            .unwrap();
        assert_eq!(session.finding(&finding).unwrap().consensus_score(), 1.0);

        assert!(session.finalize().is_err());
        session.enter_consensus().unwrap();
        session.evaluate_consensus(0.5).unwrap();
        session.finalize().unwrap();
        assert_eq!(session.status(), SessionStatus::Finalized);
    }

    #[test]
    fn test_terminal_session_is_immutable() {
        let mut session = Session::new("t", chain(&[("a", None), ("b", None)])).unwrap();
        session.activate().unwrap();
        session.promote_ready_steps().unwrap();
        session.mark_running("a").unwrap();
        session.abandon(AbandonReason::Cancelled).unwrap();

        assert_eq!(session.step("a").unwrap().status, StepStatus::Failed);
        assert_eq!(session.step("b").unwrap().status, StepStatus::Skipped);
        assert!(matches!(
            session.promote_ready_steps(),
            Err(DomainError::SessionClosed(_))
        ));
        assert!(session.abandon(AbandonReason::NoFindings).is_err());
        assert_eq!(session.abandon_reason(), Some(&AbandonReason::Cancelled));
    }

    #[test]
    fn test_without_reviewers_any_finding_finalizes() {
        let mut session = Session::new("t", chain(&[("a", None)])).unwrap();
        session.activate().unwrap();
        run_step(&mut session, "a");
        session.enter_consensus().unwrap();
        assert!(session.top_level_findings().is_empty());
        assert!(session.evaluate_consensus(0.9).unwrap().outcome.is_reached());
        session.finalize().unwrap();
    }

    #[test]
    fn test_upstream_findings_and_payload() {
        let mut session = Session::new("topic x", chain(&[("a", None), ("b", None)])).unwrap();
        session.activate().unwrap();
        run_step(&mut session, "a");
        let upstream = session.upstream_findings("b");
        assert_eq!(upstream["a"]["claim"], json!("a"));

        let payload = session.publication_payload();
        assert_eq!(payload["topic"], json!("topic x"));
        assert_eq!(payload["finalized"], json!(false));
        assert_eq!(payload["findings"][0]["step_id"], json!("a"));
    }

    #[test]
    fn test_session_roundtrips_through_json() {
        let mut session = Session::new("t", chain(&[("a", None)])).unwrap();
        session.activate().unwrap();
        run_step(&mut session, "a");
        let text = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&text).unwrap();
        assert_eq!(back, session);
    }
}
