use super::*;
use crate::ports::publication::PublishError;
use crate::ports::session_store::SessionSummary;
use crate::ports::text_completion::CompletionError;
use crate::ports::tool_catalog::FixedCatalog;
use async_trait::async_trait;
use sciquorum_domain::{
    Catalog, ExecutionResult, InvocationMode, ParamTemplate, Parameters, SessionId, Stage,
    StepRole, StepTemplate, ToolDescriptor, WorkflowPattern,
};
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

// === Mock implementations ===

#[derive(Clone)]
enum Behavior {
    Ok(Value),
    Fail(ExecutionStatus),
    /// Sleep, honoring timeout and cancellation, then succeed
    Sleep(Duration, Value),
    /// Fail `n` times, then succeed
    Flaky(usize, Value),
}

#[derive(Default)]
struct MockExecutor {
    behaviors: HashMap<String, Behavior>,
    calls: Mutex<Vec<(String, Parameters)>>,
    timeline: Mutex<Vec<String>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
    invocations: Mutex<HashMap<String, usize>>,
}

impl MockExecutor {
    fn with(mut self, tool: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(tool.to_string(), behavior);
        self
    }

    fn timeline(&self) -> Vec<String> {
        self.timeline.lock().unwrap().clone()
    }

    fn params_for(&self, tool: &str) -> Vec<Parameters> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == tool)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl ToolExecutorPort for MockExecutor {
    async fn invoke(
        &self,
        descriptor: &ToolDescriptor,
        params: &Parameters,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let name = descriptor.name.clone();
        self.calls
            .lock()
            .unwrap()
            .push((name.clone(), params.clone()));
        self.timeline.lock().unwrap().push(format!("start:{}", name));
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);

        let count = {
            let mut invocations = self.invocations.lock().unwrap();
            let n = invocations.entry(name.clone()).or_insert(0);
            *n += 1;
            *n
        };

        let result = match self.behaviors.get(&name).cloned() {
            None => ExecutionResult::dependency_missing(&name, "no behavior"),
            Some(Behavior::Ok(v)) => {
                tokio::time::sleep(Duration::from_millis(10)).await;
                ExecutionResult::ok(&name, v)
            }
            Some(Behavior::Fail(status)) => ExecutionResult::failure(&name, status, "mock failure"),
            Some(Behavior::Sleep(d, v)) => {
                tokio::select! {
                    _ = tokio::time::sleep(d) => ExecutionResult::ok(&name, v),
                    _ = tokio::time::sleep(timeout) => {
                        ExecutionResult::timeout(&name, timeout.as_millis() as u64)
                    }
                    _ = cancel.cancelled() => ExecutionResult::cancelled(&name),
                }
            }
            Some(Behavior::Flaky(failures, v)) => {
                if count <= failures {
                    ExecutionResult::failure(&name, ExecutionStatus::NonZeroExit, "flaky")
                } else {
                    ExecutionResult::ok(&name, v)
                }
            }
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.timeline.lock().unwrap().push(format!("end:{}", name));
        result
    }
}

struct FailingCompletion;

#[async_trait]
impl TextCompletion for FailingCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Err(CompletionError::Unavailable("offline".to_string()))
    }
}

#[derive(Default)]
struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    saves: AtomicUsize,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id().to_string(), session.clone());
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> Result<Session, StoreError> {
        self.sessions
            .lock()
            .unwrap()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .values()
            .map(SessionSummary::from)
            .collect())
    }
}

struct MockPublisher {
    fail: bool,
    received: Mutex<Vec<Value>>,
}

#[async_trait]
impl PublicationAdapter for MockPublisher {
    async fn publish(&self, session_id: &SessionId, payload: &Value) -> Result<String, PublishError> {
        self.received.lock().unwrap().push(payload.clone());
        if self.fail {
            Err(PublishError::Rejected("nope".to_string()))
        } else {
            Ok(format!("pub-{}", session_id))
        }
    }
}

// === Helpers ===

fn catalog(names: &[(&str, &str)]) -> Arc<FixedCatalog> {
    let (catalog, _) = Catalog::from_descriptors(names.iter().map(|(name, caps)| {
        Arc::new(
            ToolDescriptor::new(*name, InvocationMode::Library, *name).with_capabilities(*caps),
        )
    }));
    Arc::new(FixedCatalog::new(catalog))
}

fn default_catalog() -> Arc<FixedCatalog> {
    catalog(&[
        ("x", "search literature"),
        ("y", "critique claims"),
        ("screen", "screen compounds"),
        ("merge", "aggregate results"),
        ("probe", "investigate hypothesis"),
        ("yes", "validate"),
        ("no", "validate"),
        ("flaky", "unreliable"),
        ("slow", "slow tool"),
        ("fail", "always fails"),
    ])
}

fn orchestrator(executor: Arc<MockExecutor>) -> WorkflowOrchestrator {
    WorkflowOrchestrator::new(default_catalog(), executor, Arc::new(FailingCompletion))
        .with_params(WorkflowParams::default().with_step_timeout(Duration::from_millis(200)))
}

fn link(id: &str, tool: &str) -> StepTemplate {
    StepTemplate::new(id).with_tool(tool)
}

fn search_then_critique(critic_tool: &str) -> WorkflowDefinition {
    WorkflowDefinition::new(
        "CRISPR off-target effects",
        WorkflowPattern::Chain {
            links: vec![
                link("search", "x"),
                link("critique", critic_tool).with_role(StepRole::Critic),
            ],
        },
    )
}

fn validation_chain(validators: &[&str]) -> WorkflowDefinition {
    WorkflowDefinition::new(
        "Is gene G essential?",
        WorkflowPattern::ValidationChain {
            investigator: link("investigate", "probe"),
            validators: validators
                .iter()
                .enumerate()
                .map(|(i, tool)| link(&format!("v{}", i + 1), tool))
                .collect(),
            synthesizer: link("synthesize", "merge"),
        },
    )
}

fn far_deadline() -> Instant {
    Instant::now() + Duration::from_secs(60)
}

// === Tests ===

#[tokio::test]
async fn test_failed_critic_reaches_consensus_pending() {
    let executor = Arc::new(
        MockExecutor::default()
            .with("x", Behavior::Ok(json!({"claim": "edits are rare"})))
            .with("y", Behavior::Sleep(Duration::from_secs(10), json!({}))),
    );
    let orchestrator = orchestrator(executor);
    let mut session = orchestrator
        .create_session(search_then_critique("y"))
        .await
        .unwrap();

    let end = orchestrator
        .execute_steps(
            &mut session,
            &NoWorkflowProgress,
            &CancellationToken::new(),
            far_deadline(),
        )
        .await
        .unwrap();

    assert_eq!(end, ExecutionEnd::Completed);
    assert_eq!(session.status(), SessionStatus::ConsensusPending);
    assert_eq!(session.findings().len(), 1);
    assert_eq!(session.step("search").unwrap().status, StepStatus::Done);
    let critique = session.step("critique").unwrap();
    assert_eq!(critique.status, StepStatus::Failed);
    assert_eq!(
        critique.outcome.as_ref().unwrap().status,
        ExecutionStatus::Timeout
    );

    orchestrator
        .conclude(&mut session, &NoWorkflowProgress)
        .await
        .unwrap();
    assert_eq!(session.status(), SessionStatus::Finalized);
}

#[tokio::test]
async fn test_aggregator_waits_for_all_screeners() {
    let executor = Arc::new(
        MockExecutor::default()
            .with("screen", Behavior::Sleep(Duration::from_millis(30), json!({"hits": 1})))
            .with("merge", Behavior::Ok(json!({"summary": "merged"}))),
    );
    let orchestrator = orchestrator(executor.clone())
        .with_params(WorkflowParams::default().with_max_parallel(2));
    let definition = WorkflowDefinition::new(
        "screen library",
        WorkflowPattern::ParallelScreening {
            screener: link("screen", "screen"),
            inputs: (0..8).map(|i| json!(i)).collect(),
            slices: 4,
            aggregator: link("rank", "merge"),
        },
    );

    let output = orchestrator
        .run(definition, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(output.session.status(), SessionStatus::Finalized);
    assert_eq!(output.session.findings().len(), 5);

    let timeline = executor.timeline();
    let merge_start = timeline.iter().position(|e| e == "start:merge").unwrap();
    let last_screen_end = timeline.iter().rposition(|e| e == "end:screen").unwrap();
    assert!(merge_start > last_screen_end, "timeline: {:?}", timeline);
    assert!(executor.max_running.load(Ordering::SeqCst) <= 2);

    let slices: Vec<Value> = executor
        .params_for("screen")
        .iter()
        .map(|p| p.get("items").cloned().unwrap_or(Value::Null))
        .collect();
    assert_eq!(slices.len(), 4);
}

#[tokio::test]
async fn test_screening_slices_reach_tools_through_seed() {
    let executor = Arc::new(
        MockExecutor::default()
            .with("screen", Behavior::Ok(json!({"hits": 1})))
            .with("merge", Behavior::Ok(json!({}))),
    );
    let orchestrator = orchestrator(executor.clone());
    let mut screener = link("screen", "screen");
    screener.parameters = ParamTemplate::new().with("items", "{{seed}}");
    let definition = WorkflowDefinition::new(
        "screen",
        WorkflowPattern::ParallelScreening {
            screener,
            inputs: vec![json!("a"), json!("b"), json!("c")],
            slices: 3,
            aggregator: link("rank", "merge"),
        },
    );

    orchestrator
        .run(definition, CancellationToken::new())
        .await
        .unwrap();

    let mut slices: Vec<Value> = executor
        .params_for("screen")
        .into_iter()
        .map(|p| p["items"].clone())
        .collect();
    slices.sort_by_key(|v| v.to_string());
    assert_eq!(slices, vec![json!(["a"]), json!(["b"]), json!(["c"])]);
}

#[tokio::test]
async fn test_validation_votes_finalize_and_publish() {
    let executor = Arc::new(
        MockExecutor::default()
            .with("probe", Behavior::Ok(json!({"claim": "G is essential"})))
            .with("yes", Behavior::Ok(json!({"verdict": "agree"})))
            .with("no", Behavior::Ok(json!({"verdict": false})))
            .with("merge", Behavior::Ok(json!({"summary": "mostly supported"}))),
    );
    let publisher = Arc::new(MockPublisher {
        fail: false,
        received: Mutex::new(Vec::new()),
    });
    let orchestrator = orchestrator(executor).with_publisher(publisher.clone());

    let output = orchestrator
        .run(validation_chain(&["yes", "yes", "no"]), CancellationToken::new())
        .await
        .unwrap();

    let session = &output.session;
    assert_eq!(session.status(), SessionStatus::Finalized);
    let finding = session.finding_for_step("investigate").unwrap();
    assert_eq!(finding.votes().len(), 3);
    assert!((finding.consensus_score() - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(
        output.published_id.as_deref(),
        Some(format!("pub-{}", session.id()).as_str())
    );

    let payloads = publisher.received.lock().unwrap();
    assert_eq!(payloads[0]["finalized"], json!(true));
    assert_eq!(payloads[0]["findings"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_disagreement_abandons_with_shortfall() {
    let executor = Arc::new(
        MockExecutor::default()
            .with("probe", Behavior::Ok(json!({"claim": "G is essential"})))
            .with("no", Behavior::Ok(json!({"verdicts": {"investigate": "disagree"}})))
            .with("merge", Behavior::Ok(json!({}))),
    );
    let publisher = Arc::new(MockPublisher {
        fail: false,
        received: Mutex::new(Vec::new()),
    });
    let orchestrator = orchestrator(executor).with_publisher(publisher.clone());

    let output = orchestrator
        .run(validation_chain(&["no", "no"]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.session.status(), SessionStatus::Abandoned);
    assert!(matches!(
        output.session.abandon_reason(),
        Some(AbandonReason::ConsensusShortfall { .. })
    ));
    // partial work is kept
    assert_eq!(output.session.findings().len(), 4);
    assert!(publisher.received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_publish_failure_keeps_session_finalized() {
    let executor = Arc::new(MockExecutor::default().with("x", Behavior::Ok(json!({}))));
    let publisher = Arc::new(MockPublisher {
        fail: true,
        received: Mutex::new(Vec::new()),
    });
    let orchestrator = orchestrator(executor).with_publisher(publisher);
    let definition = WorkflowDefinition::new(
        "t",
        WorkflowPattern::Chain {
            links: vec![link("only", "x")],
        },
    );

    let output = orchestrator
        .run(definition, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(output.session.status(), SessionStatus::Finalized);
    assert!(output.published_id.is_none());
    assert!(output.publish_error.unwrap().contains("nope"));
}

#[tokio::test]
async fn test_failure_skips_dependents_and_abandons_without_findings() {
    let executor = Arc::new(
        MockExecutor::default()
            .with("fail", Behavior::Fail(ExecutionStatus::NonZeroExit))
            .with("x", Behavior::Ok(json!({}))),
    );
    let orchestrator = orchestrator(executor.clone());
    let definition = WorkflowDefinition::new(
        "t",
        WorkflowPattern::Chain {
            links: vec![link("a", "fail"), link("b", "x"), link("c", "x")],
        },
    );

    let output = orchestrator
        .run(definition, CancellationToken::new())
        .await
        .unwrap();
    let session = &output.session;
    assert_eq!(session.step("a").unwrap().status, StepStatus::Failed);
    assert_eq!(session.step("b").unwrap().status, StepStatus::Skipped);
    assert_eq!(session.step("c").unwrap().status, StepStatus::Skipped);
    assert_eq!(session.abandon_reason(), Some(&AbandonReason::NoFindings));
    assert!(executor.params_for("x").is_empty());
}

#[tokio::test]
async fn test_partial_failure_in_fan_out_still_aggregates() {
    let executor = Arc::new(
        MockExecutor::default()
            .with("x", Behavior::Ok(json!({"claim": "a"})))
            .with("fail", Behavior::Fail(ExecutionStatus::MalformedOutput))
            .with("merge", Behavior::Ok(json!({}))),
    );
    let orchestrator = orchestrator(executor);
    let definition = WorkflowDefinition::new(
        "t",
        WorkflowPattern::ParallelFanOut {
            branches: vec![link("good", "x"), StepTemplate::new("mixed").with_tool("fail").with_tool("x")],
            aggregator: link("merge", "merge"),
        },
    );

    let output = orchestrator
        .run(definition, CancellationToken::new())
        .await
        .unwrap();
    let session = &output.session;
    // a step with one failing and one working tool is still Done
    assert_eq!(session.step("mixed").unwrap().status, StepStatus::Done);
    let mixed = session.step("mixed").unwrap().outcome.as_ref().unwrap();
    assert_eq!(mixed.tools.len(), 2);
    assert_eq!(mixed.tools[0].status, ExecutionStatus::MalformedOutput);
    assert_eq!(session.step("merge").unwrap().status, StepStatus::Done);
    assert_eq!(session.status(), SessionStatus::Finalized);
}

#[tokio::test]
async fn test_cancellation_abandons_running_session() {
    let executor = Arc::new(
        MockExecutor::default().with("slow", Behavior::Sleep(Duration::from_secs(30), json!({}))),
    );
    let orchestrator = orchestrator(executor).with_params(
        WorkflowParams::default().with_step_timeout(Duration::from_secs(60)),
    );
    let definition = WorkflowDefinition::new(
        "t",
        WorkflowPattern::ParallelFanOut {
            branches: vec![link("a", "slow"), link("b", "slow")],
            aggregator: link("merge", "merge"),
        },
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let output = orchestrator.run(definition, cancel).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    let session = &output.session;
    assert_eq!(session.status(), SessionStatus::Abandoned);
    assert_eq!(session.abandon_reason(), Some(&AbandonReason::Cancelled));
    let a = session.step("a").unwrap();
    assert_eq!(a.status, StepStatus::Failed);
    assert_eq!(
        a.outcome.as_ref().unwrap().tools[0].error.as_deref(),
        Some("invocation cancelled")
    );
    assert_eq!(session.step("merge").unwrap().status, StepStatus::Skipped);
}

#[tokio::test]
async fn test_budget_exceeded_abandons() {
    let executor = Arc::new(
        MockExecutor::default().with("slow", Behavior::Sleep(Duration::from_secs(30), json!({}))),
    );
    let orchestrator = orchestrator(executor).with_params(
        WorkflowParams::default()
            .with_step_timeout(Duration::from_secs(60))
            .with_wall_clock_budget(Duration::from_millis(100)),
    );
    let definition = WorkflowDefinition::new(
        "t",
        WorkflowPattern::Chain {
            links: vec![link("a", "slow")],
        },
    );

    let output = orchestrator
        .run(definition, CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(
        output.session.abandon_reason(),
        Some(AbandonReason::BudgetExceeded { .. })
    ));
}

#[tokio::test]
async fn test_unbounded_budget_runs_to_completion() {
    let executor = Arc::new(MockExecutor::default().with("x", Behavior::Ok(json!({"n": 1}))));
    let orchestrator = orchestrator(executor).with_params(
        WorkflowParams::default().with_wall_clock_budget(Duration::from_secs(u64::MAX)),
    );
    let definition = WorkflowDefinition::new(
        "t",
        WorkflowPattern::Chain {
            links: vec![link("a", "x")],
        },
    );

    let output = orchestrator
        .run(definition, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(output.session.step("a").unwrap().status, StepStatus::Done);
    assert_eq!(output.session.status(), SessionStatus::Finalized);
}

#[tokio::test]
async fn test_retries_recover_flaky_tool() {
    let executor = Arc::new(MockExecutor::default().with("flaky", Behavior::Flaky(2, json!({}))));
    let orchestrator = orchestrator(executor.clone()).with_params(
        WorkflowParams::default().with_max_step_retries(2),
    );
    let definition = WorkflowDefinition::new(
        "t",
        WorkflowPattern::Chain {
            links: vec![link("a", "flaky")],
        },
    );

    let output = orchestrator
        .run(definition, CancellationToken::new())
        .await
        .unwrap();
    let step = output.session.step("a").unwrap();
    assert_eq!(step.status, StepStatus::Done);
    assert_eq!(step.outcome.as_ref().unwrap().tools[0].attempts, 3);
    assert_eq!(executor.params_for("flaky").len(), 3);
}

#[tokio::test]
async fn test_no_retry_by_default() {
    let executor = Arc::new(MockExecutor::default().with("flaky", Behavior::Flaky(1, json!({}))));
    let orchestrator = orchestrator(executor.clone());
    let definition = WorkflowDefinition::new(
        "t",
        WorkflowPattern::Chain {
            links: vec![link("a", "flaky")],
        },
    );

    let output = orchestrator
        .run(definition, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(output.session.step("a").unwrap().status, StepStatus::Failed);
    assert_eq!(executor.params_for("flaky").len(), 1);
}

#[tokio::test]
async fn test_unlisted_step_uses_selector_fallback() {
    let executor = Arc::new(MockExecutor::default().with("x", Behavior::Ok(json!({}))));
    let orchestrator = WorkflowOrchestrator::new(
        catalog(&[("x", "search literature"), ("y", "weather forecast")]),
        executor.clone(),
        Arc::new(FailingCompletion),
    )
    .with_params(WorkflowParams::default().with_max_tools_per_step(1));
    let definition = WorkflowDefinition::new(
        "search the literature",
        WorkflowPattern::Chain {
            links: vec![StepTemplate::new("explore")],
        },
    );

    let output = orchestrator
        .run(definition, CancellationToken::new())
        .await
        .unwrap();
    let outcome = output
        .session
        .step("explore")
        .unwrap()
        .outcome
        .clone()
        .unwrap();
    assert!(outcome.used_fallback);
    assert_eq!(outcome.tools[0].tool_name, "x");
}

#[tokio::test]
async fn test_unknown_tool_fails_step() {
    let executor = Arc::new(MockExecutor::default());
    let orchestrator = orchestrator(executor);
    let definition = WorkflowDefinition::new(
        "t",
        WorkflowPattern::Chain {
            links: vec![link("a", "not-in-catalog")],
        },
    );

    let output = orchestrator
        .run(definition, CancellationToken::new())
        .await
        .unwrap();
    let outcome = output.session.step("a").unwrap().outcome.clone().unwrap();
    assert_eq!(outcome.status, ExecutionStatus::DependencyMissing);
}

#[tokio::test]
async fn test_upstream_findings_feed_templates() {
    let executor = Arc::new(
        MockExecutor::default()
            .with("x", Behavior::Ok(json!({"claim": "off-target rate 0.1%"})))
            .with("y", Behavior::Ok(json!({}))),
    );
    let orchestrator = orchestrator(executor.clone());
    let definition = WorkflowDefinition::new(
        "crispr",
        WorkflowPattern::StagedPipeline {
            stages: vec![
                Stage {
                    name: "find".to_string(),
                    steps: vec![link("search", "x")],
                },
                Stage {
                    name: "check".to_string(),
                    steps: vec![link("review", "y").with_parameters(
                        ParamTemplate::new()
                            .with("claim", "{{upstream.search.claim}}")
                            .with("topic", "{{topic}}"),
                    )],
                },
            ],
        },
    );

    orchestrator
        .run(definition, CancellationToken::new())
        .await
        .unwrap();

    let params = executor.params_for("y");
    assert_eq!(params[0]["claim"], json!("off-target rate 0.1%"));
    assert_eq!(params[0]["topic"], json!("crispr"));
}

#[tokio::test]
async fn test_session_persisted_after_transitions() {
    let executor = Arc::new(MockExecutor::default().with("x", Behavior::Ok(json!({}))));
    let store = Arc::new(MemorySessionStore::default());
    let orchestrator = orchestrator(executor).with_store(store.clone());
    let definition = WorkflowDefinition::new(
        "t",
        WorkflowPattern::Chain {
            links: vec![link("a", "x"), link("b", "x")],
        },
    );

    let output = orchestrator
        .run(definition, CancellationToken::new())
        .await
        .unwrap();

    assert!(store.saves.load(Ordering::SeqCst) >= 5);
    let stored = store.load(output.session.id()).await.unwrap();
    assert_eq!(stored.status(), SessionStatus::Finalized);
    assert_eq!(stored, output.session);
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_definition_is_an_error() {
    let orchestrator = orchestrator(Arc::new(MockExecutor::default()));
    let definition = WorkflowDefinition::new("t", WorkflowPattern::Chain { links: vec![] });
    let result = orchestrator.run(definition, CancellationToken::new()).await;
    assert!(matches!(result, Err(RunWorkflowError::Domain(_))));
}
