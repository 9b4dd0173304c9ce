//! Select Tools use case
//!
//! Chooses a bounded subset of candidate tools for a topic. The
//! text-completion capability is asked first; any failure to get a usable
//! answer from it falls back to deterministic keyword-overlap ranking.

use crate::config::SelectorParams;
use crate::ports::text_completion::TextCompletion;
use sciquorum_domain::{
    SelectionDecision, SelectionPrompt, ToolDescriptor, parse_selection_response,
    rank_by_keyword_overlap,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, PartialEq)]
pub enum SelectionError {
    #[error("max_chosen must be at least 1")]
    InvalidLimit,
}

/// Why the primary path was abandoned
#[derive(Debug)]
enum Degradation {
    CompletionFailed(String),
    TimedOut,
    Unparsable,
    NoKnownTools,
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Degradation::CompletionFailed(e) => write!(f, "completion failed: {}", e),
            Degradation::TimedOut => write!(f, "completion timed out"),
            Degradation::Unparsable => write!(f, "response did not match the selection schema"),
            Degradation::NoKnownTools => write!(f, "response named no known tools"),
        }
    }
}

/// Use case for choosing tools for a topic
pub struct ToolSelector {
    completion: Arc<dyn TextCompletion>,
    params: SelectorParams,
}

impl ToolSelector {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self {
            completion,
            params: SelectorParams::default(),
        }
    }

    pub fn with_params(mut self, params: SelectorParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &SelectorParams {
        &self.params
    }

    /// Select with the configured default cap
    pub async fn select_default<T: AsRef<ToolDescriptor> + Sync>(
        &self,
        topic: &str,
        candidates: &[T],
    ) -> Result<SelectionDecision, SelectionError> {
        self.select(topic, candidates, self.params.max_chosen).await
    }

    /// Choose at most `max_chosen` tools from `candidates` for `topic`.
    ///
    /// Never returns an error for an unavailable or misbehaving completion
    /// capability; that only sets `used_fallback`.
    pub async fn select<T: AsRef<ToolDescriptor> + Sync>(
        &self,
        topic: &str,
        candidates: &[T],
        max_chosen: usize,
    ) -> Result<SelectionDecision, SelectionError> {
        if max_chosen == 0 {
            return Err(SelectionError::InvalidLimit);
        }
        if candidates.is_empty() {
            debug!("No candidates to select from");
            return Ok(SelectionDecision::default());
        }

        match self.select_with_completion(topic, candidates, max_chosen).await {
            Ok(decision) => {
                info!(
                    chosen = decision.len(),
                    candidates = candidates.len(),
                    "Tools selected via text completion"
                );
                Ok(decision)
            }
            Err(reason) => {
                warn!(%reason, "Tool selection falling back to keyword ranking");
                Ok(Self::fallback(topic, candidates, max_chosen))
            }
        }
    }

    /// Deterministic keyword-overlap selection.
    ///
    /// Candidates are ranked by the number of significant words shared with
    /// `topic`; ties keep catalog order. Zero-score candidates are still
    /// eligible, after every scoring one.
    pub fn fallback<T: AsRef<ToolDescriptor>>(
        topic: &str,
        candidates: &[T],
        max_chosen: usize,
    ) -> SelectionDecision {
        let mut decision = SelectionDecision {
            used_fallback: true,
            ..Default::default()
        };
        for (index, score) in rank_by_keyword_overlap(topic, candidates)
            .into_iter()
            .take(max_chosen)
        {
            let name = candidates[index].as_ref().name.clone();
            decision.rationale_per_tool.insert(
                name.clone(),
                format!("keyword overlap with topic: {} shared word(s)", score),
            );
            decision.chosen_tools.push(name);
        }
        decision
    }

    async fn select_with_completion<T: AsRef<ToolDescriptor> + Sync>(
        &self,
        topic: &str,
        candidates: &[T],
        max_chosen: usize,
    ) -> Result<SelectionDecision, Degradation> {
        let prompt = SelectionPrompt::build(topic, candidates, max_chosen);

        let response =
            match tokio::time::timeout(self.params.completion_timeout, self.completion.complete(&prompt))
                .await
            {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => return Err(Degradation::CompletionFailed(e.to_string())),
                Err(_) => return Err(Degradation::TimedOut),
            };

        let mut choices = parse_selection_response(&response).ok_or(Degradation::Unparsable)?;

        let known: HashSet<&str> = candidates.iter().map(|c| c.as_ref().name.as_str()).collect();
        let mut seen = HashSet::new();
        choices.retain(|c| {
            let ok = known.contains(c.name.as_str()) && seen.insert(c.name.clone());
            if !ok {
                debug!(tool = %c.name, "Dropping unknown or duplicate tool choice");
            }
            ok
        });
        if choices.is_empty() {
            return Err(Degradation::NoKnownTools);
        }

        // Highest-rated first; unrated choices keep their order after rated ones
        choices.sort_by(|a, b| {
            let a = a.score.unwrap_or(f64::NEG_INFINITY);
            let b = b.score.unwrap_or(f64::NEG_INFINITY);
            b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
        });
        choices.truncate(max_chosen);

        let mut decision = SelectionDecision::default();
        for choice in choices {
            decision
                .rationale_per_tool
                .insert(choice.name.clone(), choice.rationale);
            decision
                .suggested_parameters
                .insert(choice.name.clone(), choice.parameters);
            decision.chosen_tools.push(choice.name);
        }
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::text_completion::CompletionError;
    use async_trait::async_trait;
    use sciquorum_domain::InvocationMode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // === Mock implementations ===

    enum Reply {
        Text(String),
        Fail,
        Hang,
    }

    struct MockCompletion {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl MockCompletion {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextCompletion for MockCompletion {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Text(t) => Ok(t.clone()),
                Reply::Fail => Err(CompletionError::ConnectionError("refused".to_string())),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(String::new())
                }
            }
        }
    }

    fn catalog() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new("pubmed", InvocationMode::Process, "./pubmed")
                .with_capabilities("Search biomedical literature abstracts"),
            ToolDescriptor::new("blast", InvocationMode::Process, "./blast")
                .with_capabilities("Protein sequence alignment"),
            ToolDescriptor::new("alphafold", InvocationMode::RemoteApi, "http://fold")
                .with_capabilities("Predict protein structure")
                .with_keyword("folding"),
            ToolDescriptor::new("weather", InvocationMode::Process, "./wx")
                .with_capabilities("Local forecast"),
        ]
    }

    fn selector(reply: Reply) -> (ToolSelector, Arc<MockCompletion>) {
        let mock = MockCompletion::new(reply);
        let selector = ToolSelector::new(mock.clone()).with_params(
            SelectorParams::default().with_completion_timeout(Duration::from_millis(50)),
        );
        (selector, mock)
    }

    #[tokio::test]
    async fn test_primary_path() {
        let (selector, _) = selector(Reply::Text(
            r#"{"tools": [
                {"name": "blast", "rationale": "sequence", "score": 0.4},
                {"name": "alphafold", "rationale": "structure", "score": 0.9,
                 "parameters": {"sequence": "MKT"}}
            ]}"#
                .to_string(),
        ));
        let decision = selector
            .select("protein structure", &catalog(), 5)
            .await
            .unwrap();
        assert!(!decision.used_fallback);
        assert_eq!(decision.chosen_tools, vec!["alphafold", "blast"]);
        assert_eq!(decision.rationale("alphafold"), Some("structure"));
        assert_eq!(
            decision.parameters_for("alphafold").unwrap()["sequence"],
            "MKT"
        );
    }

    #[tokio::test]
    async fn test_excess_choices_truncated_keeping_best() {
        let (selector, _) = selector(Reply::Text(
            r#"{"tools": [{"name": "pubmed", "score": 0.2}, {"name": "blast", "score": 0.7},
                          {"name": "alphafold", "score": 0.5}]}"#
                .to_string(),
        ));
        let decision = selector.select("anything", &catalog(), 2).await.unwrap();
        assert_eq!(decision.chosen_tools, vec!["blast", "alphafold"]);
    }

    #[tokio::test]
    async fn test_unknown_and_duplicate_names_dropped() {
        let (selector, _) = selector(Reply::Text(
            r#"{"tools": [{"name": "made-up"}, {"name": "pubmed"}, {"name": "pubmed"}]}"#
                .to_string(),
        ));
        let decision = selector.select("literature", &catalog(), 5).await.unwrap();
        assert_eq!(decision.chosen_tools, vec!["pubmed"]);
        assert!(!decision.used_fallback);
    }

    #[tokio::test]
    async fn test_error_falls_back_deterministically() {
        let (selector, mock) = selector(Reply::Fail);
        let first = selector
            .select("protein structure folding", &catalog(), 2)
            .await
            .unwrap();
        let second = selector
            .select("protein structure folding", &catalog(), 2)
            .await
            .unwrap();

        assert!(first.used_fallback);
        assert!(first.len() <= 2);
        assert_eq!(first, second);
        assert_eq!(first.chosen_tools, vec!["alphafold", "blast"]);
        assert_eq!(mock.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let (selector, _) = selector(Reply::Hang);
        let decision = selector.select("literature", &catalog(), 1).await.unwrap();
        assert!(decision.used_fallback);
        assert_eq!(decision.chosen_tools, vec!["pubmed"]);
    }

    #[tokio::test]
    async fn test_unparsable_and_empty_fall_back() {
        for reply in ["Use pubmed, obviously.", r#"{"tools": []}"#] {
            let (selector, _) = selector(Reply::Text(reply.to_string()));
            let decision = selector.select("literature", &catalog(), 3).await.unwrap();
            assert!(decision.used_fallback, "reply: {}", reply);
        }
    }

    #[tokio::test]
    async fn test_fallback_includes_zero_scores_in_catalog_order() {
        let decision = ToolSelector::fallback("medieval poetry", &catalog(), 3);
        assert_eq!(decision.chosen_tools, vec!["pubmed", "blast", "alphafold"]);
    }

    #[tokio::test]
    async fn test_invalid_limit_and_empty_candidates() {
        let (selector, mock) = selector(Reply::Fail);
        assert_eq!(
            selector.select("x", &catalog(), 0).await,
            Err(SelectionError::InvalidLimit)
        );
        let empty: Vec<ToolDescriptor> = Vec::new();
        let decision = selector.select("x", &empty, 3).await.unwrap();
        assert!(decision.is_empty());
        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
    }
}
