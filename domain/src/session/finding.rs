//! Findings: claims produced by steps and subject to peer agreement.

use crate::core::string::truncate;
use crate::quorum::vote::{Vote, VoteTally};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Payload keys read as the claim of a tool result, in order of preference
const CLAIM_KEYS: &[&str] = &["claim", "conclusion", "summary", "finding", "answer"];

const CLAIM_MAX_CHARS: usize = 280;

/// A tool result cited in support of a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub tool_name: String,
    pub payload: Value,
}

/// Structured claim plus the evidence it rests on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingContent {
    pub claim: String,
    pub evidence: Vec<EvidenceRef>,
}

impl FindingContent {
    /// Build content from successful tool payloads.
    ///
    /// The claim is the first textual `claim`/`conclusion`/`summary`/
    /// `finding`/`answer` field found in the evidence. Without one, a short
    /// listing of the contributing tools is used.
    pub fn from_evidence(step_name: &str, evidence: Vec<EvidenceRef>) -> Self {
        let claim = evidence
            .iter()
            .find_map(|e| {
                CLAIM_KEYS
                    .iter()
                    .find_map(|k| e.payload.get(*k).and_then(Value::as_str))
                    .filter(|s| !s.trim().is_empty())
            })
            .map(|s| truncate(s.trim(), CLAIM_MAX_CHARS))
            .unwrap_or_else(|| {
                let tools: Vec<&str> = evidence.iter().map(|e| e.tool_name.as_str()).collect();
                format!("{}: results from {}", step_name, tools.join(", "))
            });
        Self { claim, evidence }
    }

    /// JSON form exposed to downstream parameter templates as `{{upstream.<step>}}`
    pub fn to_value(&self) -> Value {
        let evidence: serde_json::Map<String, Value> = self
            .evidence
            .iter()
            .map(|e| (e.tool_name.clone(), e.payload.clone()))
            .collect();
        json!({ "claim": self.claim, "evidence": evidence })
    }
}

/// A claim produced by a step.
///
/// `consensus_score` is derived from `votes` on every change and on
/// deserialization; there is no setter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FindingRecord")]
pub struct Finding {
    id: String,
    step_id: String,
    content: FindingContent,
    votes: BTreeMap<String, Vote>,
    consensus_score: f64,
}

#[derive(Deserialize)]
struct FindingRecord {
    id: String,
    step_id: String,
    content: FindingContent,
    #[serde(default)]
    votes: BTreeMap<String, Vote>,
}

impl From<FindingRecord> for Finding {
    fn from(record: FindingRecord) -> Self {
        let mut finding = Finding::new(record.id, record.step_id, record.content);
        finding.votes = record.votes;
        finding.recompute();
        finding
    }
}

impl Finding {
    pub fn new(
        id: impl Into<String>,
        step_id: impl Into<String>,
        content: FindingContent,
    ) -> Self {
        Self {
            id: id.into(),
            step_id: step_id.into(),
            content,
            votes: BTreeMap::new(),
            consensus_score: 0.0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    pub fn content(&self) -> &FindingContent {
        &self.content
    }

    pub fn votes(&self) -> &BTreeMap<String, Vote> {
        &self.votes
    }

    pub fn consensus_score(&self) -> f64 {
        self.consensus_score
    }

    pub fn tally(&self) -> VoteTally {
        VoteTally::from_votes(self.votes.values())
    }

    /// Compact vote summary, e.g. `[●●○·]`
    pub fn vote_summary(&self) -> String {
        let symbols: String = self.votes.values().map(Vote::symbol).collect();
        format!("[{}]", symbols)
    }

    /// Record (or replace) a participant's vote.
    pub(crate) fn cast_vote(&mut self, participant: impl Into<String>, vote: Vote) {
        self.votes.insert(participant.into(), vote);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.consensus_score = self.tally().consensus_score();
    }
}
