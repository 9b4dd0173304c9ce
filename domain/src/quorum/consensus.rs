//! Consensus evaluation over a session's Findings.

use serde::{Deserialize, Serialize};

use super::vote::VoteTally;

/// Default minimum consensus score for a Finding to be accepted.
pub const DEFAULT_CONSENSUS_THRESHOLD: f64 = 0.5;

/// Outcome of evaluating consensus for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusOutcome {
    /// Every top-level Finding met the threshold
    Reached,
    /// At least one top-level Finding fell short
    Shortfall,
    /// No Finding was produced at all
    NoFindings,
}

impl ConsensusOutcome {
    pub fn is_reached(&self) -> bool {
        matches!(self, ConsensusOutcome::Reached)
    }
}

impl std::fmt::Display for ConsensusOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsensusOutcome::Reached => write!(f, "Reached"),
            ConsensusOutcome::Shortfall => write!(f, "Shortfall"),
            ConsensusOutcome::NoFindings => write!(f, "No findings"),
        }
    }
}

/// Consensus state of one top-level Finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingConsensus {
    pub finding_id: String,
    pub step_id: String,
    pub score: f64,
    pub tally: VoteTally,
    pub meets_threshold: bool,
}

/// Result of a consensus evaluation
///
/// # Example
///
/// ```
/// use sciquorum_domain::quorum::{ConsensusOutcome, ConsensusReport, VoteTally};
///
/// let tally = VoteTally { agree: 2, disagree: 1, abstain: 0 };
/// let report = ConsensusReport::evaluate(1, [("f1", "search", tally)], 0.5);
/// assert_eq!(report.outcome, ConsensusOutcome::Reached);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusReport {
    pub threshold: f64,
    pub outcome: ConsensusOutcome,
    pub findings: Vec<FindingConsensus>,
}

impl ConsensusReport {
    /// Evaluate top-level Findings against `threshold`.
    ///
    /// `total_findings` counts every Finding in the session (reviewed or
    /// not); zero means nothing was produced. An empty set of top-level
    /// Findings with `total_findings > 0` is trivially [`ConsensusOutcome::Reached`].
    pub fn evaluate<'a>(
        total_findings: usize,
        top_level: impl IntoIterator<Item = (&'a str, &'a str, VoteTally)>,
        threshold: f64,
    ) -> Self {
        let findings: Vec<FindingConsensus> = top_level
            .into_iter()
            .map(|(finding_id, step_id, tally)| {
                let score = tally.consensus_score();
                FindingConsensus {
                    finding_id: finding_id.to_string(),
                    step_id: step_id.to_string(),
                    score,
                    tally,
                    meets_threshold: score >= threshold,
                }
            })
            .collect();

        let outcome = if total_findings == 0 {
            ConsensusOutcome::NoFindings
        } else if findings.iter().all(|f| f.meets_threshold) {
            ConsensusOutcome::Reached
        } else {
            ConsensusOutcome::Shortfall
        };

        Self {
            threshold,
            outcome,
            findings,
        }
    }

    /// Findings that fell below the threshold
    pub fn shortfalls(&self) -> impl Iterator<Item = &FindingConsensus> {
        self.findings.iter().filter(|f| !f.meets_threshold)
    }

    /// One-line description of the shortfall, e.g. `f-1 0.33 < 0.50`
    pub fn shortfall_summary(&self) -> String {
        self.shortfalls()
            .map(|f| format!("{} {:.2} < {:.2}", f.finding_id, f.score, self.threshold))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
