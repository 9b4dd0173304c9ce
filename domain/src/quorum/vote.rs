//! Vote types for Finding consensus
//!
//! This module defines the voting primitives participants use to agree or
//! disagree with a Finding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single participant's vote on a Finding
///
/// # Example
///
/// ```
/// use sciquorum_domain::quorum::Vote;
///
/// assert_eq!("agree".parse::<Vote>(), Ok(Vote::Agree));
/// assert_eq!(Vote::from_verdict(&serde_json::json!(false)), Vote::Disagree);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Agree,
    Disagree,
    Abstain,
}

impl Vote {
    pub fn as_str(&self) -> &str {
        match self {
            Vote::Agree => "agree",
            Vote::Disagree => "disagree",
            Vote::Abstain => "abstain",
        }
    }

    /// Read a vote from a reviewer's verdict value.
    ///
    /// Accepts the strings `agree`/`disagree`/`abstain` (and a few common
    /// synonyms) or booleans. Anything else counts as an abstention.
    pub fn from_verdict(value: &Value) -> Self {
        match value {
            Value::Bool(true) => Vote::Agree,
            Value::Bool(false) => Vote::Disagree,
            Value::String(s) => s.parse().unwrap_or(Vote::Abstain),
            _ => Vote::Abstain,
        }
    }

    /// Read the vote a reviewer payload casts on the Finding of `step_id`.
    ///
    /// `verdicts.<step_id>` takes precedence over a blanket `verdict`. A
    /// payload carrying neither abstains.
    pub fn from_payload(payload: &Value, step_id: &str) -> Self {
        payload
            .get("verdicts")
            .and_then(|v| v.get(step_id))
            .or_else(|| payload.get("verdict"))
            .map(Self::from_verdict)
            .unwrap_or(Vote::Abstain)
    }

    /// Symbol used in compact vote summaries
    pub fn symbol(&self) -> char {
        match self {
            Vote::Agree => '●',
            Vote::Disagree => '○',
            Vote::Abstain => '·',
        }
    }
}

impl std::fmt::Display for Vote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Vote {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "agree" | "approve" | "approved" | "yes" | "support" | "supported" => Ok(Vote::Agree),
            "disagree" | "reject" | "rejected" | "no" | "refute" | "refuted" => {
                Ok(Vote::Disagree)
            }
            "abstain" | "neutral" | "unsure" | "unknown" => Ok(Vote::Abstain),
            other => Err(format!(
                "Unknown vote: {}. Valid: agree, disagree, abstain",
                other
            )),
        }
    }
}

/// Aggregated counts of votes on one Finding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub agree: usize,
    pub disagree: usize,
    pub abstain: usize,
}

impl VoteTally {
    pub fn from_votes<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Self {
        let mut tally = Self::default();
        for vote in votes {
            match vote {
                Vote::Agree => tally.agree += 1,
                Vote::Disagree => tally.disagree += 1,
                Vote::Abstain => tally.abstain += 1,
            }
        }
        tally
    }

    pub fn total(&self) -> usize {
        self.agree + self.disagree + self.abstain
    }

    /// `agree / (agree + disagree)`; abstentions are excluded.
    ///
    /// With no decisive votes the score is `0.0`: an unreviewed claim is
    /// unsupported, not neutral.
    pub fn consensus_score(&self) -> f64 {
        let decisive = self.agree + self.disagree;
        if decisive == 0 {
            0.0
        } else {
            self.agree as f64 / decisive as f64
        }
    }

    pub fn is_unanimous(&self) -> bool {
        let decisive = self.agree + self.disagree;
        decisive > 0 && (self.agree == decisive || self.disagree == decisive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vote_parsing() {
        assert_eq!("Agree".parse::<Vote>(), Ok(Vote::Agree));
        assert_eq!(" reject ".parse::<Vote>(), Ok(Vote::Disagree));
        assert_eq!("neutral".parse::<Vote>(), Ok(Vote::Abstain));
        assert!("maybe".parse::<Vote>().is_err());
    }

    #[test]
    fn test_from_verdict() {
        assert_eq!(Vote::from_verdict(&json!(true)), Vote::Agree);
        assert_eq!(Vote::from_verdict(&json!("disagree")), Vote::Disagree);
        assert_eq!(Vote::from_verdict(&json!("perhaps")), Vote::Abstain);
        assert_eq!(Vote::from_verdict(&json!(0.7)), Vote::Abstain);
    }

    #[test]
    fn test_from_payload_prefers_per_step_verdict() {
        let payload = json!({"verdict": "agree", "verdicts": {"search": "disagree"}});
        assert_eq!(Vote::from_payload(&payload, "search"), Vote::Disagree);
        assert_eq!(Vote::from_payload(&payload, "other"), Vote::Agree);
        assert_eq!(Vote::from_payload(&json!({"hits": 3}), "search"), Vote::Abstain);
    }

    #[test]
    fn test_score_excludes_abstentions() {
        let votes = [
            Vote::Agree,
            Vote::Agree,
            Vote::Agree,
            Vote::Disagree,
            Vote::Abstain,
        ];
        let tally = VoteTally::from_votes(&votes);
        assert_eq!(tally.total(), 5);
        assert_eq!(tally.consensus_score(), 0.75);
    }

    #[test]
    fn test_no_votes_scores_zero() {
        assert_eq!(VoteTally::default().consensus_score(), 0.0);
    }

    #[test]
    fn test_only_abstentions_scores_zero() {
        let tally = VoteTally::from_votes(&[Vote::Abstain, Vote::Abstain]);
        assert_eq!(tally.consensus_score(), 0.0);
        assert!(!tally.is_unanimous());
    }

    #[test]
    fn test_unanimous() {
        let tally = VoteTally::from_votes(&[Vote::Disagree, Vote::Disagree, Vote::Abstain]);
        assert!(tally.is_unanimous());
        assert_eq!(tally.consensus_score(), 0.0);
    }
}
