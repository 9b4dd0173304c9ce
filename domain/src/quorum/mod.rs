//! Quorum consensus domain
//!
//! Findings produced by workflow steps are subject to peer agreement.
//! Reviewer participants (validators and critics) cast [`Vote`]s; the
//! per-Finding [`VoteTally`] yields a consensus score and a
//! [`ConsensusReport`] decides whether the session can be finalized.
//!
//! ```text
//! score = agree / (agree + disagree)      abstentions excluded
//! score = 0                                when nobody voted decisively
//! ```
//!
//! Stricter weightings (per-role weights, vote decay) are not modelled; the
//! ratio above is the whole policy.

pub mod consensus;
pub mod vote;

// Re-export main types
pub use consensus::{
    ConsensusOutcome, ConsensusReport, DEFAULT_CONSENSUS_THRESHOLD, FindingConsensus,
};
pub use vote::{Vote, VoteTally};
