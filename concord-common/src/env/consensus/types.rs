use std::fmt;

use serde::{Deserialize, Serialize};

/// A participant's response to a consensus request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    Yes,
    No,
    Abstain,
}

impl Vote {
    pub fn from_approval(approved: bool) -> Self {
        if approved {
            Vote::Yes
        } else {
            Vote::No
        }
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Vote::Yes => "Yes",
            Vote::No => "No",
            Vote::Abstain => "Abstain",
        };
        write!(f, "{}", s)
    }
}

/// Protocol steps at which votes are collected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsensusPhase {
    /// PBFT: the primary announces a candidate record.
    PrePrepare,
    /// PBFT: replicas verify the candidate against their tip.
    #[default]
    Prepare,
    /// PBFT: participants apply the record once the quorum holds.
    Commit,
    /// Raft: a candidate asks for leadership.
    RequestVote,
    /// Raft: the leader replicates a record.
    AppendEntries,
    /// Paxos: acceptors promise not to accept lower ballots.
    Promise,
    /// Paxos: acceptors accept the proposal.
    Accept,
}

/// The result of a quorum evaluation for a single proposal and phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Whether the proposal reached quorum.
    pub approved: bool,

    /// The number of affirmative (Yes) votes received.
    pub votes_received: usize,

    /// Size of the electorate the votes were counted against.
    pub total: usize,

    /// The proposal ID this result corresponds to.
    pub proposal_id: String,

    #[serde(default)]
    pub phase: ConsensusPhase,
}
