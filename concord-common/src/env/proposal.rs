use serde::{Deserialize, Serialize};

use crate::{env::record::Record, utils::NodeId};

/// A candidate entry plus the bookkeeping a voting protocol needs.
///
/// PBFT and Raft attach the fully built candidate record; Paxos carries only
/// the payload and lets every participant build the record at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposal (ballot) number. Higher numbers supersede lower ones.
    pub number: u64,

    /// The participant that authored the proposal.
    pub proposer: NodeId,

    /// The payload to be committed.
    pub data: String,

    /// Candidate record, when the proposer builds it up front.
    #[serde(default)]
    pub candidate: Option<Record>,

    /// Set when the proposal is accepted: by a participant's own copy in
    /// Paxos, by the leader's or primary's copy once quorum passes in Raft
    /// and PBFT.
    #[serde(default)]
    pub accepted: bool,
}

impl Proposal {
    pub fn new(number: u64, proposer: NodeId, data: &str) -> Self {
        Self {
            number,
            proposer,
            data: data.to_string(),
            candidate: None,
            accepted: false,
        }
    }

    pub fn with_candidate(number: u64, proposer: NodeId, candidate: Record) -> Self {
        Self {
            number,
            proposer,
            data: candidate.data().to_string(),
            candidate: Some(candidate),
            accepted: false,
        }
    }

    /// Registry key: proposer plus number.
    pub fn id(&self) -> String {
        format!("{}#{}", self.proposer, self.number)
    }
}
