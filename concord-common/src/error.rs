use thiserror::Error;

use crate::utils::NodeId;

/// Errors raised by the ledger, the consensus strategies and the node runtime.
#[derive(Debug, Error)]
pub enum ConcordError {
    /// An append was rejected because the record does not extend the tip.
    ///
    /// The ledger is left untouched when this is returned.
    #[error("Chain integrity violated at index {index}: {reason}")]
    ChainIntegrity { index: u64, reason: String },

    /// The ledger has no genesis record.
    #[error("Ledger is empty")]
    EmptyLedger,

    /// Proof of Stake selection with a total stake of zero.
    #[error("No stake available for proposer selection")]
    NoStake,

    /// The stakes of a Proof of Stake table sum past `u64::MAX`.
    #[error("Total stake overflows u64")]
    StakeOverflow,

    /// A broadcast failed its quorum threshold and the proposal was dropped.
    #[error("Quorum not reached: {approvals}/{total} approvals under {policy}")]
    QuorumNotReached {
        approvals: usize,
        total: usize,
        policy: String,
    },

    #[error("Participant {0} is not the leader")]
    NotLeader(NodeId),

    #[error("Unknown participant: {0}")]
    UnknownParticipant(NodeId),

    #[error("Network has no participants")]
    NoParticipants,

    #[error("No delegates available")]
    NoDelegates,

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConcordError>;
