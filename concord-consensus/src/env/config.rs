use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use concord_common::error::ConcordError;

/// Leading zero hex digits a mined record hash must carry by default.
pub const DEFAULT_DIFFICULTY: usize = 4;

/// The six interchangeable consensus protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    #[serde(rename = "pow")]
    ProofOfWork,
    #[serde(rename = "pos")]
    ProofOfStake,
    #[serde(rename = "dpos")]
    DelegatedProofOfStake,
    #[serde(rename = "pbft")]
    Pbft,
    #[serde(rename = "raft")]
    Raft,
    #[serde(rename = "paxos")]
    Paxos,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::ProofOfWork,
        StrategyKind::ProofOfStake,
        StrategyKind::DelegatedProofOfStake,
        StrategyKind::Pbft,
        StrategyKind::Raft,
        StrategyKind::Paxos,
    ];

    pub fn short_name(&self) -> &'static str {
        match self {
            StrategyKind::ProofOfWork => "pow",
            StrategyKind::ProofOfStake => "pos",
            StrategyKind::DelegatedProofOfStake => "dpos",
            StrategyKind::Pbft => "pbft",
            StrategyKind::Raft => "raft",
            StrategyKind::Paxos => "paxos",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyKind::ProofOfWork => "Proof of Work",
            StrategyKind::ProofOfStake => "Proof of Stake",
            StrategyKind::DelegatedProofOfStake => "Delegated Proof of Stake",
            StrategyKind::Pbft => "PBFT",
            StrategyKind::Raft => "Raft",
            StrategyKind::Paxos => "Paxos",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for StrategyKind {
    type Err = ConcordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.short_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConcordError::Config(format!("unknown protocol '{}'", s)))
    }
}

/// How faithfully Raft and Paxos enforce their safety rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusMode {
    /// Teaching behaviour: Raft votes are unconditional and Paxos acceptance
    /// is a proposal-number match.
    #[default]
    Simplified,
    /// Raft terms with one vote per term and log comparison; Paxos
    /// Prepare/Promise with ballot monotonicity.
    Strict,
}

/// How DPoS orders delegates after a tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TallyOrdering {
    /// Shuffle every voted-for delegate; vote counts do not affect order.
    #[default]
    Shuffle,
    /// Sort by vote count descending, shuffling only within ties.
    ByVotes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowConfig {
    pub difficulty: usize,
}

impl Default for PowConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("pbft".parse::<StrategyKind>().unwrap(), StrategyKind::Pbft);
        assert_eq!("DPoS".parse::<StrategyKind>().unwrap(), StrategyKind::DelegatedProofOfStake);
        assert!("zab".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_kind_serde_names() {
        for kind in StrategyKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.short_name()));
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(PowConfig::default().difficulty, 4);
        assert_eq!(ConsensusMode::default(), ConsensusMode::Simplified);
        assert_eq!(TallyOrdering::default(), TallyOrdering::Shuffle);
        assert_eq!(serde_json::to_string(&TallyOrdering::ByVotes).unwrap(), "\"by_votes\"");
    }
}
