use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use concord_common::{
    crypto::hash::MAX_DIFFICULTY,
    error::{ConcordError, Result},
    NodeId,
};
use concord_consensus::{ConsensusMode, StrategyKind, TallyOrdering, env::DEFAULT_DIFFICULTY};

/// One cast DPoS vote. Votes are replayed in file order, so a later entry
/// from the same voter wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVote {
    pub voter: NodeId,
    pub delegate: NodeId,
}

/// Everything needed to replay one consensus run from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub protocol: StrategyKind,
    /// Participant count for PBFT, Raft and Paxos when `participants` is empty.
    pub size: usize,
    /// Explicit participant names; PoS enumerates stakes in this order.
    pub participants: Vec<NodeId>,
    pub stakes: BTreeMap<NodeId, u64>,
    pub delegates: Vec<NodeId>,
    pub votes: Vec<CastVote>,
    pub payloads: Vec<String>,
    pub seed: Option<u64>,
    pub difficulty: usize,
    pub mode: ConsensusMode,
    /// PBFT replicas that abstain from Prepare.
    pub faulty: usize,
    pub tally_ordering: TallyOrdering,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            protocol: StrategyKind::Paxos,
            size: 5,
            participants: Vec::new(),
            stakes: BTreeMap::new(),
            delegates: Vec::new(),
            votes: Vec::new(),
            payloads: Vec::new(),
            seed: None,
            difficulty: DEFAULT_DIFFICULTY,
            mode: ConsensusMode::default(),
            faulty: 0,
            tally_ordering: TallyOrdering::default(),
        }
    }
}

fn names(list: &[&str]) -> Vec<NodeId> {
    list.iter().map(|n| NodeId::from(*n)).collect()
}

fn payloads(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| p.to_string()).collect()
}

impl SimulationConfig {
    /// The demonstration run for `protocol`.
    pub fn demo(protocol: StrategyKind) -> Self {
        let base = Self {
            protocol,
            ..Self::default()
        };

        match protocol {
            StrategyKind::ProofOfWork => Self {
                payloads: payloads(&["First block data", "Second block data", "Third block data"]),
                ..base
            },
            StrategyKind::ProofOfStake => Self {
                participants: names(&["Alice", "Bob", "Charlie"]),
                stakes: [("Alice", 50), ("Bob", 30), ("Charlie", 20)]
                    .into_iter()
                    .map(|(id, stake)| (NodeId::from(id), stake))
                    .collect(),
                payloads: payloads(&["First staked data", "Second staked data", "Third staked data"]),
                ..base
            },
            StrategyKind::DelegatedProofOfStake => Self {
                delegates: names(&["Alice", "Bob", "Charlie"]),
                votes: [
                    ("Voter1", "Alice"),
                    ("Voter2", "Bob"),
                    ("Voter3", "Alice"),
                    ("Voter4", "Charlie"),
                    ("Voter5", "Bob"),
                ]
                .into_iter()
                .map(|(voter, delegate)| CastVote {
                    voter: voter.into(),
                    delegate: delegate.into(),
                })
                .collect(),
                payloads: payloads(&["First voting data", "Second voting data"]),
                ..base
            },
            StrategyKind::Pbft => Self {
                payloads: payloads(&["tx1", "tx2"]),
                ..base
            },
            StrategyKind::Raft => Self {
                payloads: payloads(&["block1", "block2"]),
                ..base
            },
            StrategyKind::Paxos => Self {
                payloads: payloads(&[
                    "First distributed system data",
                    "Second distributed system data",
                    "Third distributed system data",
                ]),
                ..base
            },
        }
    }

    /// Participants for the sized protocols: explicit names win over `size`.
    pub fn participant_ids(&self) -> Vec<NodeId> {
        if self.participants.is_empty() {
            (0..self.size).map(NodeId::numbered).collect()
        } else {
            self.participants.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.payloads.is_empty() {
            return Err(ConcordError::Config("no payloads to submit".into()));
        }
        if self.protocol == StrategyKind::ProofOfStake && self.participants.is_empty() {
            return Err(ConcordError::Config("pos needs an explicit participant list".into()));
        }
        if self.protocol == StrategyKind::ProofOfWork && self.difficulty > MAX_DIFFICULTY {
            return Err(ConcordError::Config(format!(
                "difficulty {} cannot exceed {}",
                self.difficulty, MAX_DIFFICULTY
            )));
        }
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let parsed = serde_json::from_str::<SimulationConfig>(&data)?;
        Ok(parsed)
    }
}
