//! Proof of Stake: a stake-weighted draw picks the proposer, which appends
//! without a voting phase.

use std::collections::HashMap;

use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use concord_common::{
    error::{ConcordError, Result},
    NodeId, Record, RecordTag,
};

use super::{ConsensusStrategy, RoundContext};
use crate::{
    cluster::{builder::NetworkBuilder, core::Network, participant::{Participant, Role}},
    consensus::weighted_pick,
    env::StrategyKind,
};

/// Stakes in the fixed participant enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeTable {
    entries: Vec<(NodeId, u64)>,
}

impl StakeTable {
    /// Sum of all stakes. Fails with [`ConcordError::StakeOverflow`] when the
    /// sum does not fit in a `u64`.
    pub fn total(&self) -> Result<u64> {
        self.entries
            .iter()
            .try_fold(0u64, |acc, (_, stake)| acc.checked_add(*stake))
            .ok_or(ConcordError::StakeOverflow)
    }

    pub fn stake_of(&self, id: &NodeId) -> Option<u64> {
        self.entries.iter().find(|(p, _)| p == id).map(|(_, stake)| *stake)
    }

    /// Updates an existing participant's stake. A stake that would push the
    /// total past `u64::MAX` is rejected and the table is left unchanged.
    pub fn set_stake(&mut self, id: &NodeId, stake: u64) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|(p, _)| p == id)
            .ok_or_else(|| ConcordError::UnknownParticipant(id.clone()))?;
        let previous = std::mem::replace(&mut entry.1, stake);
        if let Err(e) = self.total() {
            if let Some(entry) = self.entries.iter_mut().find(|(p, _)| p == id) {
                entry.1 = previous;
            }
            return Err(e);
        }
        Ok(())
    }

    pub fn entries(&self) -> &[(NodeId, u64)] {
        &self.entries
    }

    /// Draws uniformly in `[0, total)` and walks the table accumulating
    /// stake until the running sum exceeds the draw.
    pub fn select(&self, rng: &mut StdRng) -> Result<&NodeId> {
        let total = self.total()?;
        if total == 0 {
            return Err(ConcordError::NoStake);
        }
        let draw = rng.gen_range(0..total);
        weighted_pick(&self.entries, draw).ok_or(ConcordError::NoStake)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProofOfStake {
    initial: HashMap<NodeId, u64>,
    table: StakeTable,
}

impl ProofOfStake {
    /// Participants absent from `stakes` start with zero stake.
    pub fn new(stakes: HashMap<NodeId, u64>) -> Self {
        Self {
            initial: stakes,
            table: StakeTable::default(),
        }
    }

    pub fn stakes(&self) -> &StakeTable {
        &self.table
    }

    pub fn select_proposer(&self, rng: &mut StdRng) -> Result<NodeId> {
        let proposer = self.table.select(rng)?.clone();
        debug!("🎲 Selected proposer {} (stake {:?}/{:?})", proposer, self.table.stake_of(&proposer), self.table.total().ok());
        Ok(proposer)
    }
}

impl ConsensusStrategy for ProofOfStake {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ProofOfStake
    }

    fn initial_role(&self, _position: usize) -> Role {
        Role::Validator
    }

    fn bootstrap(&mut self, participants: &[Participant]) -> Result<Record> {
        if let Some(unknown) = self
            .initial
            .keys()
            .find(|id| !participants.iter().any(|p| p.id() == *id))
        {
            return Err(ConcordError::UnknownParticipant(unknown.clone()));
        }

        self.table.entries = participants
            .iter()
            .map(|p| (p.id().clone(), self.initial.get(p.id()).copied().unwrap_or(0)))
            .collect();
        self.table.total()?;

        let first = participants.first().ok_or(ConcordError::NoParticipants)?;
        Ok(Record::genesis(RecordTag::Proposer(first.id().clone())))
    }

    fn propose_and_commit(&mut self, ctx: &mut RoundContext<'_>, data: &str) -> Result<Record> {
        let proposer = self.select_proposer(ctx.rng)?;
        let (index, prev_hash) = {
            let tip = ctx.ledger.tip()?;
            (tip.index() + 1, tip.hash().to_string())
        };

        info!("📦 {} proposes record {}", proposer, index);
        tracing::info!(target: "consensus", "EVENT:PROPOSE protocol=pos proposer={} index={}", proposer, index);

        let record = Record::new(index, data, &prev_hash, RecordTag::Proposer(proposer));
        let committed = ctx.ledger.append(record)?.clone();
        ctx.apply_to_all(&committed);
        Ok(committed)
    }
}

impl Network<ProofOfStake> {
    /// Proof of Stake network over `participants` in the given order.
    pub fn pos(participants: &[NodeId], stakes: &HashMap<NodeId, u64>) -> Result<Self> {
        NetworkBuilder::new()
            .with_participants(participants.iter().cloned())
            .build(ProofOfStake::new(stakes.clone()))
    }

    pub fn add_record(&mut self, data: &str) -> Result<Record> {
        self.submit(data)
    }

    /// Performs one stake-weighted draw without committing anything.
    pub fn select_proposer(&mut self) -> Result<NodeId> {
        self.round(|strategy, ctx| strategy.select_proposer(ctx.rng))
    }

    pub fn set_stake(&mut self, id: &NodeId, stake: u64) -> Result<()> {
        self.strategy.table.set_stake(id, stake)
    }

    pub fn stakes(&self) -> &StakeTable {
        self.strategy.stakes()
    }
}
