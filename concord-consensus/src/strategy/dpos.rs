//! Delegated Proof of Stake: voters elect delegates, a uniformly drawn
//! delegate appends without a voting phase.

use std::collections::{BTreeMap, HashMap};

use rand::{rngs::StdRng, seq::SliceRandom};
use tracing::{info, warn};

use concord_common::{
    error::{ConcordError, Result},
    NodeId, Record, RecordTag,
};

use super::{ConsensusStrategy, RoundContext};
use crate::{
    cluster::{builder::NetworkBuilder, core::Network, participant::{Participant, Role}},
    env::{StrategyKind, TallyOrdering},
};

#[derive(Debug, Clone, Default)]
pub struct DelegatedProofOfStake {
    delegates: Vec<NodeId>,
    votes: BTreeMap<NodeId, NodeId>,
    ordering: TallyOrdering,
}

impl DelegatedProofOfStake {
    pub fn new(delegates: Vec<NodeId>, votes: HashMap<NodeId, NodeId>) -> Self {
        Self {
            delegates,
            votes: votes.into_iter().collect(),
            ordering: TallyOrdering::default(),
        }
    }

    pub fn with_ordering(mut self, ordering: TallyOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn delegates(&self) -> &[NodeId] {
        &self.delegates
    }

    /// Voter to chosen delegate.
    pub fn votes(&self) -> &BTreeMap<NodeId, NodeId> {
        &self.votes
    }

    pub fn ordering(&self) -> TallyOrdering {
        self.ordering
    }

    /// Records `voter`'s choice, replacing any earlier one. The delegate is
    /// not checked against the current delegate list.
    pub fn vote(&mut self, voter: NodeId, delegate: NodeId) {
        if let Some(previous) = self.votes.insert(voter.clone(), delegate.clone()) {
            if previous != delegate {
                info!("🔄 {} changed vote {} -> {}", voter, previous, delegate);
            }
        }
        tracing::info!(target: "consensus", "EVENT:VOTE protocol=dpos voter={} delegate={}", voter, delegate);
    }

    /// Counts votes per delegate and rebuilds the delegate list from every
    /// delegate that received at least one vote.
    ///
    /// Returns the counts. With no votes cast the list is kept as is.
    pub fn tally(&mut self, rng: &mut StdRng) -> BTreeMap<NodeId, usize> {
        let mut counts: BTreeMap<NodeId, usize> = BTreeMap::new();
        for delegate in self.votes.values() {
            *counts.entry(delegate.clone()).or_insert(0) += 1;
        }

        if counts.is_empty() {
            warn!("⚠️ No votes cast, delegate list unchanged");
            return counts;
        }

        let mut order: Vec<NodeId> = counts.keys().cloned().collect();
        order.shuffle(rng);
        if self.ordering == TallyOrdering::ByVotes {
            // Stable sort keeps the shuffled order within ties
            order.sort_by(|a, b| counts[b].cmp(&counts[a]));
        }

        info!("🗳️ Delegates after tally: {:?}", order.iter().map(NodeId::as_str).collect::<Vec<_>>());
        self.delegates = order;
        counts
    }

    pub fn select_delegate(&self, rng: &mut StdRng) -> Result<NodeId> {
        self.delegates.choose(rng).cloned().ok_or(ConcordError::NoDelegates)
    }
}

impl ConsensusStrategy for DelegatedProofOfStake {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DelegatedProofOfStake
    }

    // Delegates are checked in bootstrap so an empty list reports NoDelegates.
    fn requires_participants(&self) -> bool {
        false
    }

    fn initial_role(&self, _position: usize) -> Role {
        Role::Delegate
    }

    fn bootstrap(&mut self, _participants: &[Participant]) -> Result<Record> {
        let first = self.delegates.first().ok_or(ConcordError::NoDelegates)?;
        Ok(Record::genesis(RecordTag::Proposer(first.clone())))
    }

    fn propose_and_commit(&mut self, ctx: &mut RoundContext<'_>, data: &str) -> Result<Record> {
        let delegate = self.select_delegate(ctx.rng)?;
        let (index, prev_hash) = {
            let tip = ctx.ledger.tip()?;
            (tip.index() + 1, tip.hash().to_string())
        };

        info!("📦 Delegate {} proposes record {}", delegate, index);
        tracing::info!(target: "consensus", "EVENT:PROPOSE protocol=dpos proposer={} index={}", delegate, index);

        let record = Record::new(index, data, &prev_hash, RecordTag::Proposer(delegate));
        let committed = ctx.ledger.append(record)?.clone();
        ctx.apply_to_all(&committed);
        Ok(committed)
    }
}

impl Network<DelegatedProofOfStake> {
    /// DPoS network whose participants are the initial delegates.
    pub fn dpos(delegates: &[NodeId], votes: &HashMap<NodeId, NodeId>) -> Result<Self> {
        NetworkBuilder::new()
            .with_participants(delegates.iter().cloned())
            .build(DelegatedProofOfStake::new(delegates.to_vec(), votes.clone()))
    }

    pub fn vote(&mut self, voter: impl Into<NodeId>, delegate: impl Into<NodeId>) {
        self.strategy.vote(voter.into(), delegate.into());
    }

    pub fn tally_votes(&mut self) -> BTreeMap<NodeId, usize> {
        self.round(|strategy, ctx| strategy.tally(ctx.rng))
    }

    pub fn add_record(&mut self, data: &str) -> Result<Record> {
        self.submit(data)
    }

    pub fn delegates(&self) -> &[NodeId] {
        self.strategy.delegates()
    }

    pub fn votes(&self) -> &BTreeMap<NodeId, NodeId> {
        self.strategy.votes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|n| NodeId::from(*n)).collect()
    }

    fn seeded(delegates: &[&str], ordering: TallyOrdering, seed: u64) -> Network<DelegatedProofOfStake> {
        NetworkBuilder::new()
            .with_participants(delegates.iter().copied())
            .with_seed(seed)
            .build(DelegatedProofOfStake::new(ids(delegates), HashMap::new()).with_ordering(ordering))
            .unwrap()
    }

    #[test]
    fn test_genesis_tagged_with_first_delegate() {
        let net = Network::dpos(&ids(&["Alice", "Bob"]), &HashMap::new()).unwrap();
        assert_eq!(net.ledger().tip().unwrap().proposer(), Some(&NodeId::from("Alice")));
        assert!(net.participants().iter().all(|p| p.role() == Role::Delegate));
    }

    #[test]
    fn test_no_delegates() {
        let err = Network::dpos(&[], &HashMap::new()).unwrap_err();
        assert!(matches!(err, ConcordError::NoDelegates));
    }

    #[test]
    fn test_last_vote_wins() {
        let mut net = seeded(&["Alice", "Bob"], TallyOrdering::Shuffle, 1);
        net.vote("Voter1", "Alice");
        net.vote("Voter1", "Bob");

        assert_eq!(net.votes().len(), 1);
        assert_eq!(net.votes()[&NodeId::from("Voter1")], NodeId::from("Bob"));

        let counts = net.tally_votes();
        assert_eq!(counts.get(&NodeId::from("Bob")), Some(&1));
        assert_eq!(counts.get(&NodeId::from("Alice")), None);
        assert_eq!(net.delegates(), ids(&["Bob"]).as_slice());
    }

    #[test]
    fn test_tally_keeps_voted_delegates_only() {
        let mut net = seeded(&["Alice", "Bob", "Carol"], TallyOrdering::Shuffle, 9);
        net.vote("v1", "Alice");
        net.vote("v2", "Carol");
        net.vote("v3", "Carol");
        // Not a registered delegate, still counted
        net.vote("v4", "Dave");

        let counts = net.tally_votes();
        assert_eq!(counts[&NodeId::from("Carol")], 2);

        let mut delegates = net.delegates().to_vec();
        delegates.sort();
        assert_eq!(delegates, ids(&["Alice", "Carol", "Dave"]));
    }

    #[test]
    fn test_tally_without_votes_keeps_list() {
        let mut net = seeded(&["Alice", "Bob"], TallyOrdering::Shuffle, 2);
        assert!(net.tally_votes().is_empty());
        assert_eq!(net.delegates(), ids(&["Alice", "Bob"]).as_slice());
    }

    #[test]
    fn test_by_votes_ordering() {
        let mut net = seeded(&["Alice", "Bob", "Carol"], TallyOrdering::ByVotes, 5);
        net.vote("v1", "Bob");
        net.vote("v2", "Bob");
        net.vote("v3", "Bob");
        net.vote("v4", "Carol");
        net.vote("v5", "Carol");
        net.vote("v6", "Alice");

        net.tally_votes();
        assert_eq!(net.delegates(), ids(&["Bob", "Carol", "Alice"]).as_slice());
    }

    #[test]
    fn test_records_proposed_by_delegates() {
        let mut net = seeded(&["Alice", "Bob"], TallyOrdering::Shuffle, 11);
        net.vote("v1", "Bob");
        net.tally_votes();

        for i in 0..5 {
            let record = net.add_record(&format!("tx{}", i)).unwrap();
            assert_eq!(record.proposer(), Some(&NodeId::from("Bob")));
        }
        assert_eq!(net.ledger().len(), 6);
        assert!(net.ledger().is_valid());
    }
}
