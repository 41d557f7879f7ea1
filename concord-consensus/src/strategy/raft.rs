//! Raft without timers: explicit elections, then a leader replicates records
//! under a strict majority.
//!
//! In [`ConsensusMode::Simplified`] every vote is granted and leaders never
//! lose their term check. [`ConsensusMode::Strict`] adds terms, one vote per
//! term and the last-log comparison.

use tracing::{debug, info, warn};

use concord_common::{
    env::{
        consensus::types::{ConsensusPhase, Vote},
        proposal::Proposal,
    },
    error::{ConcordError, Result},
    NodeId, Record, RecordTag,
};

use super::{ConsensusStrategy, RoundContext};
use crate::{
    cluster::{builder::NetworkBuilder, core::Network, participant::{Participant, Role}},
    consensus::{ConsensusEvaluator, ThresholdPolicy, VoteRegistry},
    env::{ConsensusMode, StrategyKind},
};

#[derive(Debug, Clone)]
pub struct Raft {
    mode: ConsensusMode,
    leader: Option<NodeId>,
    registry: VoteRegistry,
    evaluator: ConsensusEvaluator,
}

impl Default for Raft {
    fn default() -> Self {
        Self::new(ConsensusMode::default())
    }
}

impl Raft {
    pub fn new(mode: ConsensusMode) -> Self {
        Self {
            mode,
            leader: None,
            registry: VoteRegistry::new(),
            evaluator: ConsensusEvaluator::new(ThresholdPolicy::MajorityOverHalf),
        }
    }

    pub fn mode(&self) -> ConsensusMode {
        self.mode
    }

    pub fn leader(&self) -> Option<&NodeId> {
        self.leader.as_ref()
    }

    /// Runs one election for `candidate`. The candidate votes for itself and
    /// every other participant is polled once.
    pub fn request_vote(&mut self, ctx: &mut RoundContext<'_>, candidate: &NodeId) -> Result<()> {
        let position = ctx
            .position_of(candidate)
            .ok_or_else(|| ConcordError::UnknownParticipant(candidate.clone()))?;

        let request = ctx.participants[position].begin_candidacy(self.mode);
        let election = format!("election:{}@{}", candidate, request.term);
        self.registry.register_proposal(&election);
        self.registry
            .register_vote(&election, ConsensusPhase::RequestVote, candidate.clone(), Vote::Yes);

        info!("🙋 {} requests votes for term {}", candidate, request.term);

        for (i, participant) in ctx.participants.iter_mut().enumerate() {
            if i == position {
                continue;
            }
            let vote = Vote::from_approval(participant.vote_for(&request, self.mode));
            debug!("🗳️ {} votes {} for {}", participant.id(), vote, candidate);
            tracing::info!(target: "consensus", "EVENT:VOTE protocol=raft phase=request_vote voter={} candidate={} term={} vote={}", participant.id(), candidate, request.term, vote);
            self.registry
                .register_vote(&election, ConsensusPhase::RequestVote, participant.id().clone(), vote);
        }

        let result = self
            .evaluator
            .require(&self.registry, &election, ConsensusPhase::RequestVote, ctx.total());
        self.registry.forget(&election);

        match result {
            Ok(outcome) => {
                for participant in ctx.participants.iter_mut() {
                    let role = if participant.id() == candidate {
                        Role::Leader
                    } else {
                        Role::Follower
                    };
                    participant.set_role(role);
                }
                self.leader = Some(candidate.clone());
                info!(
                    "👑 {} elected leader for term {} ({}/{} votes)",
                    candidate, request.term, outcome.votes_received, outcome.total
                );
                tracing::info!(target: "consensus", "EVENT:ELECTED protocol=raft leader={} term={}", candidate, request.term);
                Ok(())
            }
            Err(e) => {
                ctx.participants[position].set_role(Role::Follower);
                warn!("⚠️ Election for {} failed: {}", candidate, e);
                Err(e)
            }
        }
    }

    /// Replicates `data` from `leader` and appends it once a majority has
    /// accepted.
    pub fn lead(&mut self, ctx: &mut RoundContext<'_>, leader: &NodeId, data: &str) -> Result<Record> {
        let proposal = self.replicate(ctx, leader, data)?;
        let id = proposal.id();
        let record = proposal
            .candidate
            .ok_or_else(|| ConcordError::Config(format!("proposal {} carries no candidate", id)))?;
        let committed = ctx.ledger.append(record)?.clone();
        ctx.apply_to_all(&committed);
        Ok(committed)
    }

    /// AppendEntries. Followers accept when the leader's term is current and
    /// the candidate record extends their tip. Returns the proposal marked
    /// accepted once a majority approves.
    fn replicate(&mut self, ctx: &mut RoundContext<'_>, leader: &NodeId, data: &str) -> Result<Proposal> {
        let position = ctx
            .position_of(leader)
            .ok_or_else(|| ConcordError::UnknownParticipant(leader.clone()))?;
        if self.leader.as_ref() != Some(leader) || ctx.participants[position].role() != Role::Leader {
            return Err(ConcordError::NotLeader(leader.clone()));
        }

        let term = ctx.participants[position].term();
        let tip = ctx.ledger.tip()?.clone();
        let candidate = Record::new(tip.index() + 1, data, tip.hash(), RecordTag::None);
        let mut proposal = Proposal::with_candidate(candidate.index(), leader.clone(), candidate);
        let id = proposal.id();
        self.registry.register_proposal(&id);

        tracing::info!(target: "consensus", "EVENT:PROPOSE protocol=raft proposer={} index={} term={}", leader, proposal.number, term);

        for participant in ctx.participants.iter_mut() {
            let approved = match &proposal.candidate {
                Some(record) => {
                    participant.accepts_leader(term, self.mode) && participant.verify_record(&tip, record)
                }
                None => false,
            };
            let vote = Vote::from_approval(approved);
            tracing::info!(target: "consensus", "EVENT:VOTE protocol=raft phase=append_entries voter={} proposal={} vote={}", participant.id(), id, vote);
            self.registry
                .register_vote(&id, ConsensusPhase::AppendEntries, participant.id().clone(), vote);
        }

        let result = self
            .evaluator
            .require(&self.registry, &id, ConsensusPhase::AppendEntries, ctx.total());
        self.registry.forget(&id);
        result?;

        proposal.accepted = true;
        Ok(proposal)
    }
}

impl ConsensusStrategy for Raft {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Raft
    }

    fn initial_role(&self, _position: usize) -> Role {
        Role::Follower
    }

    fn bootstrap(&mut self, _participants: &[Participant]) -> Result<Record> {
        Ok(Record::genesis(RecordTag::None))
    }

    /// Elects the first participant when there is no leader, then leads.
    fn propose_and_commit(&mut self, ctx: &mut RoundContext<'_>, data: &str) -> Result<Record> {
        let leader = match self.leader.clone() {
            Some(leader) => leader,
            None => {
                let first = ctx
                    .participants
                    .first()
                    .map(|p| p.id().clone())
                    .ok_or(ConcordError::NoParticipants)?;
                self.request_vote(ctx, &first)?;
                first
            }
        };
        self.lead(ctx, &leader, data)
    }
}

impl Network<Raft> {
    /// Raft network of `size` followers with simplified voting.
    pub fn raft(size: usize) -> Result<Self> {
        Self::raft_with_mode(size, ConsensusMode::Simplified)
    }

    pub fn raft_with_mode(size: usize, mode: ConsensusMode) -> Result<Self> {
        NetworkBuilder::new().with_size(size).build(Raft::new(mode))
    }

    pub fn request_vote(&mut self, candidate: &NodeId) -> Result<()> {
        self.round(|raft, ctx| raft.request_vote(ctx, candidate))
    }

    /// Fails with [`ConcordError::NotLeader`] unless `leader` currently holds
    /// leadership.
    pub fn lead(&mut self, leader: &NodeId, data: &str) -> Result<Record> {
        self.commit_round(|raft, ctx| raft.lead(ctx, leader, data))
    }

    pub fn leader(&self) -> Option<&NodeId> {
        self.strategy.leader()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elect_then_lead() {
        let mut net = Network::raft(5).unwrap();
        let candidate = NodeId::numbered(0);
        net.request_vote(&candidate).unwrap();
        assert_eq!(net.leader(), Some(&candidate));

        let leader = net.leader().cloned().unwrap();
        net.lead(&leader, "block1").unwrap();
        net.lead(&leader, "block2").unwrap();

        assert_eq!(net.ledger().len(), 3);
        assert_eq!(net.ledger().tip().unwrap().data(), "block2");
        assert!(net.ledger().is_valid());
    }

    #[test]
    fn test_roles_after_election() {
        let mut net = Network::raft(3).unwrap();
        assert!(net.participants().iter().all(|p| p.role() == Role::Follower));

        net.request_vote(&NodeId::numbered(2)).unwrap();
        assert_eq!(net.participant(&NodeId::numbered(2)).unwrap().role(), Role::Leader);
        assert_eq!(net.participant(&NodeId::numbered(0)).unwrap().role(), Role::Follower);

        // A new election hands leadership over
        net.request_vote(&NodeId::numbered(1)).unwrap();
        assert_eq!(net.leader(), Some(&NodeId::numbered(1)));
        assert_eq!(net.participant(&NodeId::numbered(2)).unwrap().role(), Role::Follower);
    }

    #[test]
    fn test_non_leader_cannot_lead() {
        let mut net = Network::raft(3).unwrap();
        let follower = NodeId::numbered(1);
        assert!(matches!(net.lead(&follower, "x"), Err(ConcordError::NotLeader(_))));

        net.request_vote(&NodeId::numbered(0)).unwrap();
        assert!(matches!(net.lead(&follower, "x"), Err(ConcordError::NotLeader(_))));
        assert_eq!(net.ledger().len(), 1);
    }

    #[test]
    fn test_unknown_candidate() {
        let mut net = Network::raft(3).unwrap();
        let err = net.request_vote(&NodeId::from("ghost")).unwrap_err();
        assert!(matches!(err, ConcordError::UnknownParticipant(_)));
    }

    #[test]
    fn test_submit_elects_first_participant() {
        let mut net = Network::raft(5).unwrap();
        assert!(net.leader().is_none());
        net.submit("auto").unwrap();
        assert_eq!(net.leader(), Some(&NodeId::numbered(0)));
        assert_eq!(net.ledger().len(), 2);
    }

    #[test]
    fn test_single_node_elects_itself() {
        let mut net = Network::raft(1).unwrap();
        net.request_vote(&NodeId::numbered(0)).unwrap();
        net.lead(&NodeId::numbered(0), "solo").unwrap();
        assert_eq!(net.ledger().len(), 2);
    }

    #[test]
    fn test_strict_terms_advance() {
        let mut net = Network::raft_with_mode(3, ConsensusMode::Strict).unwrap();
        net.request_vote(&NodeId::numbered(0)).unwrap();
        assert!(net.participants().iter().all(|p| p.term() == 1));

        net.request_vote(&NodeId::numbered(1)).unwrap();
        assert!(net.participants().iter().all(|p| p.term() == 2));

        // The deposed leader can no longer replicate
        let old = NodeId::numbered(0);
        assert!(matches!(net.lead(&old, "stale"), Err(ConcordError::NotLeader(_))));
        net.lead(&NodeId::numbered(1), "fresh").unwrap();
        assert_eq!(net.ledger().tip().unwrap().data(), "fresh");
    }

    #[test]
    fn test_strict_stale_leader_term_refused() {
        let mut net = Network::raft_with_mode(3, ConsensusMode::Strict).unwrap();
        net.request_vote(&NodeId::numbered(0)).unwrap();

        // Followers move to a newer term behind the leader's back
        for p in net.participants.iter_mut().skip(1) {
            p.accepts_leader(5, ConsensusMode::Strict);
        }
        let err = net.lead(&NodeId::numbered(0), "late").unwrap_err();
        assert!(matches!(err, ConcordError::QuorumNotReached { approvals: 1, total: 3, .. }));
        assert_eq!(net.ledger().len(), 1);
    }

    #[test]
    fn test_replicated_entry_marked_accepted() {
        let mut net = Network::raft(3).unwrap();
        let leader = NodeId::numbered(0);
        net.request_vote(&leader).unwrap();

        let proposal = net.round(|raft, ctx| raft.replicate(ctx, &leader, "block1")).unwrap();
        assert!(proposal.accepted);
        assert_eq!(proposal.number, 1);
        // Replication alone does not commit
        assert_eq!(net.ledger().len(), 1);
    }
}
