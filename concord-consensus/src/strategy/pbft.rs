//! PBFT: a fixed primary proposes, every participant verifies, and the
//! record commits under a two-thirds quorum. No view change.

use tracing::{debug, info};

use concord_common::{
    env::{
        consensus::types::{ConsensusPhase, ConsensusResult, Vote},
        proposal::Proposal,
    },
    error::{ConcordError, Result},
    Record, RecordTag,
};

use super::{ConsensusStrategy, RoundContext};
use crate::{
    cluster::{builder::NetworkBuilder, core::Network, participant::{Participant, Role}},
    consensus::{ConsensusEvaluator, ThresholdPolicy, VoteRegistry},
    env::StrategyKind,
};

#[derive(Debug, Clone)]
pub struct Pbft {
    faulty: usize,
    registry: VoteRegistry,
    evaluator: ConsensusEvaluator,
}

impl Default for Pbft {
    fn default() -> Self {
        Self::new()
    }
}

impl Pbft {
    pub fn new() -> Self {
        Self {
            faulty: 0,
            registry: VoteRegistry::new(),
            evaluator: ConsensusEvaluator::new(ThresholdPolicy::TwoThirdsOrMore),
        }
    }

    /// The last `faulty` replicas abstain from every Prepare round.
    pub fn with_faulty(mut self, faulty: usize) -> Self {
        self.faulty = faulty;
        self
    }

    pub fn faulty(&self) -> usize {
        self.faulty
    }

    /// PrePrepare: the primary builds a candidate extending the tip.
    fn pre_prepare(&mut self, ctx: &RoundContext<'_>, data: &str) -> Result<(Record, Proposal)> {
        let primary = ctx.participants.first().ok_or(ConcordError::NoParticipants)?;
        let tip = ctx.ledger.tip()?.clone();
        let candidate = Record::new(tip.index() + 1, data, tip.hash(), RecordTag::None);
        let proposal = Proposal::with_candidate(candidate.index(), primary.id().clone(), candidate);

        let id = proposal.id();
        self.registry.register_proposal(&id);
        self.registry
            .register_vote(&id, ConsensusPhase::PrePrepare, primary.id().clone(), Vote::Yes);

        info!("📨 Primary {} pre-prepares record {}", primary.id(), proposal.number);
        tracing::info!(target: "consensus", "EVENT:PROPOSE protocol=pbft proposer={} index={}", primary.id(), proposal.number);
        Ok((tip, proposal))
    }

    /// Position of the first abstaining replica. The primary never abstains.
    fn first_faulty(&self, total: usize) -> usize {
        total - self.faulty.min(total.saturating_sub(1))
    }

    /// Prepare: every participant checks the candidate against `tip`.
    /// Faulty replicas abstain. The proposal is marked accepted on quorum.
    fn prepare(&mut self, ctx: &RoundContext<'_>, tip: &Record, proposal: &mut Proposal) -> Result<ConsensusResult> {
        let candidate = proposal.candidate.as_ref().ok_or_else(|| {
            ConcordError::Config(format!("proposal {} carries no candidate", proposal.id()))
        })?;
        let id = proposal.id();
        let total = ctx.total();
        let first_faulty = self.first_faulty(total);

        for (position, participant) in ctx.participants.iter().enumerate() {
            let vote = if position >= first_faulty {
                Vote::Abstain
            } else {
                Vote::from_approval(participant.verify_record(tip, candidate))
            };
            debug!("🗳️ {} prepare vote on [{}]: {}", participant.id(), id, vote);
            tracing::info!(target: "consensus", "EVENT:VOTE protocol=pbft phase=prepare voter={} proposal={} vote={}", participant.id(), id, vote);
            self.registry
                .register_vote(&id, ConsensusPhase::Prepare, participant.id().clone(), vote);
        }

        let result = self.evaluator.require(&self.registry, &id, ConsensusPhase::Prepare, total);
        match result {
            Ok(_) => proposal.accepted = true,
            Err(_) => self.registry.forget(&id),
        }
        result
    }

    /// Commit: every prepared participant acknowledges; the record is
    /// appended once the acknowledgements reach quorum.
    fn commit(&mut self, ctx: &mut RoundContext<'_>, proposal: Proposal) -> Result<Record> {
        let id = proposal.id();
        let candidate = proposal.candidate.ok_or_else(|| {
            ConcordError::Config(format!("proposal {} carries no candidate", id))
        })?;
        let total = ctx.total();
        let first_faulty = self.first_faulty(total);

        for (position, participant) in ctx.participants.iter().enumerate() {
            let vote = if position >= first_faulty { Vote::Abstain } else { Vote::Yes };
            tracing::info!(target: "consensus", "EVENT:VOTE protocol=pbft phase=commit voter={} proposal={} vote={}", participant.id(), id, vote);
            self.registry
                .register_vote(&id, ConsensusPhase::Commit, participant.id().clone(), vote);
        }

        let appended = self
            .evaluator
            .require(&self.registry, &id, ConsensusPhase::Commit, total)
            .and_then(|_| ctx.ledger.append(candidate).cloned());
        self.registry.forget(&id);
        let committed = appended?;
        ctx.apply_to_all(&committed);
        Ok(committed)
    }
}

impl ConsensusStrategy for Pbft {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Pbft
    }

    fn initial_role(&self, position: usize) -> Role {
        if position == 0 {
            Role::Primary
        } else {
            Role::Replica
        }
    }

    fn bootstrap(&mut self, participants: &[Participant]) -> Result<Record> {
        if self.faulty >= participants.len() {
            return Err(ConcordError::Config(format!(
                "{} faulty replicas in a network of {}",
                self.faulty,
                participants.len()
            )));
        }
        Ok(Record::genesis(RecordTag::None))
    }

    fn propose_and_commit(&mut self, ctx: &mut RoundContext<'_>, data: &str) -> Result<Record> {
        let (tip, mut proposal) = self.pre_prepare(ctx, data)?;
        self.prepare(ctx, &tip, &mut proposal)?;
        self.commit(ctx, proposal)
    }
}

impl Network<Pbft> {
    /// PBFT network of `size` participants; `node-0` is the primary.
    pub fn pbft(size: usize) -> Result<Self> {
        NetworkBuilder::new().with_size(size).build(Pbft::new())
    }

    pub fn run_pbft(&mut self, data: &str) -> Result<Record> {
        self.submit(data)
    }

    pub fn primary(&self) -> Option<&Participant> {
        self.participants.first()
    }
}
