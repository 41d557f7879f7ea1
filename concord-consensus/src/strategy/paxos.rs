//! Single-decree Paxos per record with a fixed proposer.
//!
//! [`ConsensusMode::Simplified`] collapses Prepare/Promise into a
//! proposal-number match: the proposal is announced, and a participant
//! accepts a number it already knows. [`ConsensusMode::Strict`] runs a real
//! Prepare/Promise round with ballot monotonicity and adopts the highest
//! previously accepted value.

use tracing::{debug, info};

use concord_common::{
    env::{
        consensus::types::{ConsensusPhase, Vote},
        proposal::Proposal,
    },
    error::{ConcordError, Result},
    Record, RecordTag,
};

use super::{ConsensusStrategy, RoundContext};
use crate::{
    cluster::{builder::NetworkBuilder, core::Network, participant::{Participant, Role}},
    consensus::{ConsensusEvaluator, ThresholdPolicy, VoteRegistry},
    env::{ConsensusMode, StrategyKind},
};

#[derive(Debug, Clone)]
pub struct Paxos {
    mode: ConsensusMode,
    highest_used: u64,
    registry: VoteRegistry,
    evaluator: ConsensusEvaluator,
}

impl Default for Paxos {
    fn default() -> Self {
        Self::new(ConsensusMode::default())
    }
}

impl Paxos {
    pub fn new(mode: ConsensusMode) -> Self {
        Self {
            mode,
            highest_used: 0,
            registry: VoteRegistry::new(),
            evaluator: ConsensusEvaluator::new(ThresholdPolicy::MajorityOverHalf),
        }
    }

    pub fn mode(&self) -> ConsensusMode {
        self.mode
    }

    /// Highest proposal number the proposer has issued.
    pub fn highest_used(&self) -> u64 {
        self.highest_used
    }

    /// The first participant records a proposal under the caller's number.
    /// In simplified mode the proposal is also announced to every acceptor,
    /// which stands in for Prepare/Promise.
    pub fn propose(&mut self, ctx: &mut RoundContext<'_>, data: &str, number: u64) -> Result<Proposal> {
        let proposer = ctx.participants.first().ok_or(ConcordError::NoParticipants)?;
        let proposal = Proposal::new(number, proposer.id().clone(), data);
        let recipients = match self.mode {
            ConsensusMode::Simplified => ctx.participants.len(),
            ConsensusMode::Strict => 1,
        };
        for participant in ctx.participants.iter_mut().take(recipients) {
            participant.record_proposal(proposal.clone());
        }
        self.highest_used = self.highest_used.max(number);

        info!("📝 {} proposes #{}: {}", proposal.proposer, number, data);
        tracing::info!(target: "consensus", "EVENT:PROPOSE protocol=paxos proposer={} number={}", proposal.proposer, number);
        Ok(proposal)
    }

    /// Collects acceptances for `proposal` and returns the value to commit.
    pub fn broadcast(&mut self, ctx: &mut RoundContext<'_>, proposal: &Proposal) -> Result<Proposal> {
        let id = proposal.id();
        self.registry.register_proposal(&id);
        let outcome = match self.mode {
            ConsensusMode::Simplified => self.accept_by_number(ctx, proposal),
            ConsensusMode::Strict => self
                .prepare(ctx, proposal)
                .and_then(|value| self.accept_ballot(ctx, value)),
        };
        self.registry.forget(&id);
        outcome
    }

    /// Each participant accepts only a proposal number it was told about.
    fn accept_by_number(&mut self, ctx: &mut RoundContext<'_>, proposal: &Proposal) -> Result<Proposal> {
        let id = proposal.id();
        for participant in ctx.participants.iter_mut() {
            let vote = Vote::from_approval(participant.accept_proposal(proposal));
            self.record_vote(&id, ConsensusPhase::Accept, participant, vote);
        }
        self.evaluator
            .require(&self.registry, &id, ConsensusPhase::Accept, ctx.total())?;
        Ok(proposal.clone())
    }

    /// Prepare/Promise. Returns the proposal to put to the Accept phase,
    /// carrying the highest previously accepted value if any acceptor
    /// reported one.
    fn prepare(&mut self, ctx: &mut RoundContext<'_>, proposal: &Proposal) -> Result<Proposal> {
        let id = proposal.id();
        let mut prior: Option<Proposal> = None;

        for participant in ctx.participants.iter_mut() {
            let vote = match participant.promise(proposal.number) {
                Some(accepted) => {
                    if let Some(accepted) = accepted {
                        if prior.as_ref().map_or(true, |p| accepted.number > p.number) {
                            prior = Some(accepted);
                        }
                    }
                    Vote::Yes
                }
                None => Vote::No,
            };
            self.record_vote(&id, ConsensusPhase::Promise, participant, vote);
        }
        self.evaluator
            .require(&self.registry, &id, ConsensusPhase::Promise, ctx.total())?;

        let mut value = proposal.clone();
        if let Some(prior) = prior {
            info!("♻️ Ballot #{} adopts value from #{}: {}", proposal.number, prior.number, prior.data);
            value.data = prior.data;
        }
        Ok(value)
    }

    fn accept_ballot(&mut self, ctx: &mut RoundContext<'_>, value: Proposal) -> Result<Proposal> {
        let id = value.id();
        for participant in ctx.participants.iter_mut() {
            let vote = Vote::from_approval(participant.accept_ballot(&value));
            self.record_vote(&id, ConsensusPhase::Accept, participant, vote);
        }
        self.evaluator
            .require(&self.registry, &id, ConsensusPhase::Accept, ctx.total())?;
        Ok(value)
    }

    fn record_vote(&mut self, id: &str, phase: ConsensusPhase, participant: &Participant, vote: Vote) {
        debug!("🗳️ {} {:?} vote on [{}]: {}", participant.id(), phase, id, vote);
        tracing::info!(target: "consensus", "EVENT:VOTE protocol=paxos phase={:?} voter={} proposal={} vote={}", phase, participant.id(), id, vote);
        self.registry.register_vote(id, phase, participant.id().clone(), vote);
    }

    /// Appends a record carrying the chosen value and lets every participant
    /// learn it.
    pub fn commit(&mut self, ctx: &mut RoundContext<'_>, value: &Proposal) -> Result<Record> {
        let (index, prev_hash) = {
            let tip = ctx.ledger.tip()?;
            (tip.index() + 1, tip.hash().to_string())
        };
        let record = Record::new(index, &value.data, &prev_hash, RecordTag::None);
        let committed = ctx.ledger.append(record)?.clone();

        ctx.apply_to_all(&committed);
        for participant in ctx.participants.iter_mut() {
            participant.discard_proposals_up_to(value.number);
        }
        Ok(committed)
    }

    /// One full round under a caller-chosen proposal number.
    pub fn run(&mut self, ctx: &mut RoundContext<'_>, data: &str, number: u64) -> Result<Record> {
        let proposal = self.propose(ctx, data, number)?;
        let value = self.broadcast(ctx, &proposal)?;
        self.commit(ctx, &value)
    }
}

impl ConsensusStrategy for Paxos {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Paxos
    }

    fn initial_role(&self, position: usize) -> Role {
        if position == 0 {
            Role::Proposer
        } else {
            Role::Acceptor
        }
    }

    fn bootstrap(&mut self, _participants: &[Participant]) -> Result<Record> {
        Ok(Record::genesis(RecordTag::None))
    }

    /// Numbers the proposal one past the highest number used so far.
    fn propose_and_commit(&mut self, ctx: &mut RoundContext<'_>, data: &str) -> Result<Record> {
        let number = self.highest_used + 1;
        self.run(ctx, data, number)
    }
}

impl Network<Paxos> {
    /// Paxos network of `size` participants; `node-0` proposes.
    pub fn paxos(size: usize) -> Result<Self> {
        Self::paxos_with_mode(size, ConsensusMode::Simplified)
    }

    pub fn paxos_with_mode(size: usize, mode: ConsensusMode) -> Result<Self> {
        NetworkBuilder::new().with_size(size).build(Paxos::new(mode))
    }

    /// Uniqueness and monotonicity of `number` are the caller's concern.
    pub fn run_paxos(&mut self, data: &str, number: u64) -> Result<Record> {
        self.commit_round(|paxos, ctx| paxos.run(ctx, data, number))
    }

    pub fn proposer(&self) -> Option<&Participant> {
        self.participants.first()
    }
}
