//! Pluggable consensus strategies.
//!
//! Each protocol is one type implementing [`ConsensusStrategy`]. A strategy
//! never owns the ledger or the participants: the [`Network`](crate::Network)
//! lends them through a [`RoundContext`] for the duration of a single
//! synchronous round, so the ledger keeps exactly one writer.

use rand::rngs::StdRng;

use concord_common::{error::Result, NodeId, Record};
use concord_ledger::Ledger;

use crate::{cluster::participant::{Participant, Role}, env::StrategyKind};

pub mod dpos;
pub mod paxos;
pub mod pbft;
pub mod pos;
pub mod pow;
pub mod raft;

pub use dpos::DelegatedProofOfStake;
pub use paxos::Paxos;
pub use pbft::Pbft;
pub use pos::{ProofOfStake, StakeTable};
pub use pow::ProofOfWork;
pub use raft::Raft;

/// Mutable state a strategy may touch during one round.
pub struct RoundContext<'a> {
    pub ledger: &'a mut Ledger,
    pub participants: &'a mut [Participant],
    pub rng: &'a mut StdRng,
}

impl RoundContext<'_> {
    /// Electorate size used as the quorum denominator.
    pub fn total(&self) -> usize {
        self.participants.len()
    }

    pub fn position_of(&self, id: &NodeId) -> Option<usize> {
        self.participants.iter().position(|p| p.id() == id)
    }

    /// Tells every participant that `record` is final.
    pub fn apply_to_all(&mut self, record: &Record) {
        for participant in self.participants.iter_mut() {
            participant.apply(record);
        }
    }
}

/// The capability set shared by all six protocols.
pub trait ConsensusStrategy {
    fn kind(&self) -> StrategyKind;

    /// Whether the network must have at least one participant.
    fn requires_participants(&self) -> bool {
        true
    }

    /// Role given to the participant at `position` when the network is built.
    fn initial_role(&self, position: usize) -> Role;

    /// Initializes strategy tables from the participant set and returns the
    /// genesis record.
    fn bootstrap(&mut self, participants: &[Participant]) -> Result<Record>;

    /// Runs one full round for `data`: select or propose, collect votes,
    /// and append on success. On any error the ledger is unchanged.
    fn propose_and_commit(&mut self, ctx: &mut RoundContext<'_>, data: &str) -> Result<Record>;
}
