use rand::rngs::StdRng;
use tracing::{info, warn};

use concord_common::{error::Result, NodeId, Record};
use concord_ledger::Ledger;

use crate::{
    cluster::participant::Participant,
    strategy::{ConsensusStrategy, RoundContext},
};

/// A fixed set of participants, one shared ledger and the active strategy.
///
/// This is the entry point for "submit data, get back an updated ledger".
/// Rounds run one at a time; the ledger has a single writer.
pub struct Network<S: ConsensusStrategy> {
    pub(crate) ledger: Ledger,
    pub(crate) participants: Vec<Participant>,
    pub(crate) strategy: S,
    pub(crate) rng: StdRng,
}

impl<S: ConsensusStrategy> Network<S> {
    /// Submits `data` to the active strategy and returns the committed record.
    ///
    /// A dropped proposal is reported as an error and is not retried; the
    /// caller must resubmit.
    pub fn submit(&mut self, data: &str) -> Result<Record> {
        self.commit_round(|strategy, ctx| strategy.propose_and_commit(ctx, data))
    }

    /// Runs a committing round and logs its outcome.
    pub(crate) fn commit_round(
        &mut self,
        f: impl FnOnce(&mut S, &mut RoundContext<'_>) -> Result<Record>,
    ) -> Result<Record> {
        let kind = self.strategy.kind();
        let result = self.round(f);

        match &result {
            Ok(record) => {
                info!("✅ [{}] Record {} committed ({})", kind, record.index(), record.hash());
                tracing::info!(target: "consensus", "EVENT:COMMIT protocol={} index={} hash={}", kind.short_name(), record.index(), record.hash());
            }
            Err(e) => {
                warn!("❌ [{}] Proposal dropped: {}", kind, e);
                tracing::warn!(target: "consensus", "EVENT:DROP protocol={} reason=\"{}\"", kind.short_name(), e);
            }
        }
        result
    }

    /// Lends the strategy and a round context to `f`.
    ///
    /// Used by the protocol-specific entry points that drive a round step by
    /// step instead of through [`submit`](Self::submit).
    pub fn round<R>(&mut self, f: impl FnOnce(&mut S, &mut RoundContext<'_>) -> R) -> R {
        let mut ctx = RoundContext {
            ledger: &mut self.ledger,
            participants: &mut self.participants,
            rng: &mut self.rng,
        };
        f(&mut self.strategy, &mut ctx)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn records(&self) -> &[Record] {
        self.ledger.records()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, id: &NodeId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id() == id)
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }
}

impl<S: ConsensusStrategy> std::fmt::Debug for Network<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("protocol", &self.strategy.kind())
            .field("participants", &self.participants.len())
            .field("records", &self.ledger.len())
            .finish()
    }
}
