use std::collections::HashSet;

use rand::{rngs::StdRng, SeedableRng};
use tracing::info;

use concord_common::{
    error::{ConcordError, Result},
    NodeId,
};
use concord_ledger::Ledger;

use crate::{
    cluster::{core::Network, participant::Participant},
    strategy::ConsensusStrategy,
};

/// Assembles a [`Network`] from a participant list, an optional seed and a
/// strategy.
#[derive(Debug, Clone, Default)]
pub struct NetworkBuilder {
    participants: Vec<NodeId>,
    seed: Option<u64>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self {
            participants: Vec::new(),
            seed: None,
        }
    }

    /// Participants in their fixed enumeration order.
    pub fn with_participants<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        self.participants = ids.into_iter().map(Into::into).collect();
        self
    }

    /// `size` participants named `node-0`, `node-1`, ...
    pub fn with_size(mut self, size: usize) -> Self {
        self.participants = (0..size).map(NodeId::numbered).collect();
        self
    }

    /// Seeds every random draw of the network for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build<S: ConsensusStrategy>(self, mut strategy: S) -> Result<Network<S>> {
        if self.participants.is_empty() && strategy.requires_participants() {
            return Err(ConcordError::NoParticipants);
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.participants.iter().find(|id| !seen.insert(*id)) {
            return Err(ConcordError::Config(format!("duplicate participant id {}", dup)));
        }

        let participants: Vec<Participant> = self
            .participants
            .into_iter()
            .enumerate()
            .map(|(position, id)| {
                let role = strategy.initial_role(position);
                Participant::new(id, role)
            })
            .collect();

        let genesis = strategy.bootstrap(&participants)?;
        let ledger = Ledger::from_genesis(genesis)?;

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            "🚀 {} network ready with {} participants (genesis {})",
            strategy.kind(),
            participants.len(),
            ledger.genesis().map(|g| g.hash()).unwrap_or_default()
        );

        Ok(Network {
            ledger,
            participants,
            strategy,
            rng,
        })
    }
}
