use std::collections::HashMap;

use tracing::warn;

use concord_common::{
    env::consensus::types::{ConsensusPhase, Vote},
    utils::NodeId,
};

/// Stores each participant's vote for each proposal, separated by phase.
#[derive(Debug, Default, Clone)]
pub struct VoteRegistry {
    // ProposalID -> Phase -> NodeID -> Vote
    votes: HashMap<String, HashMap<ConsensusPhase, HashMap<NodeId, Vote>>>,
}

impl VoteRegistry {
    pub fn new() -> Self {
        Self {
            votes: HashMap::new(),
        }
    }

    /// Initializes the vote map for a new proposal.
    pub fn register_proposal(&mut self, proposal_id: &str) {
        self.votes.entry(proposal_id.to_string()).or_default();
    }

    /// Records a participant's vote for a proposal in a phase.
    ///
    /// Repeating the same vote is a no-op. A conflicting second vote is
    /// ignored and `false` is returned; the first vote stands.
    pub fn register_vote(
        &mut self,
        proposal_id: &str,
        phase: ConsensusPhase,
        node: NodeId,
        vote: Vote,
    ) -> bool {
        let phase_votes = self
            .votes
            .entry(proposal_id.to_string())
            .or_default()
            .entry(phase)
            .or_default();

        if let Some(existing_vote) = phase_votes.get(&node) {
            if *existing_vote != vote {
                warn!(
                    "⚠️ Conflicting vote from {} on [{}] ({:?}): kept {}, ignored {}",
                    node, proposal_id, phase, existing_vote, vote
                );
                return false;
            }
            return true;
        }

        phase_votes.insert(node, vote);
        true
    }

    /// Number of "Yes" votes for a proposal in a phase.
    pub fn count_yes(&self, proposal_id: &str, phase: &ConsensusPhase) -> usize {
        self.votes
            .get(proposal_id)
            .and_then(|phases| phases.get(phase))
            .map(|m| m.values().filter(|v| matches!(v, Vote::Yes)).count())
            .unwrap_or(0)
    }

    /// Drops every vote held for a proposal once it is committed or discarded.
    pub fn forget(&mut self, proposal_id: &str) {
        self.votes.remove(proposal_id);
    }
}
