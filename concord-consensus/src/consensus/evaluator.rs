use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use concord_common::{
    env::consensus::types::{ConsensusPhase, ConsensusResult},
    error::{ConcordError, Result},
    utils::NodeId,
};

use super::registry::VoteRegistry;

/// Threshold a count of affirmative responses must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdPolicy {
    /// `approvals > total / 2` with floor division. A tie fails.
    MajorityOverHalf,
    /// `approvals >= floor(2 * total / 3)`.
    TwoThirdsOrMore,
}

impl ThresholdPolicy {
    /// Smallest approval count that passes for an electorate of `total`.
    pub fn required(&self, total: usize) -> usize {
        match self {
            ThresholdPolicy::MajorityOverHalf => total / 2 + 1,
            ThresholdPolicy::TwoThirdsOrMore => 2 * total / 3,
        }
    }
}

impl fmt::Display for ThresholdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdPolicy::MajorityOverHalf => write!(f, "MajorityOverHalf"),
            ThresholdPolicy::TwoThirdsOrMore => write!(f, "TwoThirdsOrMore"),
        }
    }
}

/// Pure quorum check. No side effects, no retries.
pub fn quorum_reached(approvals: usize, total: usize, policy: ThresholdPolicy) -> bool {
    match policy {
        ThresholdPolicy::MajorityOverHalf => approvals > total / 2,
        ThresholdPolicy::TwoThirdsOrMore => approvals >= 2 * total / 3,
    }
}

/// Stake-weighted pick: walks `entries` in order, accumulating weight until
/// the running sum exceeds `draw`.
///
/// `draw` must be in `[0, total_weight)`; anything else yields `None`.
pub fn weighted_pick(entries: &[(NodeId, u64)], draw: u64) -> Option<&NodeId> {
    let mut running_total = 0u64;
    for (id, weight) in entries {
        running_total = running_total.saturating_add(*weight);
        if running_total > draw {
            return Some(id);
        }
    }
    None
}

/// Evaluates collected votes against a threshold policy.
#[derive(Debug, Clone)]
pub struct ConsensusEvaluator {
    pub policy: ThresholdPolicy,
}

impl ConsensusEvaluator {
    pub fn new(policy: ThresholdPolicy) -> Self {
        Self { policy }
    }

    /// Evaluates one proposal in one phase over an electorate of `total`.
    pub fn evaluate(
        &self,
        registry: &VoteRegistry,
        proposal_id: &str,
        phase: ConsensusPhase,
        total: usize,
    ) -> ConsensusResult {
        let yes_votes = registry.count_yes(proposal_id, &phase);
        let approved = quorum_reached(yes_votes, total, self.policy);

        debug!(
            "🗳️ Proposal [{}] phase {:?}: {}/{} yes votes (need {}): {}",
            proposal_id,
            phase,
            yes_votes,
            total,
            self.policy.required(total),
            if approved { "✅ APPROVED" } else { "❌ REJECTED" }
        );

        ConsensusResult {
            approved,
            votes_received: yes_votes,
            total,
            proposal_id: proposal_id.to_string(),
            phase,
        }
    }

    /// Like [`evaluate`](Self::evaluate) but maps a failed quorum to
    /// [`ConcordError::QuorumNotReached`].
    pub fn require(
        &self,
        registry: &VoteRegistry,
        proposal_id: &str,
        phase: ConsensusPhase,
        total: usize,
    ) -> Result<ConsensusResult> {
        let result = self.evaluate(registry, proposal_id, phase, total);
        if result.approved {
            Ok(result)
        } else {
            Err(ConcordError::QuorumNotReached {
                approvals: result.votes_received,
                total,
                policy: self.policy.to_string(),
            })
        }
    }
}
