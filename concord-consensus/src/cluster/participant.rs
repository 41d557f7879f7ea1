use serde::{Deserialize, Serialize};
use tracing::debug;

use concord_common::{env::proposal::Proposal, utils::NodeId, Record};

use crate::{consensus::ProposalPool, env::ConsensusMode};

/// Protocol role tag carried by a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Miner,
    Validator,
    Delegate,
    Primary,
    Replica,
    Follower,
    Candidate,
    Leader,
    Proposer,
    Acceptor,
}

/// A Raft leadership request as seen by a voter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRequest {
    pub candidate: NodeId,
    pub term: u64,
    pub last_log_index: u64,
}

/// An actor in a consensus network.
///
/// Holds the role-specific state each protocol needs and exposes the
/// callbacks strategies poll during a round. Participants are created with
/// the network and live as long as it does.
#[derive(Debug, Clone)]
pub struct Participant {
    id: NodeId,
    role: Role,
    // Raft
    term: u64,
    voted_for: Option<NodeId>,
    // Paxos
    promised: u64,
    accepted: Option<Proposal>,
    proposals: ProposalPool,
    last_applied: u64,
}

impl Participant {
    pub fn new(id: NodeId, role: Role) -> Self {
        Self {
            id,
            role,
            term: 0,
            voted_for: None,
            promised: 0,
            accepted: None,
            proposals: ProposalPool::new(),
            last_applied: 0,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn term(&self) -> u64 {
        self.term
    }

    pub fn voted_for(&self) -> Option<&NodeId> {
        self.voted_for.as_ref()
    }

    pub fn promised(&self) -> u64 {
        self.promised
    }

    pub fn accepted(&self) -> Option<&Proposal> {
        self.accepted.as_ref()
    }

    pub fn proposals(&self) -> &ProposalPool {
        &self.proposals
    }

    /// Index of the last record this participant committed.
    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }

    pub(crate) fn set_role(&mut self, role: Role) {
        if self.role != role {
            debug!("🔁 {} {:?} -> {:?}", self.id, self.role, role);
            self.role = role;
        }
    }

    /// PBFT Prepare / Raft AppendEntries check: the candidate must extend the
    /// participant's tip and its self hash must recompute.
    pub fn verify_record(&self, tip: &Record, candidate: &Record) -> bool {
        candidate.prev_hash() == tip.hash() && candidate.verify_hash()
    }

    /// Starts a Raft candidacy: bumps the term (strict mode) and votes for
    /// itself.
    pub(crate) fn begin_candidacy(&mut self, mode: ConsensusMode) -> VoteRequest {
        if mode == ConsensusMode::Strict {
            self.term += 1;
        }
        self.voted_for = Some(self.id.clone());
        self.set_role(Role::Candidate);
        VoteRequest {
            candidate: self.id.clone(),
            term: self.term,
            last_log_index: self.last_applied,
        }
    }

    /// Raft vote callback.
    ///
    /// Simplified mode approves unconditionally. Strict mode rejects stale
    /// terms, grants at most one vote per term and requires the candidate's
    /// log to be at least as long as this participant's.
    pub fn vote_for(&mut self, request: &VoteRequest, mode: ConsensusMode) -> bool {
        if mode == ConsensusMode::Simplified {
            return true;
        }

        if request.term < self.term {
            return false;
        }
        if request.term > self.term {
            self.term = request.term;
            self.voted_for = None;
            if matches!(self.role, Role::Leader | Role::Candidate) {
                self.set_role(Role::Follower);
            }
        }

        let free = match &self.voted_for {
            None => true,
            Some(v) => *v == request.candidate,
        };
        let up_to_date = request.last_log_index >= self.last_applied;

        if free && up_to_date {
            self.voted_for = Some(request.candidate.clone());
            true
        } else {
            false
        }
    }

    /// Raft AppendEntries term check. Strict mode refuses leaders from an
    /// older term and adopts newer ones.
    pub fn accepts_leader(&mut self, leader_term: u64, mode: ConsensusMode) -> bool {
        if mode == ConsensusMode::Simplified {
            return true;
        }
        if leader_term < self.term {
            return false;
        }
        self.term = leader_term;
        true
    }

    /// Stores a proposal this participant has authored or been told about.
    pub fn record_proposal(&mut self, proposal: Proposal) {
        self.proposals.add(proposal);
    }

    /// Simplified Paxos acceptance: only a proposal number already known to
    /// this participant is accepted.
    pub fn accept_proposal(&mut self, proposal: &Proposal) -> bool {
        match self.proposals.find_by_number_mut(proposal.number) {
            Some(known) => {
                known.accepted = true;
                true
            }
            None => false,
        }
    }

    /// Strict Paxos Prepare. Promises to ignore ballots below `number` and
    /// returns the highest proposal accepted so far, or `None` when the
    /// ballot is not above an earlier promise.
    pub fn promise(&mut self, number: u64) -> Option<Option<Proposal>> {
        if number > self.promised {
            self.promised = number;
            Some(self.accepted.clone())
        } else {
            None
        }
    }

    /// Strict Paxos Accept. Accepts unless a higher ballot was promised.
    pub fn accept_ballot(&mut self, proposal: &Proposal) -> bool {
        if proposal.number < self.promised {
            return false;
        }
        self.promised = proposal.number;
        let mut accepted = proposal.clone();
        accepted.accepted = true;
        self.accepted = Some(accepted);
        true
    }

    /// Commit callback: the participant learns that `record` is final.
    pub fn apply(&mut self, record: &Record) {
        self.last_applied = record.index();
        self.accepted = None;
    }

    /// Drops proposals superseded by a committed proposal number.
    pub fn discard_proposals_up_to(&mut self, number: u64) {
        self.proposals.discard_up_to(number);
        debug!("🧹 {} discarded proposals up to {} ({} pending)", self.id, number, self.proposals.len());
    }
}
