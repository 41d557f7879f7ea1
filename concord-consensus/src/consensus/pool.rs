use std::collections::BTreeMap;

use tracing::warn;

use concord_common::env::proposal::Proposal;

/// In-memory store of the proposals a participant knows about, keyed by
/// proposal number.
#[derive(Debug, Default, Clone)]
pub struct ProposalPool {
    proposals: BTreeMap<u64, Proposal>,
}

impl ProposalPool {
    pub fn new() -> Self {
        Self {
            proposals: BTreeMap::new(),
        }
    }

    /// Adds a proposal. A proposal already stored under the same number is
    /// replaced.
    pub fn add(&mut self, proposal: Proposal) {
        let number = proposal.number;
        if let Some(previous) = self.proposals.insert(number, proposal) {
            warn!("⚠️ Proposal number {} already in pool (was [{}])", number, previous.id());
        }
    }

    pub fn contains(&self, number: u64) -> bool {
        self.proposals.contains_key(&number)
    }

    pub fn find_by_number_mut(&mut self, number: u64) -> Option<&mut Proposal> {
        self.proposals.get_mut(&number)
    }

    /// Drops every proposal numbered at or below `number`.
    pub fn discard_up_to(&mut self, number: u64) {
        self.proposals.retain(|n, _| *n > number);
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_common::utils::NodeId;

    fn proposal(number: u64) -> Proposal {
        Proposal::new(number, NodeId::numbered(0), &format!("d{}", number))
    }

    #[test]
    fn test_add_and_find() {
        let mut pool = ProposalPool::new();
        pool.add(proposal(2));
        pool.add(proposal(1));

        assert!(pool.contains(1));
        assert_eq!(pool.find_by_number_mut(2).unwrap().data, "d2");
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_discard_up_to() {
        let mut pool = ProposalPool::new();
        for n in 1..=4 {
            pool.add(proposal(n));
        }
        pool.discard_up_to(2);

        assert!(!pool.contains(1) && !pool.contains(2));
        assert!(pool.contains(3) && pool.contains(4));
        assert_eq!(pool.len(), 2);

        pool.discard_up_to(4);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_replace_same_number() {
        let mut pool = ProposalPool::new();
        pool.add(proposal(1));
        pool.add(Proposal::new(1, NodeId::numbered(1), "other"));

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.find_by_number_mut(1).unwrap().data, "other");
    }
}
