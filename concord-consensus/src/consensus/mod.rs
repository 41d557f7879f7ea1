//! Shared voting machinery.
//!
//! Strategies that poll participants record each response in a
//! [`VoteRegistry`] and hand the registry to a [`ConsensusEvaluator`], which
//! applies the protocol's [`ThresholdPolicy`]. Everything here is synchronous:
//! a round collects every vote before it is evaluated once.

pub mod evaluator;
pub mod pool;
pub mod registry;

pub use evaluator::{quorum_reached, weighted_pick, ConsensusEvaluator, ThresholdPolicy};
pub use pool::ProposalPool;
pub use registry::VoteRegistry;
