pub mod consensus;
pub mod cluster;
pub mod env;
pub mod strategy;
pub use consensus::evaluator::{quorum_reached, ThresholdPolicy};
pub use cluster::core::Network;
pub use cluster::builder::NetworkBuilder;
pub use cluster::participant::{Participant, Role};
pub use env::{ConsensusMode, PowConfig, StrategyKind, TallyOrdering};
pub use strategy::{
    ConsensusStrategy, DelegatedProofOfStake, Paxos, Pbft, ProofOfStake, ProofOfWork, Raft, RoundContext,
};
