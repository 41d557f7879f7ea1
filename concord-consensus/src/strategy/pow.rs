//! Proof of Work: the mined hash is the only admission control.

use tracing::info;

use concord_common::{
    crypto::hash::MAX_DIFFICULTY,
    env::record::GENESIS_DATA,
    error::{ConcordError, Result},
    Record,
};

use super::{ConsensusStrategy, RoundContext};
use crate::{
    cluster::{builder::NetworkBuilder, core::Network, participant::{Participant, Role}},
    env::{PowConfig, StrategyKind},
};

#[derive(Debug, Clone, Default)]
pub struct ProofOfWork {
    config: PowConfig,
}

impl ProofOfWork {
    /// Fails when the difficulty asks for more zero digits than a hash has,
    /// since such a target can never be mined.
    pub fn new(config: PowConfig) -> Result<Self> {
        if config.difficulty > MAX_DIFFICULTY {
            return Err(ConcordError::Config(format!(
                "difficulty {} exceeds the {} hex digits of a hash",
                config.difficulty, MAX_DIFFICULTY
            )));
        }
        Ok(Self { config })
    }

    pub fn difficulty(&self) -> usize {
        self.config.difficulty
    }
}

impl ConsensusStrategy for ProofOfWork {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ProofOfWork
    }

    fn requires_participants(&self) -> bool {
        false
    }

    fn initial_role(&self, _position: usize) -> Role {
        Role::Miner
    }

    fn bootstrap(&mut self, _participants: &[Participant]) -> Result<Record> {
        Ok(Record::mine(0, GENESIS_DATA, "", self.config.difficulty))
    }

    fn propose_and_commit(&mut self, ctx: &mut RoundContext<'_>, data: &str) -> Result<Record> {
        let (index, prev_hash) = {
            let tip = ctx.ledger.tip()?;
            (tip.index() + 1, tip.hash().to_string())
        };

        let record = Record::mine(index, data, &prev_hash, self.config.difficulty);
        info!(
            "⛏️ Mined record {} with nonce {} ({})",
            index,
            record.nonce().unwrap_or_default(),
            record.hash()
        );
        tracing::info!(target: "consensus", "EVENT:MINED index={} nonce={} difficulty={}", index, record.nonce().unwrap_or_default(), self.config.difficulty);

        let committed = ctx.ledger.append(record)?.clone();
        ctx.apply_to_all(&committed);
        Ok(committed)
    }
}

impl Network<ProofOfWork> {
    /// Proof of Work network with the default difficulty and no participants.
    pub fn pow() -> Result<Self> {
        Self::pow_with(PowConfig::default())
    }

    pub fn pow_with(config: PowConfig) -> Result<Self> {
        NetworkBuilder::new().build(ProofOfWork::new(config)?)
    }

    /// Mines `data` into a new record and appends it.
    pub fn add_record(&mut self, data: &str) -> Result<Record> {
        self.submit(data)
    }

    pub fn difficulty(&self) -> usize {
        self.strategy.difficulty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_is_mined() {
        let net = Network::pow_with(PowConfig { difficulty: 2 }).unwrap();
        let genesis = net.ledger().tip().unwrap();
        assert_eq!(genesis.index(), 0);
        assert!(genesis.meets_difficulty(2));
        assert!(genesis.nonce().is_some());
    }

    #[test]
    fn test_add_record_meets_difficulty() {
        let mut net = Network::pow_with(PowConfig { difficulty: 3 }).unwrap();
        net.add_record("Test block 1").unwrap();
        net.add_record("Test block 2").unwrap();

        assert_eq!(net.ledger().len(), 3);
        assert_eq!(net.ledger().tip().unwrap().data(), "Test block 2");
        for record in net.records() {
            assert!(record.hash().starts_with("000"));
            assert!(record.verify_hash());
        }
        assert!(net.ledger().is_valid());
    }

    #[test]
    fn test_default_difficulty_is_four() {
        let mut net = Network::pow().unwrap();
        assert_eq!(net.difficulty(), 4);
        let record = net.add_record("First block data").unwrap();
        assert!(record.hash().starts_with("0000"));
    }

    #[test]
    fn test_zero_difficulty_takes_first_nonce() {
        let mut net = Network::pow_with(PowConfig { difficulty: 0 }).unwrap();
        let record = net.add_record("cheap").unwrap();
        assert_eq!(record.nonce(), Some(0));
    }

    #[test]
    fn test_miners_follow_commits() {
        let mut net = NetworkBuilder::new()
            .with_participants(["m1", "m2"])
            .build(ProofOfWork::new(PowConfig { difficulty: 1 }).unwrap())
            .unwrap();
        net.add_record("x").unwrap();
        assert!(net.participants().iter().all(|p| p.last_applied() == 1 && p.role() == Role::Miner));
    }

    #[test]
    fn test_unreachable_difficulty_rejected() {
        let err = Network::pow_with(PowConfig { difficulty: MAX_DIFFICULTY + 1 }).unwrap_err();
        assert!(matches!(err, ConcordError::Config(_)));
        assert!(ProofOfWork::new(PowConfig { difficulty: MAX_DIFFICULTY }).is_ok());
    }
}
