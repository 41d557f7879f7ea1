use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use concord_common::{error::Result, utils::time::current_timestamp, NodeId, Record};
use concord_consensus::{
    ConsensusStrategy, DelegatedProofOfStake, Network, NetworkBuilder, Paxos, Pbft, PowConfig,
    ProofOfStake, ProofOfWork, Raft, StrategyKind,
};

use crate::config::SimulationConfig;

/// A payload whose proposal was dropped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedPayload {
    pub data: String,
    pub reason: String,
}

/// Outcome of one simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub protocol: StrategyKind,
    pub finished_at: String,
    pub records: Vec<Record>,
    pub dropped: Vec<DroppedPayload>,
    pub chain_valid: bool,
}

impl SimulationReport {
    fn from_network<S: ConsensusStrategy>(net: &Network<S>, dropped: Vec<DroppedPayload>) -> Self {
        Self {
            protocol: net.strategy().kind(),
            finished_at: current_timestamp(),
            records: net.records().to_vec(),
            dropped,
            chain_valid: net.ledger().is_valid(),
        }
    }

    pub fn committed(&self) -> usize {
        self.records.len().saturating_sub(1)
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{}", record)?;
        }
        for dropped in &self.dropped {
            writeln!(f, "Dropped: {} ({})", dropped.data, dropped.reason)?;
        }
        write!(
            f,
            "{}: {} committed, {} dropped, chain {}",
            self.protocol,
            self.committed(),
            self.dropped.len(),
            if self.chain_valid { "valid" } else { "INVALID" }
        )
    }
}

fn builder(config: &SimulationConfig, participants: Vec<NodeId>) -> NetworkBuilder {
    let builder = NetworkBuilder::new().with_participants(participants);
    match config.seed {
        Some(seed) => builder.with_seed(seed),
        None => builder,
    }
}

/// Feeds every payload through `step`, collecting drops instead of stopping.
fn drive<S: ConsensusStrategy>(
    net: &mut Network<S>,
    payloads: &[String],
    mut step: impl FnMut(&mut Network<S>, usize, &str) -> Result<Record>,
) -> Vec<DroppedPayload> {
    let mut dropped = Vec::new();
    for (i, data) in payloads.iter().enumerate() {
        if let Err(e) = step(net, i, data) {
            warn!("⚠️ Payload '{}' not committed: {}", data, e);
            dropped.push(DroppedPayload {
                data: data.clone(),
                reason: e.to_string(),
            });
        }
    }
    dropped
}

/// Builds the configured network and submits every payload in order.
pub fn run(config: &SimulationConfig) -> Result<SimulationReport> {
    config.validate()?;
    info!("▶️ Running {} with {} payloads", config.protocol, config.payloads.len());

    let report = match config.protocol {
        StrategyKind::ProofOfWork => {
            let strategy = ProofOfWork::new(PowConfig {
                difficulty: config.difficulty,
            })?;
            let mut net = builder(config, config.participants.clone()).build(strategy)?;
            let dropped = drive(&mut net, &config.payloads, |net, _, data| net.add_record(data));
            SimulationReport::from_network(&net, dropped)
        }
        StrategyKind::ProofOfStake => {
            let stakes = config.stakes.iter().map(|(id, s)| (id.clone(), *s)).collect();
            let mut net = builder(config, config.participants.clone()).build(ProofOfStake::new(stakes))?;
            let dropped = drive(&mut net, &config.payloads, |net, _, data| net.add_record(data));
            SimulationReport::from_network(&net, dropped)
        }
        StrategyKind::DelegatedProofOfStake => {
            let strategy = DelegatedProofOfStake::new(config.delegates.clone(), Default::default())
                .with_ordering(config.tally_ordering);
            let mut net = builder(config, config.delegates.clone()).build(strategy)?;
            for cast in &config.votes {
                net.vote(cast.voter.clone(), cast.delegate.clone());
            }
            net.tally_votes();
            let dropped = drive(&mut net, &config.payloads, |net, _, data| net.add_record(data));
            SimulationReport::from_network(&net, dropped)
        }
        StrategyKind::Pbft => {
            let strategy = Pbft::new().with_faulty(config.faulty);
            let mut net = builder(config, config.participant_ids()).build(strategy)?;
            let dropped = drive(&mut net, &config.payloads, |net, _, data| net.run_pbft(data));
            SimulationReport::from_network(&net, dropped)
        }
        StrategyKind::Raft => {
            let ids = config.participant_ids();
            let mut net = builder(config, ids.clone()).build(Raft::new(config.mode))?;
            if let Some(candidate) = ids.first() {
                net.request_vote(candidate)?;
            }
            let dropped = drive(&mut net, &config.payloads, |net, _, data| {
                match net.leader().cloned() {
                    Some(leader) => net.lead(&leader, data),
                    None => net.submit(data),
                }
            });
            SimulationReport::from_network(&net, dropped)
        }
        StrategyKind::Paxos => {
            let mut net = builder(config, config.participant_ids()).build(Paxos::new(config.mode))?;
            let dropped = drive(&mut net, &config.payloads, |net, i, data| {
                net.run_paxos(data, i as u64 + 1)
            });
            SimulationReport::from_network(&net, dropped)
        }
    };

    info!("🏁 {}: {} committed, {} dropped", report.protocol, report.committed(), report.dropped.len());
    Ok(report)
}
