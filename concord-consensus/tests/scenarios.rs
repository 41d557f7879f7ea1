use std::collections::HashMap;

use concord_common::{ConcordError, NodeId};
use concord_consensus::{
    ConsensusStrategy, DelegatedProofOfStake, Network, NetworkBuilder, Paxos, Pbft, PowConfig,
    ProofOfStake, ProofOfWork, Raft, StrategyKind,
};
use proptest::prelude::*;

fn ids(names: &[&str]) -> Vec<NodeId> {
    names.iter().map(|n| NodeId::from(*n)).collect()
}

// Chain integrity must hold after every commit, whatever the protocol.
fn assert_chain<S: ConsensusStrategy>(net: &Network<S>) {
    let records = net.records();
    assert!(records[0].is_genesis());
    for pair in records.windows(2) {
        assert_eq!(pair[1].prev_hash(), pair[0].hash());
        assert_eq!(pair[1].index(), pair[0].index() + 1);
    }
    assert!(records.iter().all(|r| r.verify_hash()));
    assert!(net.ledger().verify().all(|ok| ok));
}

#[test]
fn test_pbft_two_rounds() {
    let mut net = Network::pbft(5).unwrap();
    net.run_pbft("tx1").unwrap();
    net.run_pbft("tx2").unwrap();

    assert_eq!(net.ledger().len(), 3);
    assert_chain(&net);
}

#[test]
fn test_raft_elect_and_lead() {
    let mut net = Network::raft(5).unwrap();
    net.request_vote(&NodeId::numbered(0)).unwrap();
    let leader = net.leader().cloned().unwrap();

    net.lead(&leader, "block1").unwrap();
    net.lead(&leader, "block2").unwrap();

    assert_eq!(net.ledger().len(), 3);
    assert_eq!(net.ledger().tip().unwrap().data(), "block2");
    assert_chain(&net);
}

#[test]
fn test_paxos_proposal_order() {
    let mut net = Network::paxos(5).unwrap();
    net.run_paxos("d1", 1).unwrap();
    net.run_paxos("d2", 2).unwrap();

    assert_eq!(net.ledger().len(), 3);
    assert_eq!(net.records()[1].data(), "d1");
    assert_eq!(net.records()[2].data(), "d2");
    assert_chain(&net);
}

#[test]
fn test_dpos_vote_overwrite() {
    let delegates = ids(&["Alice", "Bob", "Charlie"]);
    let votes: HashMap<NodeId, NodeId> = [("Voter1", "Alice"), ("Voter2", "Bob")]
        .into_iter()
        .map(|(v, d)| (NodeId::from(v), NodeId::from(d)))
        .collect();
    let mut net = Network::dpos(&delegates, &votes).unwrap();

    net.vote("Voter1", "Charlie");
    net.vote("Voter1", "Bob");
    assert_eq!(net.votes()[&NodeId::from("Voter1")], NodeId::from("Bob"));

    let counts = net.tally_votes();
    assert_eq!(counts[&NodeId::from("Bob")], 2);
    assert_eq!(net.delegates(), ids(&["Bob"]).as_slice());

    net.add_record("Block 1 Data").unwrap();
    assert_eq!(net.ledger().tip().unwrap().proposer(), Some(&NodeId::from("Bob")));
    assert_chain(&net);
}

#[test]
fn test_pow_difficulty() {
    let mut net = Network::pow_with(PowConfig { difficulty: 3 }).unwrap();
    net.add_record("First block data").unwrap();
    net.add_record("Second block data").unwrap();

    assert!(net.records().iter().all(|r| r.hash().starts_with("000")));
    assert_chain(&net);
}

#[test]
fn test_pos_frequency() {
    let stakes: HashMap<NodeId, u64> = [("A", 60), ("B", 40)]
        .into_iter()
        .map(|(id, s)| (NodeId::from(id), s))
        .collect();
    let mut net = NetworkBuilder::new()
        .with_participants(["A", "B"])
        .with_seed(2024)
        .build(ProofOfStake::new(stakes))
        .unwrap();

    let rounds = 2_000;
    for i in 0..rounds {
        net.add_record(&format!("tx{}", i)).unwrap();
    }
    let by_a = net
        .records()
        .iter()
        .skip(1)
        .filter(|r| r.proposer() == Some(&NodeId::from("A")))
        .count();
    let share = by_a as f64 / rounds as f64;
    assert!((share - 0.6).abs() < 0.05, "share was {}", share);
    assert_chain(&net);
}

#[test]
fn test_dropped_proposal_leaves_ledger_unchanged() {
    let mut net = NetworkBuilder::new()
        .with_size(4)
        .build(Pbft::new().with_faulty(3))
        .unwrap();
    let before = net.records().to_vec();

    let err = net.run_pbft("lost").unwrap_err();
    assert!(matches!(err, ConcordError::QuorumNotReached { .. }));
    assert_eq!(net.records(), before.as_slice());

    // Nothing is retried on the caller's behalf
    assert_eq!(net.ledger().len(), 1);
}

#[test]
fn test_same_seed_same_dpos_history() {
    let run = |seed: u64| {
        let mut net = NetworkBuilder::new()
            .with_participants(["a", "b", "c"])
            .with_seed(seed)
            .build(DelegatedProofOfStake::new(ids(&["a", "b", "c"]), HashMap::new()))
            .unwrap();
        net.vote("v1", "a");
        net.vote("v2", "b");
        net.vote("v3", "c");
        net.tally_votes();
        let mut proposers = Vec::new();
        for i in 0..10 {
            let record = net.add_record(&i.to_string()).unwrap();
            proposers.push(record.proposer().cloned());
        }
        (net.delegates().to_vec(), proposers)
    };
    assert_eq!(run(77), run(77));
}

#[test]
fn test_generic_submit_for_every_protocol() {
    fn submit_three<S: ConsensusStrategy>(mut net: Network<S>) -> StrategyKind {
        for i in 0..3 {
            net.submit(&format!("payload-{}", i)).unwrap();
        }
        assert_eq!(net.ledger().len(), 4);
        assert_chain(&net);
        net.strategy().kind()
    }

    let stakes: HashMap<NodeId, u64> = [(NodeId::from("A"), 1)].into_iter().collect();
    let kinds = vec![
        submit_three(NetworkBuilder::new().build(ProofOfWork::new(PowConfig { difficulty: 1 }).unwrap()).unwrap()),
        submit_three(Network::pos(&ids(&["A", "B"]), &stakes).unwrap()),
        submit_three(Network::dpos(&ids(&["A"]), &HashMap::new()).unwrap()),
        submit_three(Network::pbft(4).unwrap()),
        submit_three(NetworkBuilder::new().with_size(3).build(Raft::default()).unwrap()),
        submit_three(NetworkBuilder::new().with_size(3).build(Paxos::default()).unwrap()),
    ];
    assert_eq!(kinds, StrategyKind::ALL.to_vec());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_pbft_chain_integrity(size in 1usize..8, payloads in prop::collection::vec("[a-z0-9]{0,12}", 1..6)) {
        let mut net = Network::pbft(size).unwrap();
        for data in &payloads {
            net.run_pbft(data).unwrap();
        }
        prop_assert_eq!(net.ledger().len(), payloads.len() + 1);
        prop_assert!(net.ledger().is_valid());
    }

    #[test]
    fn prop_paxos_commits_in_order(payloads in prop::collection::vec("[a-z]{1,8}", 1..6)) {
        let mut net = Network::paxos(3).unwrap();
        for (n, data) in payloads.iter().enumerate() {
            net.run_paxos(data, n as u64 + 1).unwrap();
        }
        let committed: Vec<String> = net.records().iter().skip(1).map(|r| r.data().to_string()).collect();
        prop_assert_eq!(committed, payloads);
    }
}
