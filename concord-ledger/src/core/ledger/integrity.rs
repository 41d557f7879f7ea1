//! Chain integrity checks.
//!
//! A link between two records holds when the child's previous hash equals the
//! parent's hash, the indices are contiguous and the child's self hash
//! recomputes correctly.

use concord_common::{
    error::{ConcordError, Result},
    Record,
};

use crate::Ledger;

/// Validates a genesis candidate.
pub fn check_genesis(genesis: &Record) -> Result<()> {
    if !genesis.is_genesis() {
        return Err(ConcordError::ChainIntegrity {
            index: genesis.index(),
            reason: "genesis must have index 0 and an empty previous hash".to_string(),
        });
    }
    if !genesis.verify_hash() {
        return Err(ConcordError::ChainIntegrity {
            index: 0,
            reason: "genesis hash does not match its contents".to_string(),
        });
    }
    Ok(())
}

/// Validates that `child` may follow `parent`.
pub fn check_link(parent: &Record, child: &Record) -> Result<()> {
    if child.prev_hash() != parent.hash() {
        return Err(ConcordError::ChainIntegrity {
            index: child.index(),
            reason: format!(
                "previous hash {} does not match tip hash {}",
                child.prev_hash(),
                parent.hash()
            ),
        });
    }
    if child.index() != parent.index() + 1 {
        return Err(ConcordError::ChainIntegrity {
            index: child.index(),
            reason: format!("expected index {}", parent.index() + 1),
        });
    }
    if !child.verify_hash() {
        return Err(ConcordError::ChainIntegrity {
            index: child.index(),
            reason: "record hash does not match its contents".to_string(),
        });
    }
    Ok(())
}

impl Ledger {
    /// Lazily checks every adjacent pair of records.
    ///
    /// Yields one boolean per link, so a ledger of `n` records yields `n - 1`
    /// values. Nothing is computed until the iterator is driven.
    pub fn verify(&self) -> impl Iterator<Item = bool> + '_ {
        self.records
            .windows(2)
            .map(|pair| check_link(&pair[0], &pair[1]).is_ok())
    }

    /// True when the genesis record and every link are intact.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Returns the first integrity violation, if any.
    pub fn validate(&self) -> Result<()> {
        let genesis = self.records.first().ok_or(ConcordError::EmptyLedger)?;
        check_genesis(genesis)?;
        for pair in self.records.windows(2) {
            check_link(&pair[0], &pair[1])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_common::RecordTag;
    use proptest::prelude::*;

    fn build(payloads: &[String]) -> Ledger {
        let mut ledger = Ledger::new();
        for data in payloads {
            let tip = ledger.tip().unwrap();
            let record = Record::new(tip.index() + 1, data, tip.hash(), RecordTag::None);
            ledger.append(record).unwrap();
        }
        ledger
    }

    #[test]
    fn test_verify_yields_one_check_per_link() {
        let ledger = build(&["a".into(), "b".into(), "c".into()]);
        let checks: Vec<bool> = ledger.verify().collect();
        assert_eq!(checks, vec![true, true, true]);
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_verify_on_genesis_only() {
        let ledger = Ledger::new();
        assert_eq!(ledger.verify().count(), 0);
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_tampered_json_detected() {
        let ledger = build(&["alpha".into(), "beta".into()]);
        let json = ledger.to_json().unwrap();
        let tampered = json.replace("alpha", "omega");

        let err = Ledger::from_json(&tampered).unwrap_err();
        assert!(matches!(err, ConcordError::ChainIntegrity { index: 1, .. }));
    }

    #[test]
    fn test_json_roundtrip() {
        let ledger = build(&["alpha".into(), "beta".into()]);
        let back = Ledger::from_json(&ledger.to_json().unwrap()).unwrap();
        assert_eq!(back, ledger);
    }

    #[test]
    fn test_deserialize_validates_chain() {
        let ledger = build(&["alpha".into(), "beta".into()]);
        let json = serde_json::to_string(&ledger).unwrap();
        assert!(json.starts_with('['));
        assert_eq!(serde_json::from_str::<Ledger>(&json).unwrap(), ledger);

        let tampered = json.replace("alpha", "omega");
        assert!(serde_json::from_str::<Ledger>(&tampered).is_err());
        assert!(serde_json::from_str::<Ledger>("[]").is_err());
    }

    #[test]
    fn test_from_genesis_rejects_non_genesis() {
        let record = Record::new(1, "x", "prev", RecordTag::None);
        assert!(Ledger::from_genesis(record).is_err());
    }

    #[test]
    fn test_from_genesis_accepts_tagged_genesis() {
        let genesis = Record::genesis(RecordTag::Proposer("Alice".into()));
        let ledger = Ledger::from_genesis(genesis).unwrap();
        assert_eq!(ledger.tip().unwrap().proposer().unwrap().as_str(), "Alice");
    }

    proptest! {
        #[test]
        fn prop_every_link_holds(payloads in prop::collection::vec("[a-z0-9 ]{0,12}", 0..12)) {
            let ledger = build(&payloads);
            prop_assert_eq!(ledger.len(), payloads.len() + 1);
            for i in 1..ledger.len() as u64 {
                let prev = ledger.get(i - 1).unwrap();
                let cur = ledger.get(i).unwrap();
                prop_assert_eq!(cur.prev_hash(), prev.hash());
                prop_assert_eq!(cur.index(), i);
            }
            prop_assert!(ledger.verify().all(|ok| ok));
        }
    }
}
