pub mod core;

use serde::{Deserialize, Serialize};

use concord_common::{error::{ConcordError, Result}, Record, RecordTag};

use crate::core::ledger::integrity;

/// Append-only, hash-linked sequence of records.
///
/// Index 0 always holds the genesis record. The only mutation is
/// [`Ledger::append`], which is all-or-nothing.
///
/// Serializes as a bare record list; deserializing runs the same checks as
/// [`Ledger::from_records`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Record>", into = "Vec<Record>")]
pub struct Ledger {
    records: Vec<Record>,
}

impl Ledger {
    /// Creates a ledger holding an untagged genesis record.
    pub fn new() -> Self {
        Self {
            records: vec![Record::genesis(RecordTag::None)],
        }
    }

    /// Creates a ledger from a caller-built genesis record.
    pub fn from_genesis(genesis: Record) -> Result<Self> {
        integrity::check_genesis(&genesis)?;
        tracing::debug!("🌱 Genesis record {} installed", genesis.hash());
        Ok(Self {
            records: vec![genesis],
        })
    }

    /// Rebuilds a ledger from a serialized record list, rejecting any broken link.
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let ledger = Self { records };
        ledger.validate()?;
        Ok(ledger)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<Record> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: u64) -> Option<&Record> {
        usize::try_from(index).ok().and_then(|i| self.records.get(i))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn genesis(&self) -> Option<&Record> {
        self.records.first()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<Record>> for Ledger {
    type Error = ConcordError;

    fn try_from(records: Vec<Record>) -> Result<Self> {
        Self::from_records(records)
    }
}

impl From<Ledger> for Vec<Record> {
    fn from(ledger: Ledger) -> Self {
        ledger.records
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
