use serde::{Deserialize, Serialize};

use crate::{
    crypto::hash::{compute_record_hash, meets_difficulty},
    utils::{time::current_timestamp, NodeId},
};

/// Payload carried by every genesis record.
pub const GENESIS_DATA: &str = "Genesis Block";

/// Protocol-specific annotation carried by a record.
///
/// At most one annotation exists per record: Proof of Stake and Delegated
/// Proof of Stake tag the proposer, Proof of Work tags the mining nonce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RecordTag {
    #[default]
    None,
    Proposer(NodeId),
    Nonce(u64),
}

impl std::fmt::Display for RecordTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordTag::None => write!(f, "-"),
            RecordTag::Proposer(id) => write!(f, "proposer={}", id),
            RecordTag::Nonce(n) => write!(f, "nonce={}", n),
        }
    }
}

/// An immutable, hash-linked ledger entry.
///
/// The self hash is computed once at construction and is a pure function of
/// every other field. Fields are private so a record cannot be edited after
/// hashing; a deserialized record that was tampered with fails
/// [`Record::verify_hash`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    index: u64,
    timestamp: String,
    data: String,
    prev_hash: String,
    hash: String,
    #[serde(default)]
    tag: RecordTag,
}

impl Record {
    /// Builds a record stamped with the current time.
    pub fn new(index: u64, data: &str, prev_hash: &str, tag: RecordTag) -> Self {
        Self::with_timestamp(index, &current_timestamp(), data, prev_hash, tag)
    }

    /// Builds a record with an explicit timestamp.
    pub fn with_timestamp(
        index: u64,
        timestamp: &str,
        data: &str,
        prev_hash: &str,
        tag: RecordTag,
    ) -> Self {
        let mut record = Record {
            index,
            timestamp: timestamp.to_string(),
            data: data.to_string(),
            prev_hash: prev_hash.to_string(),
            hash: String::new(),
            tag,
        };
        record.hash = compute_record_hash(&record);
        record
    }

    /// Genesis record: index 0, empty previous hash.
    pub fn genesis(tag: RecordTag) -> Self {
        Self::new(0, GENESIS_DATA, "", tag)
    }

    /// Searches nonces from zero until the hash starts with `difficulty` zeros.
    ///
    /// There is no iteration bound.
    pub fn mine(index: u64, data: &str, prev_hash: &str, difficulty: usize) -> Self {
        let mut record = Self::new(index, data, prev_hash, RecordTag::Nonce(0));
        let mut nonce = 0u64;
        while !meets_difficulty(&record.hash, difficulty) {
            nonce += 1;
            record.tag = RecordTag::Nonce(nonce);
            record.hash = compute_record_hash(&record);
        }
        record
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn prev_hash(&self) -> &str {
        &self.prev_hash
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn tag(&self) -> &RecordTag {
        &self.tag
    }

    pub fn proposer(&self) -> Option<&NodeId> {
        match &self.tag {
            RecordTag::Proposer(id) => Some(id),
            _ => None,
        }
    }

    pub fn nonce(&self) -> Option<u64> {
        match self.tag {
            RecordTag::Nonce(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev_hash.is_empty()
    }

    /// Recomputes the self hash from the other fields.
    pub fn calculate_hash(&self) -> String {
        compute_record_hash(self)
    }

    /// True when the stored hash matches a fresh recomputation.
    pub fn verify_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    /// True when this record directly follows `parent`.
    pub fn extends(&self, parent: &Record) -> bool {
        self.prev_hash == parent.hash && self.index == parent.index + 1
    }

    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        meets_difficulty(&self.hash, difficulty)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Index: {}", self.index)?;
        writeln!(f, "Timestamp: {}", self.timestamp)?;
        writeln!(f, "Data: {}", self.data)?;
        writeln!(f, "Previous Hash: {}", self.prev_hash)?;
        writeln!(f, "Hash: {}", self.hash)?;
        match &self.tag {
            RecordTag::None => Ok(()),
            RecordTag::Proposer(id) => writeln!(f, "Proposer: {}", id),
            RecordTag::Nonce(n) => writeln!(f, "Nonce: {}", n),
        }
    }
}
