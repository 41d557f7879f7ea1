use sha2::{Digest, Sha256};

use crate::env::record::{Record, RecordTag};

/// Number of hex digits in a SHA-256 hash. No difficulty above this can be met.
pub const MAX_DIFFICULTY: usize = 64;

const TAG_NONE: u8 = 0;
const TAG_PROPOSER: u8 = 1;
const TAG_NONCE: u8 = 2;

/// Feeds a variable-length field as its u64 length followed by its bytes.
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Computes the self hash of a record.
///
/// The hash covers:
/// - index
/// - timestamp
/// - data
/// - prev_hash
/// - the protocol tag (proposer identity or work nonce)
///
/// Every string field is length-prefixed and the tag carries a variant byte,
/// so bytes cannot shift between neighbouring fields or tag kinds.
/// It does NOT cover the stored hash itself.
pub fn compute_record_hash(r: &Record) -> String {
    let mut hasher = Sha256::new();

    hasher.update(r.index().to_le_bytes());
    update_field(&mut hasher, r.timestamp().as_bytes());
    update_field(&mut hasher, r.data().as_bytes());
    update_field(&mut hasher, r.prev_hash().as_bytes());
    match r.tag() {
        RecordTag::None => hasher.update([TAG_NONE]),
        RecordTag::Proposer(id) => {
            hasher.update([TAG_PROPOSER]);
            update_field(&mut hasher, id.as_str().as_bytes());
        }
        RecordTag::Nonce(nonce) => {
            hasher.update([TAG_NONCE]);
            hasher.update(nonce.to_le_bytes());
        }
    }

    hex::encode(hasher.finalize())
}

/// True when `hash` starts with `difficulty` zero hex digits.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}
