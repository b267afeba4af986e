use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use sha2::{Digest, Sha256};

const ID_LEN: usize = 20;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub fn compute_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Fresh id for a document about to be written to `collection`.
pub fn new_document_id(collection: &str, payload: &str) -> String {
    let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let mut id = compute_hash(&format!("{collection}:{timestamp}:{sequence}:{payload}"));
    id.truncate(ID_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_hex() {
        assert_eq!(
            compute_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn document_ids_are_short_and_distinct() {
        let first = new_document_id("generated_images", "{}");
        let second = new_document_id("generated_images", "{}");
        assert_eq!(first.len(), ID_LEN);
        assert_ne!(first, second);
    }
}
