//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. JSON of the decision record (serde_json, no pretty-printing)

use sha2::{Digest, Sha256};

use coma_contracts::{
    audit::DecisionRecord,
    error::{GateError, GateResult},
};

use crate::event::AuditEvent;

/// Compute the SHA-256 hash for one audit event, as lowercase hex.
///
/// Commits to the event's position in the chain, its link to the previous
/// event, and the full decision record.
pub fn hash_event(sequence: u64, record: &DecisionRecord, prev_hash: &str) -> GateResult<String> {
    let record_json = serde_json::to_vec(record).map_err(|e| GateError::AuditWriteFailed {
        reason: format!("decision record is not serializable: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&record_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of a hash chain.
///
/// Returns `true` when every event's `prev_hash` links to the preceding
/// event (or `GENESIS_HASH` for the first), every `sequence` equals its
/// position, and every `this_hash` matches the value recomputed from the
/// event's own fields. An empty chain is valid.
pub fn verify_chain(events: &[AuditEvent]) -> bool {
    let mut expected_prev = AuditEvent::GENESIS_HASH.to_string();

    for (position, event) in events.iter().enumerate() {
        if event.sequence != position as u64 || event.prev_hash != expected_prev {
            return false;
        }

        match hash_event(event.sequence, &event.record, &event.prev_hash) {
            Ok(recomputed) if recomputed == event.this_hash => {}
            _ => return false,
        }

        expected_prev = event.this_hash.clone();
    }

    true
}
