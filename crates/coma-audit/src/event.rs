//! Audit event type.

use serde::{Deserialize, Serialize};

use coma_contracts::{audit::DecisionRecord, error::GateResult};

use crate::chain::hash_event;

/// A single entry in the decision hash chain.
///
/// Modifying any field, including those of the embedded `record`, invalidates
/// `this_hash` and every later `prev_hash`, which `verify_chain` detects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    pub record: DecisionRecord,

    /// `this_hash` of the previous event, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    pub this_hash: String,
}

impl AuditEvent {
    /// The `prev_hash` of the first event in every chain: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";

    /// Build the event that follows `prev_hash` at `sequence`.
    pub fn link(sequence: u64, record: DecisionRecord, prev_hash: String) -> GateResult<Self> {
        let this_hash = hash_event(sequence, &record, &prev_hash)?;
        Ok(Self {
            sequence,
            record,
            prev_hash,
            this_hash,
        })
    }
}
