//! In-memory implementation of `AuditWriter`.
//!
//! Keeps every event in a `Vec` behind a `Mutex`. Useful for embedding the
//! gate in a longer-lived host and for tests.

use std::sync::Mutex;

use coma_contracts::{
    audit::DecisionRecord,
    error::{GateError, GateResult},
};
use coma_core::traits::AuditWriter;

use crate::{chain::verify_chain, event::AuditEvent};

#[derive(Default)]
pub struct InMemoryAuditWriter {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every event written so far, in chain order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Verify that the in-memory chain has not been tampered with.
    pub fn verify_integrity(&self) -> bool {
        self.events
            .lock()
            .map(|events| verify_chain(&events))
            .unwrap_or(false)
    }
}

impl AuditWriter for InMemoryAuditWriter {
    fn write(&self, record: &DecisionRecord) -> GateResult<()> {
        let mut events = self.events.lock().map_err(|e| GateError::AuditWriteFailed {
            reason: format!("audit state lock poisoned: {}", e),
        })?;

        let (sequence, prev_hash) = match events.last() {
            Some(last) => (last.sequence + 1, last.this_hash.clone()),
            None => (0, AuditEvent::GENESIS_HASH.to_string()),
        };
        let event = AuditEvent::link(sequence, record.clone(), prev_hash)?;
        events.push(event);
        Ok(())
    }
}
