//! # coma-audit
//!
//! Append-only, SHA-256 hash-chained audit trail of gate decisions.
//!
//! ## Overview
//!
//! Every decision the gate records is wrapped in an `AuditEvent` that links
//! to the previous event via its SHA-256 hash. Tampering with any event, even
//! a single byte, breaks the chain and is detected by `verify_chain`.
//!
//! Two writers implement `AuditWriter`:
//! - [`JsonlAuditWriter`] appends one event per line to a file, recovering the
//!   chain tip from the file's last line on each write
//! - [`InMemoryAuditWriter`] keeps events in memory
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coma_audit::{JsonlAuditWriter, verify_file};
//!
//! let gate = gate.with_audit(Box::new(JsonlAuditWriter::new("/var/log/coma.jsonl")));
//! let count = verify_file(Path::new("/var/log/coma.jsonl"))?;
//! ```

pub mod chain;
pub mod event;
pub mod jsonl;
pub mod memory;

pub use chain::{hash_event, verify_chain};
pub use event::AuditEvent;
pub use jsonl::{read_events, verify_file, JsonlAuditWriter};
pub use memory::InMemoryAuditWriter;

// ── Tests ─────────────────────────────────────────────────────────────────────
