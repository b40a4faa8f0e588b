//! Trait seams between the gate and the outside world.
//!
//! - `RepositoryReader`: read-only access to the live repository
//! - `AuditWriter`: optional append-only sink for decisions
//!
//! The `Gate` only ever talks to these traits, so tests drive it with mocks
//! and the binary wires in git and a JSON-lines file.

use coma_contracts::{audit::DecisionRecord, error::GateResult};

/// Read-only queries against the repository the command would run in.
///
/// The two readings are separate calls so the gate can stop at a head
/// mismatch without listing files. Implementations block until the query
/// completes. Any failure must be reported as
/// `GateError::RepositoryQueryFailed`; it is never retried.
pub trait RepositoryReader: Send + Sync {
    /// The current head commit identifier.
    fn head(&self) -> GateResult<String>;

    /// Every tracked path, sorted lexicographically by byte value.
    fn tracked_files(&self) -> GateResult<Vec<String>>;
}

/// Append-only sink for gate decisions.
///
/// A failed write is fatal for the invocation: the gate turns the decision
/// into a denial rather than let an unrecorded command through.
pub trait AuditWriter: Send + Sync {
    fn write(&self, record: &DecisionRecord) -> GateResult<()>;
}
