//! The per-invocation record written to the audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable record of one gate decision.
///
/// Every invocation, allowed or denied, produces exactly one record when an
/// audit writer is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// The invocation's UUID as a string.
    pub invocation_id: String,
    /// The lowercased action kind, absent when the request could not be read.
    pub action_kind: Option<String>,
    /// The bundle's proposal, absent when no bundle was parsed.
    pub proposal_id: Option<String>,
    pub allowed: bool,
    pub reason: Option<String>,
    /// `GateError::code()` of the denial.
    pub code: Option<String>,
    /// Wall-clock time the record was created (UTC).
    pub timestamp: DateTime<Utc>,
}
