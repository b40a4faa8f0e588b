//! Approval bundle types.
//!
//! A bundle arrives as a JSON object embedded in command text. It is parsed
//! into a `BundleDocument` (every field optional, exactly as written) and then
//! validated into a `Bundle`, whose required fields are guaranteed present.
//! Neither is mutated after parsing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The bundle exactly as it appears in the command text.
///
/// Field names follow the approval process's wire format. `diff_digest` and
/// `declared_digest` are accepted as aliases for `diff_sha256` and `digest`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleDocument {
    pub proposal_id: Option<String>,
    pub head: Option<String>,
    pub files: Option<Vec<String>>,
    pub verdicts: Option<Vec<Map<String, Value>>>,
    /// Kept as a raw value: only a literal JSON `true` counts as unanimous.
    pub unanimous: Option<Value>,
    #[serde(alias = "diff_digest")]
    pub diff_sha256: Option<String>,
    #[serde(alias = "declared_digest")]
    pub digest: Option<String>,
}

/// A bundle whose required fields have all been checked for presence.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub proposal_id: String,
    pub head: String,
    pub files: Vec<String>,
    pub verdicts: Vec<Verdict>,
    pub unanimous: bool,
    /// Hex SHA-256 of the command text with the bundle block removed.
    pub diff_digest: String,
    /// Hex SHA-256 of the canonical reduction of the fields above.
    pub declared_digest: String,
}

/// A reviewer's decision on one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
    /// Any other string the approval process wrote.
    Other(String),
    /// The `decision` key is absent or not a string.
    Missing,
}

impl ReviewDecision {
    pub const APPROVE: &'static str = "approve";
    pub const REJECT: &'static str = "reject";

    /// Interpret a raw `decision` value. Matching is case-sensitive.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some(Self::APPROVE) => ReviewDecision::Approve,
            Some(Self::REJECT) => ReviewDecision::Reject,
            Some(other) => ReviewDecision::Other(other.to_string()),
            None => ReviewDecision::Missing,
        }
    }

    pub fn is_approve(&self) -> bool {
        matches!(self, ReviewDecision::Approve)
    }
}

/// One reviewer verdict.
///
/// The raw JSON object is retained so the self-binding digest commits to the
/// verdict exactly as the approval process serialized it, including any keys
/// the gate does not interpret.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    raw: Map<String, Value>,
}

impl Verdict {
    pub fn new(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    /// The reviewed path, or `None` when absent, non-string, or empty.
    pub fn file_path(&self) -> Option<&str> {
        self.raw
            .get("file_path")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
    }

    pub fn decision(&self) -> ReviewDecision {
        ReviewDecision::from_value(self.raw.get("decision"))
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}
