//! Error types for the COMA gate pipeline.
//!
//! Every stage of the gate returns `GateResult<T>`. Each variant maps to
//! exactly one denial, and its `Display` output is the reason string handed
//! back to the invoking host. The gate fails closed: there is no variant that
//! is recovered from locally.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which of the two cryptographic bindings failed to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    /// The digest over the command text with the bundle block removed.
    Diff,
    /// The digest over the bundle's own canonicalised fields.
    Bundle,
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Diff => f.write_str("diff/commands"),
            Binding::Bundle => f.write_str("bundle"),
        }
    }
}

/// The unified error type for the COMA gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// Standard input carried no non-whitespace data.
    #[error("COMA gate: no tool-call payload on stdin")]
    EmptyInput,

    /// The request was not a JSON object, or its payload had the wrong shape.
    #[error("COMA gate: invalid JSON on stdin: {reason}")]
    MalformedRequest { reason: String },

    /// No start/end marker pair was found in the command text.
    #[error("COMA gate: missing COMA bundle (### {start_marker} ... ### {end_marker})")]
    BundleMissing {
        start_marker: String,
        end_marker: String,
    },

    /// The text between the markers is not a well-typed JSON object.
    #[error("COMA gate: invalid COMA bundle JSON: {reason}")]
    BundleMalformed { reason: String },

    /// A required bundle field is absent, null, or empty.
    #[error("COMA gate: incomplete bundle fields (missing {field})")]
    BundleIncomplete { field: String },

    /// The repository head moved since the approvals were collected.
    #[error("COMA gate: HEAD mismatch (bundle {bundle} vs repo {repo})")]
    HeadMismatch { bundle: String, repo: String },

    /// The tracked file list differs from the bundle in length, order, or content.
    #[error("COMA gate: repository file set changed since approvals were collected")]
    FileSetChanged,

    /// The bundle does not carry `"unanimous": true`.
    #[error("COMA gate: bundle not marked unanimous")]
    NotUnanimous,

    #[error("COMA gate: verdicts count does not match file count ({verdicts} verdicts, {files} files)")]
    VerdictCountMismatch { verdicts: usize, files: usize },

    /// A verdict's decision is anything other than `approve`.
    #[error("COMA gate: rejection present for {file_path}")]
    RejectionPresent { file_path: String },

    #[error("COMA gate: missing file_path in a verdict (index {index})")]
    VerdictMissingPath { index: usize },

    /// Strict mode only: verdict paths do not cover the bundle's file list.
    #[error("COMA gate: verdict paths do not match bundle files ({detail})")]
    VerdictPathMismatch { detail: String },

    /// A recomputed digest differs from the one the bundle declares.
    #[error("COMA gate: {binding} digest mismatch")]
    DigestMismatch { binding: Binding },

    /// The live repository could not be queried.
    #[error("COMA gate: repository query failed: {reason}")]
    RepositoryQueryFailed { reason: String },

    /// The gate policy file is missing or invalid.
    #[error("COMA gate: configuration error: {reason}")]
    ConfigError { reason: String },

    /// The decision could not be appended to the audit trail.
    #[error("COMA gate: audit write failed: {reason}")]
    AuditWriteFailed { reason: String },
}

impl GateError {
    /// Stable snake_case identifier for logs and audit records.
    pub fn code(&self) -> &'static str {
        match self {
            GateError::EmptyInput => "empty_input",
            GateError::MalformedRequest { .. } => "malformed_request",
            GateError::BundleMissing { .. } => "bundle_missing",
            GateError::BundleMalformed { .. } => "bundle_malformed",
            GateError::BundleIncomplete { .. } => "bundle_incomplete",
            GateError::HeadMismatch { .. } => "head_mismatch",
            GateError::FileSetChanged => "file_set_changed",
            GateError::NotUnanimous => "not_unanimous",
            GateError::VerdictCountMismatch { .. } => "verdict_count_mismatch",
            GateError::RejectionPresent { .. } => "rejection_present",
            GateError::VerdictMissingPath { .. } => "verdict_missing_path",
            GateError::VerdictPathMismatch { .. } => "verdict_path_mismatch",
            GateError::DigestMismatch { .. } => "digest_mismatch",
            GateError::RepositoryQueryFailed { .. } => "repository_query_failed",
            GateError::ConfigError { .. } => "config_error",
            GateError::AuditWriteFailed { .. } => "audit_write_failed",
        }
    }
}

/// Convenience alias used throughout the COMA crates.
pub type GateResult<T> = Result<T, GateError>;
