//! # coma-verify
//!
//! The verification stages of the COMA gate, each a pure function over the
//! bundle and the data handed to it:
//!
//! 1. [`extract_bundle`]: locate the marker block, parse it, compute the
//!    command body
//! 2. [`validate_fields`]: required-field presence
//! 3. [`verify_head`], [`verify_file_set`]: state drift against the live
//!    repository
//! 4. [`verify_approvals`]: unanimity and per-verdict decisions
//! 5. [`verify_bindings`]: diff digest and self-binding digest
//!
//! Every stage returns `GateResult`; the first `Err` decides the denial.

pub mod approval;
pub mod binding;
pub mod canonical;
pub mod extract;
pub mod fields;
pub mod state;

pub use approval::verify_approvals;
pub use binding::{bundle_digest, canonical_reduction, sha256_hex, verify_bindings};
pub use canonical::canonical_json;
pub use extract::{extract_bundle, Extraction};
pub use fields::validate_fields;
pub use state::{verify_file_set, verify_head};
