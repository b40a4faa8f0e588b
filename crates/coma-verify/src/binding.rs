//! The two cryptographic bindings a bundle must satisfy.
//!
//! - **Diff binding**: SHA-256 of the command body equals `diff_digest`, tying
//!   the bundle to the exact command text it was approved against.
//! - **Self-binding**: SHA-256 of the canonical reduction of the bundle's own
//!   fields equals `declared_digest`, so no field can be edited after the
//!   approval process sealed it.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use coma_contracts::{
    bundle::Bundle,
    error::{Binding, GateError, GateResult},
};

use crate::canonical::canonical_json;

/// SHA-256 of the UTF-8 bytes of `text`, as lowercase hex.
pub fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// The value the self-binding digest commits to.
///
/// Exactly `{proposal_id, head, files, verdicts, diff_sha256}`; the declared
/// digest itself is excluded. The diff digest is always keyed `diff_sha256`,
/// whichever alias the bundle used.
pub fn canonical_reduction(bundle: &Bundle) -> Value {
    let verdicts: Vec<Value> = bundle
        .verdicts
        .iter()
        .map(|v| Value::Object(v.raw().clone()))
        .collect();

    json!({
        "proposal_id": bundle.proposal_id,
        "head": bundle.head,
        "files": bundle.files,
        "verdicts": verdicts,
        "diff_sha256": bundle.diff_digest,
    })
}

/// The digest a correctly sealed bundle declares for itself.
pub fn bundle_digest(bundle: &Bundle) -> String {
    sha256_hex(&canonical_json(&canonical_reduction(bundle)))
}

/// Check the diff binding, then the self-binding.
pub fn verify_bindings(bundle: &Bundle, command_body: &str) -> GateResult<()> {
    let diff = sha256_hex(command_body);
    if diff != bundle.diff_digest {
        warn!(
            proposal_id = %bundle.proposal_id,
            expected = %bundle.diff_digest,
            actual = %diff,
            "diff digest mismatch"
        );
        return Err(GateError::DigestMismatch {
            binding: Binding::Diff,
        });
    }

    let sealed = bundle_digest(bundle);
    if sealed != bundle.declared_digest {
        warn!(
            proposal_id = %bundle.proposal_id,
            expected = %bundle.declared_digest,
            actual = %sealed,
            "bundle self-binding digest mismatch"
        );
        return Err(GateError::DigestMismatch {
            binding: Binding::Bundle,
        });
    }

    debug!(proposal_id = %bundle.proposal_id, "both digest bindings verified");
    Ok(())
}
