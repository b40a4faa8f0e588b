//! Required-field validation: `BundleDocument` → `Bundle`.

use coma_contracts::{
    bundle::{Bundle, BundleDocument, Verdict},
    error::{GateError, GateResult},
};
use serde_json::Value;

/// Check that every required field is present and non-empty, and produce the
/// validated `Bundle`.
///
/// Fields are checked in the order proposal_id, head, files, verdicts,
/// diff digest, declared digest; the first missing one is reported.
/// `unanimous` is not required here: its absence is an approval failure.
pub fn validate_fields(document: &BundleDocument) -> GateResult<Bundle> {
    let proposal_id = required_str(&document.proposal_id, "proposal_id")?;
    let head = required_str(&document.head, "head")?;
    let files = required_list(&document.files, "files")?.clone();
    let verdicts = required_list(&document.verdicts, "verdicts")?
        .iter()
        .cloned()
        .map(Verdict::new)
        .collect();
    let diff_digest = required_str(&document.diff_sha256, "diff_sha256")?;
    let declared_digest = required_str(&document.digest, "digest")?;

    Ok(Bundle {
        proposal_id,
        head,
        files,
        verdicts,
        unanimous: matches!(document.unanimous, Some(Value::Bool(true))),
        diff_digest,
        declared_digest,
    })
}

fn required_str(value: &Option<String>, field: &str) -> GateResult<String> {
    match value {
        Some(s) if !s.is_empty() => Ok(s.clone()),
        _ => Err(incomplete(field)),
    }
}

fn required_list<'a, T>(value: &'a Option<Vec<T>>, field: &str) -> GateResult<&'a Vec<T>> {
    match value {
        Some(list) if !list.is_empty() => Ok(list),
        _ => Err(incomplete(field)),
    }
}

fn incomplete(field: &str) -> GateError {
    GateError::BundleIncomplete {
        field: field.to_string(),
    }
}
