//! Cross-checks of bundle claims against the live repository.
//!
//! These functions are pure comparisons. Querying the repository is the
//! caller's job, so head drift is reported before the file list is ever read.

use tracing::debug;

use coma_contracts::{
    bundle::Bundle,
    error::{GateError, GateResult},
};

/// Fail with `HeadMismatch` unless the bundle was approved against `live_head`.
pub fn verify_head(bundle: &Bundle, live_head: &str) -> GateResult<()> {
    if bundle.head != live_head {
        return Err(GateError::HeadMismatch {
            bundle: bundle.head.clone(),
            repo: live_head.to_string(),
        });
    }
    Ok(())
}

/// Fail with `FileSetChanged` unless `live_files` equals the bundle's file
/// list element for element. Ordering matters: a permutation is a change.
pub fn verify_file_set(bundle: &Bundle, live_files: &[String]) -> GateResult<()> {
    if bundle.files.as_slice() == live_files {
        return Ok(());
    }

    let first_divergence = bundle
        .files
        .iter()
        .zip(live_files)
        .position(|(claimed, live)| claimed != live);
    debug!(
        bundle_files = bundle.files.len(),
        live_files = live_files.len(),
        first_divergence = ?first_divergence,
        "tracked file list differs from bundle"
    );

    Err(GateError::FileSetChanged)
}
