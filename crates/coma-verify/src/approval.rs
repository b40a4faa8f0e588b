//! Approval checks: unanimity, verdict count, and per-verdict decisions.

use tracing::warn;

use coma_contracts::{
    bundle::{Bundle, Verdict},
    error::{GateError, GateResult},
};

/// Verify that the bundle records a unanimous approval.
///
/// Checks run in order and stop at the first failure:
///
/// 1. `unanimous` must be exactly `true`.
/// 2. There must be as many verdicts as files.
/// 3. Each verdict, in order, must be `approve` and then carry a non-empty
///    `file_path`.
/// 4. With `strict_paths`, the verdict paths must cover the file list exactly
///    once each. Without it only the count is compared.
pub fn verify_approvals(bundle: &Bundle, strict_paths: bool) -> GateResult<()> {
    if !bundle.unanimous {
        return Err(GateError::NotUnanimous);
    }

    if bundle.verdicts.len() != bundle.files.len() {
        return Err(GateError::VerdictCountMismatch {
            verdicts: bundle.verdicts.len(),
            files: bundle.files.len(),
        });
    }

    for (index, verdict) in bundle.verdicts.iter().enumerate() {
        if !verdict.decision().is_approve() {
            let file_path = verdict.file_path().unwrap_or("<unnamed file>").to_string();
            warn!(
                proposal_id = %bundle.proposal_id,
                file_path = %file_path,
                decision = ?verdict.decision(),
                "non-approving verdict in bundle"
            );
            return Err(GateError::RejectionPresent { file_path });
        }
        if verdict.file_path().is_none() {
            return Err(GateError::VerdictMissingPath { index });
        }
    }

    if strict_paths {
        verify_path_correspondence(bundle)?;
    }

    Ok(())
}

fn verify_path_correspondence(bundle: &Bundle) -> GateResult<()> {
    let mut expected: Vec<&str> = bundle.files.iter().map(String::as_str).collect();
    expected.sort_unstable();
    let mut covered: Vec<&str> = bundle.verdicts.iter().filter_map(Verdict::file_path).collect();
    covered.sort_unstable();

    if expected == covered {
        return Ok(());
    }

    let detail = if let Some(file) = expected.iter().find(|f| !covered.contains(*f)) {
        format!("no verdict for {file}")
    } else if let Some(path) = covered.iter().find(|p| !expected.contains(*p)) {
        format!("verdict for unlisted path {path}")
    } else {
        "duplicate verdict paths".to_string()
    };

    Err(GateError::VerdictPathMismatch { detail })
}
