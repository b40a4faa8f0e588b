//! Loading and validating a `GatePolicy` from TOML.
//!
//! Every key is optional; missing keys keep the built-in contract. Unknown
//! keys are rejected so a misspelt option cannot silently fall back to a
//! default.
//!
//! ```toml
//! gated_actions = ["bash"]
//! start_marker = "COMA_BUNDLE_START"
//! end_marker = "COMA_BUNDLE_END"
//! strict_path_correspondence = true
//!
//! [repository]
//! git = "/usr/bin/git"
//! workdir = "/srv/checkout"
//!
//! [audit]
//! path = "/var/log/coma-gate.jsonl"
//! ```

use std::path::Path;

use tracing::debug;

use coma_contracts::{
    error::{GateError, GateResult},
    policy::GatePolicy,
};

/// Parse `s` as TOML and validate the resulting policy.
///
/// Returns `GateError::ConfigError` if the TOML is malformed, does not match
/// the `GatePolicy` schema, or fails validation.
pub fn from_toml_str(s: &str) -> GateResult<GatePolicy> {
    let policy: GatePolicy = toml::from_str(s).map_err(|e| GateError::ConfigError {
        reason: format!("failed to parse gate policy TOML: {}", e),
    })?;
    validate(&policy)?;

    debug!(
        gated_actions = ?policy.gated_actions,
        strict_path_correspondence = policy.strict_path_correspondence,
        "gate policy loaded"
    );
    Ok(policy)
}

/// Read the file at `path` and parse it as a gate policy.
pub fn from_file(path: &Path) -> GateResult<GatePolicy> {
    let contents = std::fs::read_to_string(path).map_err(|e| GateError::ConfigError {
        reason: format!("failed to read policy file '{}': {}", path.display(), e),
    })?;
    from_toml_str(&contents)
}

fn validate(policy: &GatePolicy) -> GateResult<()> {
    let invalid = |reason: &str| GateError::ConfigError {
        reason: reason.to_string(),
    };

    for marker in [&policy.start_marker, &policy.end_marker] {
        if marker.trim().is_empty() || marker.chars().any(char::is_whitespace) {
            return Err(invalid("bundle markers must be non-empty single tokens"));
        }
    }
    if policy.start_marker.eq_ignore_ascii_case(&policy.end_marker) {
        return Err(invalid("start_marker and end_marker must differ"));
    }
    if policy.gated_actions.iter().any(|a| a.trim().is_empty()) {
        return Err(invalid("gated_actions must not contain empty entries"));
    }
    if policy.repository.git.trim().is_empty() {
        return Err(invalid("repository.git must name an executable"));
    }
    Ok(())
}
