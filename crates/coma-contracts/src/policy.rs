//! Gate policy: the operator-tunable knobs around the verification contract.
//!
//! Every field defaults to the built-in contract, so an empty policy file (or
//! no policy file at all) gates `bash` with the `COMA_BUNDLE_START` /
//! `COMA_BUNDLE_END` markers against the git repository in the current
//! directory.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_START_MARKER: &str = "COMA_BUNDLE_START";
pub const DEFAULT_END_MARKER: &str = "COMA_BUNDLE_END";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatePolicy {
    /// Action kinds that require a bundle. Compared case-insensitively.
    /// All other action kinds pass through unconditionally.
    pub gated_actions: Vec<String>,

    /// Token following `###` on the line that opens the bundle block.
    pub start_marker: String,

    /// Token following `###` on the line that closes the bundle block.
    pub end_marker: String,

    /// When true, every bundle file must be covered by exactly one verdict
    /// naming it, in addition to the count check.
    pub strict_path_correspondence: bool,

    pub repository: RepositoryConfig,

    pub audit: AuditConfig,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            gated_actions: vec!["bash".to_string()],
            start_marker: DEFAULT_START_MARKER.to_string(),
            end_marker: DEFAULT_END_MARKER.to_string(),
            strict_path_correspondence: false,
            repository: RepositoryConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

impl GatePolicy {
    /// Return true if `action_kind` must carry an approval bundle.
    pub fn gates(&self, action_kind: &str) -> bool {
        self.gated_actions
            .iter()
            .any(|a| a.eq_ignore_ascii_case(action_kind))
    }
}

/// Where and how the live repository is queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    /// The git executable to invoke.
    pub git: String,
    /// Working tree to query. `None` means the process's current directory.
    pub workdir: Option<PathBuf>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            workdir: None,
        }
    }
}

/// Optional hash-chained audit trail of every decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// JSON-lines file to append to. Auditing is disabled when unset.
    pub path: Option<PathBuf>,
}
