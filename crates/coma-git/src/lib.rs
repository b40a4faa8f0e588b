//! # coma-git
//!
//! [`GitRepository`] answers the gate's repository queries by running the git
//! CLI:
//!
//! - head: `git rev-parse HEAD`
//! - tracked files: `git ls-files -z`, split on NUL and sorted by byte value
//!
//! Each query is a blocking child process with no timeout. A spawn failure, a
//! non-zero exit, or undecodable output is `RepositoryQueryFailed`.

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use coma_contracts::{
    error::{GateError, GateResult},
    policy::RepositoryConfig,
};
use coma_core::traits::RepositoryReader;

/// A repository reader backed by the git executable.
#[derive(Debug, Clone)]
pub struct GitRepository {
    git: String,
    workdir: Option<PathBuf>,
}

impl GitRepository {
    /// Query the repository containing `workdir`, or the current directory
    /// when `None`.
    pub fn new(git: impl Into<String>, workdir: Option<PathBuf>) -> Self {
        Self {
            git: git.into(),
            workdir,
        }
    }

    pub fn from_config(config: &RepositoryConfig) -> Self {
        Self::new(config.git.clone(), config.workdir.clone())
    }

    fn run(&self, args: &[&str]) -> GateResult<Vec<u8>> {
        let invocation = format!("{} {}", self.git, args.join(" "));

        let mut command = Command::new(&self.git);
        command.args(args);
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }

        debug!(command = %invocation, workdir = ?self.workdir, "querying repository");
        let output = command.output().map_err(|e| GateError::RepositoryQueryFailed {
            reason: format!("failed to run `{}`: {}", invocation, e),
        })?;

        if !output.status.success() {
            return Err(GateError::RepositoryQueryFailed {
                reason: format!(
                    "`{}` exited with {}: {}",
                    invocation,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(output.stdout)
    }
}

impl RepositoryReader for GitRepository {
    fn head(&self) -> GateResult<String> {
        let stdout = self.run(&["rev-parse", "HEAD"])?;
        let head = String::from_utf8(stdout).map_err(|e| GateError::RepositoryQueryFailed {
            reason: format!("HEAD is not valid UTF-8: {}", e),
        })?;

        let head = head.trim();
        if head.is_empty() {
            return Err(GateError::RepositoryQueryFailed {
                reason: "`git rev-parse HEAD` printed nothing".to_string(),
            });
        }
        Ok(head.to_string())
    }

    fn tracked_files(&self) -> GateResult<Vec<String>> {
        let stdout = self.run(&["ls-files", "-z"])?;
        parse_ls_files(&stdout)
    }
}

/// Split NUL-terminated `git ls-files -z` output into a sorted path list.
pub fn parse_ls_files(stdout: &[u8]) -> GateResult<Vec<String>> {
    let mut files = stdout
        .split(|b| *b == 0)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            String::from_utf8(entry.to_vec()).map_err(|e| GateError::RepositoryQueryFailed {
                reason: format!("tracked path is not valid UTF-8: {}", e),
            })
        })
        .collect::<GateResult<Vec<String>>>()?;

    files.sort_unstable();
    Ok(files)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
