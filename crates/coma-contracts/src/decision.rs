//! The gate's sole output artifact.

use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// The verdict written to standard output.
///
/// `reason` is present only on denial. Serializes as `{"allowed":true}` or
/// `{"allowed":false,"reason":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(error: &GateError) -> Self {
        Self {
            allowed: false,
            reason: Some(error.to_string()),
        }
    }

    /// Process exit status the host expects: 0 when allowed, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.allowed {
            0
        } else {
            1
        }
    }

    /// Render the decision as a single newline-terminated JSON record.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
