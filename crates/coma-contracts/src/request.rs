//! Request and invocation identity types.

use serde::{Deserialize, Serialize};

/// Unique identifier for one gate invocation.
///
/// Appears in every log line and audit record the invocation produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(pub uuid::Uuid);

impl InvocationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

/// The request handed to the gate by the invoking host.
///
/// Transient: it lives for exactly one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRequest {
    /// Lowercased action kind (e.g. `"bash"`, `"read"`).
    pub action_kind: String,
    /// The raw, multi-line command text. Opaque to the gate apart from the
    /// embedded bundle block.
    pub command_text: String,
}
