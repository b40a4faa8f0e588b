//! The request reader: raw stdin text → `GateRequest`.
//!
//! Hosts disagree slightly on key names, so the action kind is read from
//! `tool_name` or `name`, and the payload from `input` or `tool_input`; the
//! first truthy value wins (`null`, `false`, `0` and empty values are skipped). A payload may be the command string itself or
//! an object carrying it under `command`.

use serde_json::{Map, Value};

use coma_contracts::{
    error::{GateError, GateResult},
    request::GateRequest,
};

const ACTION_KEYS: [&str; 2] = ["tool_name", "name"];
const PAYLOAD_KEYS: [&str; 2] = ["input", "tool_input"];

/// Parse one request.
///
/// Fails with `EmptyInput` when `raw` is blank and `MalformedRequest` when it
/// is not a JSON object or names its action with a non-string. A payload of
/// any other shape yields empty command text, which later fails extraction.
pub fn read_request(raw: &str) -> GateResult<GateRequest> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(GateError::EmptyInput);
    }

    let value: Value = serde_json::from_str(raw).map_err(|e| GateError::MalformedRequest {
        reason: e.to_string(),
    })?;
    let object = value.as_object().ok_or_else(|| GateError::MalformedRequest {
        reason: "request must be a JSON object".to_string(),
    })?;

    let action_kind = match first_present(object, &ACTION_KEYS) {
        None => String::new(),
        Some(Value::String(kind)) => kind.to_lowercase(),
        Some(other) => {
            return Err(GateError::MalformedRequest {
                reason: format!("action kind must be a string, got {}", other),
            })
        }
    };

    let command_text = match first_present(object, &PAYLOAD_KEYS) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(payload)) => payload
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };

    Ok(GateRequest {
        action_kind,
        command_text,
    })
}

/// The first truthy value under `keys`.
fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| object.get(*k)).find(|v| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Object(m) => !m.is_empty(),
        Value::Array(a) => !a.is_empty(),
    })
}
