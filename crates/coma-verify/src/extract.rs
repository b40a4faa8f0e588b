//! Locating and parsing the bundle block embedded in command text.
//!
//! A block is opened by the first line reading `### <start_marker>` and
//! closed by the first line after it reading `### <end_marker>`. Marker lines
//! tolerate surrounding whitespace and differences in token case. Only the
//! first block is considered.
//!
//! The block removed to form the command body is widened the same way the
//! approval process widens it before hashing: backwards over whitespace to the
//! earliest line start, and forwards over whitespace to the latest line end.
//! Both sides must agree byte-for-byte or the diff digest will not match.

use serde_json::Value;
use tracing::debug;

use coma_contracts::{
    bundle::BundleDocument,
    error::{GateError, GateResult},
};

/// The result of a successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The parsed bundle, not yet checked for required fields.
    pub document: BundleDocument,
    /// The command text with the bundle block removed, whitespace-trimmed.
    /// This is the exact input of the diff digest.
    pub command_body: String,
}

/// Extract the first bundle block from `command_text`.
///
/// Fails with `BundleMissing` when no start marker line is followed by an end
/// marker line, and with `BundleMalformed` when the captured text is not a JSON
/// object whose fields have the expected types.
pub fn extract_bundle(
    command_text: &str,
    start_marker: &str,
    end_marker: &str,
) -> GateResult<Extraction> {
    let missing = || GateError::BundleMissing {
        start_marker: start_marker.to_string(),
        end_marker: end_marker.to_string(),
    };

    let mut lines = lines_with_offsets(command_text);

    let (start_offset, start_line) = lines
        .by_ref()
        .find(|(_, line)| is_marker_line(line, start_marker))
        .ok_or_else(missing)?;
    let (end_offset, end_line) = lines
        .find(|(_, line)| is_marker_line(line, end_marker))
        .ok_or_else(missing)?;

    let captured_from = start_offset + start_line.len();
    let captured = command_text[captured_from..end_offset].trim();

    let block_start = widen_to_line_start(command_text, start_offset);
    let block_end = widen_to_line_end(command_text, end_offset + end_line.trim_end().len());

    debug!(
        block_start,
        block_end,
        bundle_bytes = captured.len(),
        "bundle block located"
    );

    let document = parse_document(captured)?;

    let mut body = String::with_capacity(command_text.len() - (block_end - block_start));
    body.push_str(&command_text[..block_start]);
    body.push_str(&command_text[block_end..]);

    Ok(Extraction {
        document,
        command_body: body.trim().to_string(),
    })
}

fn parse_document(captured: &str) -> GateResult<BundleDocument> {
    let value: Value = serde_json::from_str(captured).map_err(|e| GateError::BundleMalformed {
        reason: e.to_string(),
    })?;

    if !value.is_object() {
        return Err(GateError::BundleMalformed {
            reason: "bundle must be a JSON object".to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| GateError::BundleMalformed {
        reason: e.to_string(),
    })
}

/// Iterate `(byte_offset, line)` pairs. Lines exclude their `\n`.
fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    text.split('\n').map(move |line| {
        let start = offset;
        offset += line.len() + 1;
        (start, line)
    })
}

fn is_marker_line(line: &str, token: &str) -> bool {
    line.trim()
        .strip_prefix("###")
        .is_some_and(|rest| rest.trim_start().eq_ignore_ascii_case(token))
}

/// Move `pos` (a line start) back to the earliest line start reachable over
/// whitespace only.
fn widen_to_line_start(text: &str, pos: usize) -> usize {
    let run_start = text[..pos].trim_end().len();
    if run_start == 0 {
        return 0;
    }
    // text[run_start - 1] is not whitespace, so the first newline in the run
    // marks the earliest line start.
    match text[run_start..pos].find('\n') {
        Some(i) => run_start + i + 1,
        None => pos,
    }
}

/// Move `pos` forward to the latest line end reachable over whitespace only.
fn widen_to_line_end(text: &str, pos: usize) -> usize {
    let rest = &text[pos..];
    let run_end = pos + (rest.len() - rest.trim_start().len());
    if run_end == text.len() {
        return run_end;
    }
    match text[pos..run_end].rfind('\n') {
        Some(i) => pos + i,
        None => pos,
    }
}
