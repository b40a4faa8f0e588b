//! JSON-lines file implementation of `AuditWriter`.
//!
//! Each gate invocation is a fresh process, so the chain tip is recovered
//! from the last non-empty line of the file on every write. Only the tail of
//! the file is read; earlier lines are checked by `verify_file`, not by the
//! writer. One `AuditEvent` per line. Writers in concurrent processes are not
//! serialized against each other; a race shows up as a broken chain in
//! `verify_file`.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use coma_contracts::{
    audit::DecisionRecord,
    error::{GateError, GateResult},
};
use coma_core::traits::AuditWriter;

use crate::{chain::verify_chain, event::AuditEvent};

/// Bytes read from the end of the trail per attempt to find the last line.
/// Doubled until a whole line fits.
const TAIL_WINDOW: u64 = 4096;

/// Appends hash-chained decision events to a file.
#[derive(Debug, Clone)]
pub struct JsonlAuditWriter {
    path: PathBuf,
}

impl JsonlAuditWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditWriter for JsonlAuditWriter {
    fn write(&self, record: &DecisionRecord) -> GateResult<()> {
        let failed = |e: std::io::Error| GateError::AuditWriteFailed {
            reason: format!("'{}': {}", self.path.display(), e),
        };

        let (sequence, prev_hash) = match read_tip(&self.path)? {
            Some(last) => (last.sequence + 1, last.this_hash.clone()),
            None => (0, AuditEvent::GENESIS_HASH.to_string()),
        };

        let event = AuditEvent::link(sequence, record.clone(), prev_hash)?;
        let mut line = serde_json::to_string(&event).map_err(|e| GateError::AuditWriteFailed {
            reason: format!("audit event is not serializable: {}", e),
        })?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(failed)?;
        file.write_all(line.as_bytes()).map_err(failed)?;
        file.flush().map_err(failed)?;

        debug!(
            path = %self.path.display(),
            sequence,
            this_hash = %event.this_hash,
            "decision appended to audit trail"
        );
        Ok(())
    }
}

/// The last event in the trail at `path`, or `None` for a missing or blank
/// file.
fn read_tip(path: &Path) -> GateResult<Option<AuditEvent>> {
    let failed = |e: std::io::Error| GateError::AuditWriteFailed {
        reason: format!("failed to read audit trail '{}': {}", path.display(), e),
    };

    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(failed(e)),
    };
    let len = file.metadata().map_err(failed)?.len();

    let mut window = TAIL_WINDOW;
    loop {
        let start = len.saturating_sub(window);
        file.seek(SeekFrom::Start(start)).map_err(failed)?;
        let mut tail = Vec::new();
        file.read_to_end(&mut tail).map_err(failed)?;

        let content_end = tail
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map(|i| i + 1);
        let line = match content_end {
            None if start == 0 => return Ok(None),
            None => None,
            Some(end) => match tail[..end].iter().rposition(|b| *b == b'\n') {
                Some(newline) => Some(&tail[newline + 1..end]),
                None if start == 0 => Some(&tail[..end]),
                None => None,
            },
        };

        if let Some(line) = line {
            let event = serde_json::from_slice(line).map_err(|e| GateError::AuditWriteFailed {
                reason: format!(
                    "last line of audit trail '{}' is not an audit event: {}",
                    path.display(),
                    e
                ),
            })?;
            return Ok(Some(event));
        }
        window = window.saturating_mul(2);
    }
}

/// Read every event from a JSON-lines audit file. A missing file is an
/// empty trail.
pub fn read_events(path: &Path) -> GateResult<Vec<AuditEvent>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(GateError::ConfigError {
                reason: format!("failed to open audit trail '{}': {}", path.display(), e),
            })
        }
    };

    let mut events = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| GateError::ConfigError {
            reason: format!("failed to read audit trail '{}': {}", path.display(), e),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|e| GateError::ConfigError {
            reason: format!(
                "audit trail '{}' line {} is not an audit event: {}",
                path.display(),
                index + 1,
                e
            ),
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Read the trail at `path` and check its hash chain.
///
/// Returns the number of events on success.
pub fn verify_file(path: &Path) -> GateResult<usize> {
    let events = read_events(path)?;
    if !verify_chain(&events) {
        return Err(GateError::ConfigError {
            reason: format!("audit trail '{}' failed chain verification", path.display()),
        });
    }

    info!(
        path = %path.display(),
        event_count = events.len(),
        terminal_hash = %events.last().map(|e| e.this_hash.as_str()).unwrap_or(AuditEvent::GENESIS_HASH),
        "audit trail verified"
    );
    Ok(events.len())
}
