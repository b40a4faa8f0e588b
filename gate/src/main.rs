//! COMA gate: command-line entry point.
//!
//! Reads one tool-call request from stdin, writes one decision record to
//! stdout, and exits 0 when the command is allowed, 1 when it is denied.
//! Logs go to stderr so stdout carries nothing but the decision.
//!
//! Usage:
//!   coma-gate < request.json
//!   coma-gate --policy /etc/coma-gate.toml --repo /srv/checkout < request.json
//!   coma-gate verify-audit /var/log/coma-gate.jsonl

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use coma_audit::{verify_file, JsonlAuditWriter};
use coma_contracts::{
    decision::Decision,
    error::{GateError, GateResult},
    policy::GatePolicy,
};
use coma_core::{deny_unconfigured, Gate};
use coma_git::GitRepository;

// ── CLI definition ────────────────────────────────────────────────────────────

/// COMA gate: allow a command only with a unanimous, state-bound approval bundle.
#[derive(Parser, Debug)]
#[command(
    name = "coma-gate",
    about = "Allow or deny a command from its embedded approval bundle",
    long_about = "Reads a tool-call request on stdin. Commands of a gated kind must embed a\n\
                  COMA bundle proving unanimous approval bound to the current HEAD, the\n\
                  tracked file set, and the command text itself."
)]
struct Cli {
    /// TOML gate policy. Defaults to the built-in policy.
    #[arg(long, value_name = "FILE")]
    policy: Option<PathBuf>,

    /// Repository to verify against (overrides the policy's workdir).
    #[arg(long, value_name = "DIR")]
    repo: Option<PathBuf>,

    /// Append every decision to this hash-chained JSON-lines file
    /// (overrides the policy's audit path).
    #[arg(long, value_name = "FILE")]
    audit_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the hash chain of an audit trail and report its length.
    VerifyAudit {
        /// The JSON-lines audit file.
        path: PathBuf,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let code = match &cli.command {
        Some(Command::VerifyAudit { path }) => verify_audit(path),
        None => {
            let decision = decide(&cli, read_stdin());
            emit(&decision);
            decision.exit_code()
        }
    };

    std::process::exit(code);
}

// ── Gate ──────────────────────────────────────────────────────────────────────

fn read_stdin() -> GateResult<String> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .map_err(|e| GateError::MalformedRequest {
            reason: format!("failed to read stdin: {}", e),
        })?;
    Ok(raw)
}

/// Resolve the policy from the CLI and evaluate one request.
///
/// A policy that cannot be loaded denies every request, gated or not. That
/// denial is still audited when `--audit-log` names a trail. A request that
/// could not be read goes through the gate as a denial so it is audited too.
fn decide(cli: &Cli, input: GateResult<String>) -> Decision {
    let policy = match resolve_policy(cli) {
        Ok(policy) => policy,
        Err(e) => {
            error!(reason = %e, "gate policy unavailable, denying");
            return match &cli.audit_log {
                Some(path) => deny_unconfigured(&JsonlAuditWriter::new(path.clone()), &e),
                None => Decision::deny(&e),
            };
        }
    };

    let repository = GitRepository::from_config(&policy.repository);
    let audit_path = policy.audit.path.clone();

    let mut gate = Gate::new(policy, Box::new(repository));
    if let Some(path) = audit_path {
        gate = gate.with_audit(Box::new(JsonlAuditWriter::new(path)));
    }
    match input {
        Ok(raw) => gate.evaluate(&raw),
        Err(e) => gate.evaluate_input(Err(e)),
    }
}

fn resolve_policy(cli: &Cli) -> GateResult<GatePolicy> {
    let mut policy = match &cli.policy {
        Some(path) => coma_policy::from_file(path)?,
        None => GatePolicy::default(),
    };
    if let Some(repo) = &cli.repo {
        policy.repository.workdir = Some(repo.clone());
    }
    if let Some(audit_log) = &cli.audit_log {
        policy.audit.path = Some(audit_log.clone());
    }
    Ok(policy)
}

fn emit(decision: &Decision) {
    let line = decision.to_json_line().unwrap_or_else(|_| {
        // Decision serialization cannot realistically fail; if it does, the
        // host must still see a denial.
        "{\"allowed\":false,\"reason\":\"COMA gate: decision could not be encoded\"}\n".to_string()
    });

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = stdout.write_all(line.as_bytes()).and_then(|()| stdout.flush()) {
        error!(error = %e, "failed to write decision to stdout");
    }
}

// ── Audit verification ────────────────────────────────────────────────────────

fn verify_audit(path: &Path) -> i32 {
    match verify_file(path) {
        Ok(count) => {
            info!(path = %path.display(), count, "audit trail intact");
            println!("audit trail intact: {} event(s)", count);
            0
        }
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
