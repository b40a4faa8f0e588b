//! The COMA gate: the fail-closed, single-pass verification pipeline.
//!
//!   ReadRequest → ExtractBundle → ValidateFields → VerifyState
//!     → VerifyApproval → VerifyBinding → Allow | Deny(reason)
//!
//! Every stage returns `GateResult`, and `?` carries the first failure
//! straight to the decision. Requests whose action kind is not gated pass
//! through without touching the repository.

use chrono::Utc;
use tracing::{debug, info, info_span, warn};

use coma_contracts::{
    audit::DecisionRecord,
    decision::Decision,
    error::{GateError, GateResult},
    policy::GatePolicy,
    request::InvocationId,
};
use coma_verify::{
    extract_bundle, validate_fields, verify_approvals, verify_bindings, verify_file_set,
    verify_head,
};

use crate::{
    request::read_request,
    traits::{AuditWriter, RepositoryReader},
};

/// How a request that passed the gate got through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The action kind is not gated; no bundle was required.
    Passthrough { action_kind: String },
    /// Every check passed for this proposal.
    Approved { proposal_id: String },
}

/// Context accumulated while the pipeline runs, for logs and the audit record.
#[derive(Debug, Default)]
struct Trail {
    action_kind: Option<String>,
    proposal_id: Option<String>,
}

/// The gate. Construct once per invocation and call [`Gate::evaluate`].
pub struct Gate {
    policy: GatePolicy,
    repository: Box<dyn RepositoryReader>,
    audit: Option<Box<dyn AuditWriter>>,
}

impl Gate {
    pub fn new(policy: GatePolicy, repository: Box<dyn RepositoryReader>) -> Self {
        Self {
            policy,
            repository,
            audit: None,
        }
    }

    /// Record every decision through `audit`.
    pub fn with_audit(mut self, audit: Box<dyn AuditWriter>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Run the full pipeline over one raw request and produce the decision.
    ///
    /// Never fails: every error becomes a denial carrying its reason. When an
    /// audit writer is configured and the write fails, the decision becomes a
    /// denial as well.
    pub fn evaluate(&self, raw: &str) -> Decision {
        self.evaluate_input(Ok(raw))
    }

    /// [`Gate::evaluate`] for a request that may have failed to arrive. A
    /// read failure is denied and audited like a failure of any stage.
    pub fn evaluate_input(&self, input: GateResult<&str>) -> Decision {
        let invocation_id = InvocationId::new();
        let span = info_span!("gate", invocation_id = %invocation_id.0);
        let _entered = span.enter();

        let mut trail = Trail::default();
        let result = input.and_then(|raw| self.run(raw, &mut trail));

        let decision = match &result {
            Ok(GateOutcome::Passthrough { action_kind }) => {
                debug!(action_kind = %action_kind, "action kind not gated, allowing");
                Decision::allow()
            }
            Ok(GateOutcome::Approved { proposal_id }) => {
                info!(proposal_id = %proposal_id, "bundle verified, command allowed");
                Decision::allow()
            }
            Err(e) => {
                warn!(code = e.code(), reason = %e, "command denied");
                Decision::deny(e)
            }
        };

        match self.record(&invocation_id, &trail, &decision, result.err().as_ref()) {
            Ok(()) => decision,
            Err(e) => {
                warn!(code = e.code(), reason = %e, "decision could not be audited, denying");
                Decision::deny(&e)
            }
        }
    }

    /// The pipeline proper. Stages run strictly in order; the first `Err`
    /// ends the invocation.
    fn run(&self, raw: &str, trail: &mut Trail) -> GateResult<GateOutcome> {
        let request = read_request(raw)?;
        trail.action_kind = Some(request.action_kind.clone());

        if !self.policy.gates(&request.action_kind) {
            return Ok(GateOutcome::Passthrough {
                action_kind: request.action_kind,
            });
        }

        let extraction = extract_bundle(
            &request.command_text,
            &self.policy.start_marker,
            &self.policy.end_marker,
        )?;
        trail.proposal_id = extraction.document.proposal_id.clone();

        let bundle = validate_fields(&extraction.document)?;
        debug!(
            proposal_id = %bundle.proposal_id,
            files = bundle.files.len(),
            verdicts = bundle.verdicts.len(),
            "bundle fields present"
        );

        let live_head = self.repository.head()?;
        verify_head(&bundle, &live_head)?;
        let live_files = self.repository.tracked_files()?;
        verify_file_set(&bundle, &live_files)?;

        verify_approvals(&bundle, self.policy.strict_path_correspondence)?;
        verify_bindings(&bundle, &extraction.command_body)?;

        Ok(GateOutcome::Approved {
            proposal_id: bundle.proposal_id,
        })
    }

    fn record(
        &self,
        invocation_id: &InvocationId,
        trail: &Trail,
        decision: &Decision,
        error: Option<&GateError>,
    ) -> GateResult<()> {
        match &self.audit {
            Some(audit) => write_record(audit.as_ref(), invocation_id, trail, decision, error),
            None => Ok(()),
        }
    }
}

/// Deny and audit an invocation that failed before a `Gate` could be built,
/// such as one whose policy did not load.
pub fn deny_unconfigured(audit: &dyn AuditWriter, error: &GateError) -> Decision {
    let invocation_id = InvocationId::new();
    let span = info_span!("gate", invocation_id = %invocation_id.0);
    let _entered = span.enter();

    warn!(code = error.code(), reason = %error, "command denied");
    let decision = Decision::deny(error);
    match write_record(audit, &invocation_id, &Trail::default(), &decision, Some(error)) {
        Ok(()) => decision,
        Err(e) => {
            warn!(code = e.code(), reason = %e, "decision could not be audited");
            Decision::deny(&e)
        }
    }
}

fn write_record(
    audit: &dyn AuditWriter,
    invocation_id: &InvocationId,
    trail: &Trail,
    decision: &Decision,
    error: Option<&GateError>,
) -> GateResult<()> {
    let record = DecisionRecord {
        invocation_id: invocation_id.0.to_string(),
        action_kind: trail.action_kind.clone(),
        proposal_id: trail.proposal_id.clone(),
        allowed: decision.allowed,
        reason: decision.reason.clone(),
        code: error.map(|e| e.code().to_string()),
        timestamp: Utc::now(),
    };
    audit.write(&record)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::{json, Value};

    use coma_contracts::{
        audit::DecisionRecord,
        decision::Decision,
        error::{GateError, GateResult},
        policy::GatePolicy,
    };
    use coma_verify::{canonical_json, sha256_hex};

    use crate::traits::{AuditWriter, RepositoryReader};

    use super::{deny_unconfigured, Gate};

    const HEAD: &str = "9b1c0e7d4a";
    const FILES: [&str; 3] = ["Cargo.toml", "src/lib.rs", "src/main.rs"];
    const BODY: &str = "git apply proposal.patch && cargo test";

    // ── Mock helpers ─────────────────────────────────────────────────────────

    /// A repository that answers from fixed readings and counts queries.
    struct MockRepository {
        head: String,
        files: Vec<String>,
        fail: bool,
        queries: Arc<Mutex<Vec<&'static str>>>,
    }

    impl MockRepository {
        fn new(head: &str, files: &[&str]) -> Self {
            Self {
                head: head.to_string(),
                files: files.iter().map(|f| f.to_string()).collect(),
                fail: false,
                queries: Arc::new(Mutex::new(vec![])),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(HEAD, &FILES)
            }
        }
    }

    impl RepositoryReader for MockRepository {
        fn head(&self) -> GateResult<String> {
            self.queries.lock().unwrap().push("head");
            if self.fail {
                return Err(GateError::RepositoryQueryFailed {
                    reason: "not a git repository".to_string(),
                });
            }
            Ok(self.head.clone())
        }

        fn tracked_files(&self) -> GateResult<Vec<String>> {
            self.queries.lock().unwrap().push("files");
            Ok(self.files.clone())
        }
    }

    /// An audit writer that keeps every record, or refuses every write.
    struct MockAudit {
        records: Arc<Mutex<Vec<DecisionRecord>>>,
        fail: bool,
    }

    impl AuditWriter for MockAudit {
        fn write(&self, record: &DecisionRecord) -> GateResult<()> {
            if self.fail {
                return Err(GateError::AuditWriteFailed {
                    reason: "disk full".to_string(),
                });
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn approvals(files: &[&str]) -> Vec<Value> {
        files
            .iter()
            .map(|f| json!({ "file_path": f, "decision": "approve" }))
            .collect()
    }

    /// Seal a bundle the way the approval process does, let `tamper` edit it
    /// afterwards, and embed it below `body`.
    fn sealed_command_with(
        body: &str,
        head: &str,
        files: &[&str],
        verdicts: Vec<Value>,
        unanimous: Option<bool>,
        tamper: impl FnOnce(&mut Value),
    ) -> String {
        let diff = sha256_hex(body.trim());
        let reduction = json!({
            "proposal_id": "prop-1",
            "head": head,
            "files": files,
            "verdicts": verdicts,
            "diff_sha256": diff,
        });
        let mut bundle = reduction.clone();
        bundle["digest"] = json!(sha256_hex(&canonical_json(&reduction)));
        if let Some(flag) = unanimous {
            bundle["unanimous"] = json!(flag);
        }
        tamper(&mut bundle);

        format!(
            "{}\n### COMA_BUNDLE_START\n{}\n### COMA_BUNDLE_END\n",
            body,
            serde_json::to_string_pretty(&bundle).unwrap()
        )
    }

    fn sealed_command(files: &[&str], unanimous: Option<bool>) -> String {
        sealed_command_with(BODY, HEAD, files, approvals(files), unanimous, |_| {})
    }

    fn bash_request(command: &str) -> String {
        json!({ "tool_name": "Bash", "tool_input": { "command": command } }).to_string()
    }

    fn gate() -> Gate {
        Gate::new(GatePolicy::default(), Box::new(MockRepository::new(HEAD, &FILES)))
    }

    fn denial(decision: Decision) -> String {
        assert!(!decision.allowed, "expected a denial");
        decision.reason.expect("denials carry a reason")
    }

    // ── Allow paths ──────────────────────────────────────────────────────────

    #[test]
    fn test_sealed_unanimous_bundle_is_allowed() {
        let decision = gate().evaluate(&bash_request(&sealed_command(&FILES, Some(true))));
        assert_eq!(decision, Decision::allow());
    }

    #[test]
    fn test_ungated_action_passes_without_repository_queries() {
        let repo = MockRepository::new(HEAD, &FILES);
        let queries = Arc::clone(&repo.queries);
        let gate = Gate::new(GatePolicy::default(), Box::new(repo));

        let raw = json!({ "tool_name": "Read", "tool_input": { "file_path": "/etc/hosts" } });
        assert_eq!(gate.evaluate(&raw.to_string()), Decision::allow());
        assert!(queries.lock().unwrap().is_empty());
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let gate = gate();
        let raw = bash_request(&sealed_command(&FILES, Some(true)));
        assert_eq!(gate.evaluate(&raw), gate.evaluate(&raw));

        let raw = bash_request("rm -rf target");
        assert_eq!(gate.evaluate(&raw), gate.evaluate(&raw));
    }

    // ── Input and extraction failures ────────────────────────────────────────

    #[test]
    fn test_empty_stdin_is_denied() {
        let reason = denial(gate().evaluate("   "));
        assert_eq!(reason, GateError::EmptyInput.to_string());
    }

    #[test]
    fn test_malformed_request_is_denied() {
        let reason = denial(gate().evaluate("{not json"));
        assert!(reason.contains("invalid JSON on stdin"));
    }

    #[test]
    fn test_command_without_bundle_is_denied() {
        let reason = denial(gate().evaluate(&bash_request("cargo publish")));
        assert!(reason.contains("missing COMA bundle"), "got: {reason}");
    }

    #[test]
    fn test_incomplete_bundle_is_denied_before_repository_is_queried() {
        let repo = MockRepository::new(HEAD, &FILES);
        let queries = Arc::clone(&repo.queries);
        let gate = Gate::new(GatePolicy::default(), Box::new(repo));

        let command = sealed_command_with(BODY, HEAD, &FILES, approvals(&FILES), Some(true), |b| {
            b.as_object_mut().unwrap().remove("head");
        });
        let reason = denial(gate.evaluate(&bash_request(&command)));
        assert!(reason.contains("incomplete bundle fields"));
        assert!(queries.lock().unwrap().is_empty());
    }

    // ── State drift ──────────────────────────────────────────────────────────

    #[test]
    fn test_head_drift_is_denied_before_files_are_listed() {
        let repo = MockRepository::new("ffffffffff", &FILES);
        let queries = Arc::clone(&repo.queries);
        let gate = Gate::new(GatePolicy::default(), Box::new(repo));

        let reason = denial(gate.evaluate(&bash_request(&sealed_command(&FILES, Some(true)))));
        assert!(reason.contains("HEAD mismatch"));
        assert_eq!(*queries.lock().unwrap(), vec!["head"]);
    }

    #[test]
    fn test_permuted_file_list_is_denied() {
        let permuted = ["src/lib.rs", "Cargo.toml", "src/main.rs"];
        let reason = denial(gate().evaluate(&bash_request(&sealed_command(&permuted, Some(true)))));
        assert_eq!(reason, GateError::FileSetChanged.to_string());
    }

    #[test]
    fn test_repository_failure_is_denied() {
        let gate = Gate::new(GatePolicy::default(), Box::new(MockRepository::failing()));
        let reason = denial(gate.evaluate(&bash_request(&sealed_command(&FILES, Some(true)))));
        assert!(reason.contains("repository query failed"));
    }

    // ── Approvals ────────────────────────────────────────────────────────────

    #[test]
    fn test_absent_unanimous_flag_is_denied() {
        let reason = denial(gate().evaluate(&bash_request(&sealed_command(&FILES, None))));
        assert_eq!(reason, "COMA gate: bundle not marked unanimous");
    }

    #[test]
    fn test_unanimous_false_is_denied_even_when_all_approve() {
        let reason = denial(gate().evaluate(&bash_request(&sealed_command(&FILES, Some(false)))));
        assert_eq!(reason, GateError::NotUnanimous.to_string());
    }

    #[test]
    fn test_rejection_is_denied_naming_the_file() {
        let mut verdicts = approvals(&FILES);
        verdicts[2]["decision"] = json!("reject");
        let command = sealed_command_with(BODY, HEAD, &FILES, verdicts, Some(true), |_| {});
        let reason = denial(gate().evaluate(&bash_request(&command)));
        assert_eq!(reason, "COMA gate: rejection present for src/main.rs");
    }

    #[test]
    fn test_strict_policy_rejects_unrelated_verdict_paths() {
        let unrelated = approvals(&["x", "y", "z"]);
        let command = sealed_command_with(BODY, HEAD, &FILES, unrelated, Some(true), |_| {});

        let lenient = gate();
        assert!(lenient.evaluate(&bash_request(&command)).allowed);

        let policy = GatePolicy {
            strict_path_correspondence: true,
            ..GatePolicy::default()
        };
        let strict = Gate::new(policy, Box::new(MockRepository::new(HEAD, &FILES)));
        let reason = denial(strict.evaluate(&bash_request(&command)));
        assert!(reason.contains("verdict paths do not match"));
    }

    // ── Bindings ─────────────────────────────────────────────────────────────

    #[test]
    fn test_edited_command_text_fails_diff_binding() {
        let command = sealed_command(&FILES, Some(true)).replace("cargo test", "cargo tesT");
        let reason = denial(gate().evaluate(&bash_request(&command)));
        assert_eq!(reason, "COMA gate: diff/commands digest mismatch");
    }

    #[test]
    fn test_edited_verdict_path_fails_self_binding() {
        let command = sealed_command_with(BODY, HEAD, &FILES, approvals(&FILES), Some(true), |b| {
            b["verdicts"][1]["file_path"] = json!("src/liB.rs");
        });
        let reason = denial(gate().evaluate(&bash_request(&command)));
        assert_eq!(reason, "COMA gate: bundle digest mismatch");
    }

    #[test]
    fn test_whitespace_around_body_is_not_bound() {
        let command = format!("\n\n  {}", sealed_command(&FILES, Some(true)));
        assert!(gate().evaluate(&bash_request(&command)).allowed);
    }

    // ── Audit ────────────────────────────────────────────────────────────────

    #[test]
    fn test_every_decision_is_audited() {
        let records = Arc::new(Mutex::new(vec![]));
        let gate = gate().with_audit(Box::new(MockAudit {
            records: Arc::clone(&records),
            fail: false,
        }));

        gate.evaluate(&bash_request(&sealed_command(&FILES, Some(true))));
        gate.evaluate(&bash_request("cargo publish"));

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].allowed);
        assert_eq!(records[0].proposal_id.as_deref(), Some("prop-1"));
        assert_eq!(records[0].action_kind.as_deref(), Some("bash"));
        assert!(!records[1].allowed);
        assert_eq!(records[1].code.as_deref(), Some("bundle_missing"));
        assert_ne!(records[0].invocation_id, records[1].invocation_id);
    }

    #[test]
    fn test_unread_request_is_denied_and_audited() {
        let records = Arc::new(Mutex::new(vec![]));
        let repo = MockRepository::new(HEAD, &FILES);
        let queries = Arc::clone(&repo.queries);
        let gate = Gate::new(GatePolicy::default(), Box::new(repo)).with_audit(Box::new(MockAudit {
            records: Arc::clone(&records),
            fail: false,
        }));

        let error = GateError::MalformedRequest {
            reason: "failed to read stdin: stream did not contain valid UTF-8".to_string(),
        };
        let reason = denial(gate.evaluate_input(Err(error.clone())));
        assert_eq!(reason, error.to_string());
        assert!(queries.lock().unwrap().is_empty());

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].allowed);
        assert_eq!(records[0].code.as_deref(), Some("malformed_request"));
        assert_eq!(records[0].action_kind, None);
    }

    #[test]
    fn test_unconfigured_denial_is_audited() {
        let records = Arc::new(Mutex::new(vec![]));
        let audit = MockAudit {
            records: Arc::clone(&records),
            fail: false,
        };
        let error = GateError::ConfigError {
            reason: "policy file missing".to_string(),
        };

        let reason = denial(deny_unconfigured(&audit, &error));
        assert_eq!(reason, error.to_string());
        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code.as_deref(), Some("config_error"));
    }

    #[test]
    fn test_unconfigured_denial_reports_audit_failure() {
        let audit = MockAudit {
            records: Arc::new(Mutex::new(vec![])),
            fail: true,
        };
        let error = GateError::ConfigError {
            reason: "policy file missing".to_string(),
        };
        let reason = denial(deny_unconfigured(&audit, &error));
        assert!(reason.contains("audit write failed"));
    }

    #[test]
    fn test_failed_audit_write_denies() {
        let gate = gate().with_audit(Box::new(MockAudit {
            records: Arc::new(Mutex::new(vec![])),
            fail: true,
        }));
        let reason = denial(gate.evaluate(&bash_request(&sealed_command(&FILES, Some(true)))));
        assert!(reason.contains("audit write failed"));
    }
}
