// crates/fraud-core/src/hashing.rs
// ============================================================================
// Module: Audit hashing
// Description: Canonical JSON rendering, HMAC-SHA256 signing/verification for
//              audit log entries, and the event integrity hash.
// Purpose: Give Audit & Storage one place to produce and check the
//          tamper-evident signatures `spec.md` §3/§4.6 require.
// Dependencies: serde_jcs, hmac, sha2, subtle, time
// ============================================================================

//! ## Overview
//! Ported from `sign_audit_log`/`verify_audit_log`/`validate_audit_integrity`
//! in the original Python decision engine's `app/audit.py`, and
//! `PostgresStore.compute_hash` in `app/storage.py`. The canonical JSON
//! rendering there is `json.dumps(data, sort_keys=True, separators=(',',
//! ':'))`; [`serde_jcs`] produces the same shape (sorted keys, no
//! whitespace) for a `serde_json::Value`.

use hmac::Hmac;
use hmac::Mac;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

/// Errors raised while signing or verifying audit data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashingError {
    /// The value could not be rendered as canonical JSON.
    #[error("failed to canonicalize value: {0}")]
    Canonicalize(String),
    /// The HMAC secret was empty or otherwise unusable as a MAC key.
    #[error("invalid HMAC key")]
    InvalidKey,
}

/// Renders `value` as canonical JSON: sorted keys, compact separators
/// (`spec.md` §3 "Canonical JSON").
///
/// # Errors
///
/// Returns [`HashingError::Canonicalize`] if `value` cannot be serialized.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, HashingError> {
    serde_jcs::to_string(value).map_err(|err| HashingError::Canonicalize(err.to_string()))
}

/// Computes the hex-encoded HMAC-SHA256 signature of `canonical` under
/// `secret`.
///
/// # Errors
///
/// Returns [`HashingError::InvalidKey`] if `secret` is empty.
pub fn hmac_sign(secret: &str, canonical: &str) -> Result<String, HashingError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| HashingError::InvalidKey)?;
    mac.update(canonical.as_bytes());
    Ok(hex_encode(&mac.finalize().into_bytes()))
}

/// Verifies `signature` against `canonical` under `secret` using a
/// constant-time comparison (`spec.md` §4.6 "Integrity verification").
///
/// # Errors
///
/// Returns [`HashingError::InvalidKey`] if `secret` is empty.
pub fn hmac_verify(secret: &str, canonical: &str, signature: &str) -> Result<bool, HashingError> {
    let expected = hmac_sign(secret, canonical)?;
    Ok(expected.as_bytes().ct_eq(signature.as_bytes()).into())
}

/// The fields an audit log entry's signature is computed over, in the same
/// shape the orchestrator persists (`spec.md` §3 "Audit Log Entry").
#[derive(Debug, Clone, Serialize)]
pub struct AuditSignaturePayload<'a> {
    /// Who performed the action.
    pub actor: &'a str,
    /// What action was performed.
    pub action: &'a str,
    /// Entity type affected.
    pub entity: &'a str,
    /// Entity identifier affected.
    pub entity_id: &'a str,
    /// RFC3339 entry timestamp.
    pub timestamp: String,
    /// Arbitrary structured details, or an empty object.
    pub details: serde_json::Value,
    /// Actor IP address, if known.
    pub ip_address: Option<&'a str>,
}

/// Signs an audit log entry's fields, returning the hex-encoded HMAC.
///
/// # Errors
///
/// Returns [`HashingError`] if canonicalization or signing fails.
pub fn sign_audit_entry(secret: &str, payload: &AuditSignaturePayload<'_>) -> Result<String, HashingError> {
    let canonical = canonical_json(payload)?;
    hmac_sign(secret, &canonical)
}

/// Verifies an audit log entry's signature against its fields.
///
/// # Errors
///
/// Returns [`HashingError`] if canonicalization fails.
pub fn verify_audit_entry(
    secret: &str,
    payload: &AuditSignaturePayload<'_>,
    signature: &str,
) -> Result<bool, HashingError> {
    let canonical = canonical_json(payload)?;
    hmac_verify(secret, &canonical, signature)
}

/// Computes the event integrity hash:
/// `SHA-256(event_id || tenant_id || ts.ISO || canonical_json(payload))`
/// (`spec.md` §4.6, rule 1).
///
/// # Errors
///
/// Returns [`HashingError::Canonicalize`] if `payload` cannot be rendered.
pub fn event_hash<T: Serialize>(
    event_id: &str,
    tenant_id: &str,
    ts: OffsetDateTime,
    payload: &T,
) -> Result<String, HashingError> {
    let ts_iso = ts
        .format(&time::format_description::well_known::Rfc3339)
        .map_err(|err| HashingError::Canonicalize(err.to_string()))?;
    let canonical = canonical_json(payload)?;
    let mut content = String::with_capacity(event_id.len() + tenant_id.len() + ts_iso.len() + canonical.len());
    content.push_str(event_id);
    content.push_str(tenant_id);
    content.push_str(&ts_iso);
    content.push_str(&canonical);
    let digest = Sha256::digest(content.as_bytes());
    Ok(hex_encode(&digest))
}

/// One audit log row's verification outcome, for [`verify_entries`].
#[derive(Debug, Clone)]
pub struct VerifiedEntry {
    /// Zero-based index of the entry within the input slice.
    pub index: usize,
    /// The entry's `log_id`, if it has one.
    pub log_id: Option<i64>,
}

/// Integrity report produced by [`verify_entries`] (`spec.md` §4.6
/// `verify(entries)`).
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    /// Number of entries examined.
    pub total: usize,
    /// Number of entries whose signature verified.
    pub valid: usize,
    /// Entries whose signature failed to verify.
    pub invalid: Vec<VerifiedEntry>,
    /// `valid / total * 100`, or `0.0` when `total == 0`.
    pub integrity_percentage: f64,
}

/// Recomputes and checks the signature of every entry, reporting which, if
/// any, fail (`spec.md` §4.6 "Integrity verification": "Any mismatch is an
/// incident.").
///
/// # Errors
///
/// Returns [`HashingError`] only if canonicalization itself fails for some
/// entry's payload; a signature mismatch is reported in the result, not as
/// an error.
pub fn verify_entries(
    secret: &str,
    entries: &[(AuditSignaturePayload<'_>, String, Option<i64>)],
) -> Result<IntegrityReport, HashingError> {
    let total = entries.len();
    let mut valid = 0usize;
    let mut invalid = Vec::new();

    for (index, (payload, signature, log_id)) in entries.iter().enumerate() {
        if verify_audit_entry(secret, payload, signature)? {
            valid += 1;
        } else {
            invalid.push(VerifiedEntry { index, log_id: *log_id });
        }
    }

    let integrity_percentage = if total == 0 {
        0.0
    } else {
        (valid as f64 / total as f64) * 100.0
    };

    Ok(IntegrityReport { total, valid, invalid, integrity_percentage })
}

/// Lowercase hex encoding, used for HMAC and SHA-256 digests.
fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // `write!` to a `String` never fails.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use super::*;

    fn payload() -> AuditSignaturePayload<'static> {
        AuditSignaturePayload {
            actor: "decision-engine",
            action: "SCORE_TRANSACTION",
            entity: "transaction",
            entity_id: "txn_123",
            timestamp: "2026-01-01T00:00:00Z".to_owned(),
            details: serde_json::json!({"score": 0.85}),
            ip_address: Some("10.0.1.15"),
        }
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let secret = "top-secret";
        let sig = sign_audit_entry(secret, &payload()).expect("sign");
        assert_eq!(sig.len(), 64);
        assert!(verify_audit_entry(secret, &payload(), &sig).expect("verify"));
    }

    #[test]
    fn tampering_flips_verification_to_false() {
        let secret = "top-secret";
        let sig = sign_audit_entry(secret, &payload()).expect("sign");
        let mut tampered = payload();
        tampered.details = serde_json::json!({"score": 0.10});
        assert!(!verify_audit_entry(secret, &tampered, &sig).expect("verify"));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let sig = sign_audit_entry("secret-a", &payload()).expect("sign");
        assert!(!verify_audit_entry("secret-b", &payload(), &sig).expect("verify"));
    }

    #[test]
    fn canonical_json_sorts_keys() {
        #[derive(Serialize)]
        struct Unordered {
            z: i32,
            a: i32,
        }
        let json = canonical_json(&Unordered { z: 1, a: 2 }).expect("canonical");
        assert_eq!(json, r#"{"a":2,"z":1}"#);
    }

    #[test]
    fn event_hash_is_deterministic() {
        let ts = OffsetDateTime::UNIX_EPOCH;
        let payload = serde_json::json!({"amount": 10.0});
        let a = event_hash("evt_1", "default", ts, &payload).expect("hash");
        let b = event_hash("evt_1", "default", ts, &payload).expect("hash");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn event_hash_changes_with_payload() {
        let ts = OffsetDateTime::UNIX_EPOCH;
        let a = event_hash("evt_1", "default", ts, &serde_json::json!({"amount": 10.0})).expect("hash");
        let b = event_hash("evt_1", "default", ts, &serde_json::json!({"amount": 11.0})).expect("hash");
        assert_ne!(a, b);
    }

    #[test]
    fn verify_entries_reports_integrity_percentage() {
        let secret = "top-secret";
        let good_sig = sign_audit_entry(secret, &payload()).expect("sign");
        let entries = vec![
            (payload(), good_sig, Some(1)),
            (payload(), "deadbeef".repeat(8), Some(2)),
        ];
        let report = verify_entries(secret, &entries).expect("verify");
        assert_eq!(report.total, 2);
        assert_eq!(report.valid, 1);
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].log_id, Some(2));
        assert!((report.integrity_percentage - 50.0).abs() < f64::EPSILON);
    }
}
