// crates/fraud-core/src/model.rs
// ============================================================================
// Module: Fraud Core Data Model
// Description: Wire and storage types for transactions, decisions, rules,
//              audit log entries, velocity counters, and SCA challenges.
// Purpose: One canonical representation shared by every crate that reads or
//          writes these shapes.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Types here mirror `spec.md` §3 ("Data Model") field for field. Validation
//! is intentionally shallow and explicit (`TransactionEvent::validate`) rather
//! than encoded into the type system, since these values cross a wire
//! boundary and must be deserializable even when invalid (so the handler can
//! reject with a structured `400` instead of failing to parse).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::sca::SCALevel;

// ============================================================================
// SECTION: Transaction Event
// ============================================================================

/// Payment channel a transaction originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Mobile application.
    App,
    /// Web browser.
    Web,
    /// Point of sale terminal.
    Pos,
    /// Automated teller machine.
    Atm,
}

/// Card form factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    /// Physical plastic card.
    Physical,
    /// Tokenized virtual card.
    Virtual,
}

/// Merchant details attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Merchant {
    /// Merchant identifier.
    pub id: String,
    /// Optional display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Four-digit merchant category code.
    pub mcc: String,
    /// Merchant country.
    pub country: String,
}

/// Card details attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Card {
    /// Card identifier.
    pub card_id: String,
    /// Cardholder's user identifier.
    pub user_id: String,
    /// Card form factor.
    #[serde(rename = "type")]
    pub card_type: CardType,
    /// Optional bank identification number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin: Option<String>,
}

/// Contextual signals describing how a transaction was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct TransactionContext {
    /// Submission channel.
    pub channel: Option<Channel>,
    /// Client IP address, if observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Geolocation, if resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<String>,
    /// Device identifier, if fingerprinted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Client user agent string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Whether the client appeared to be behind a proxy or VPN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_vpn_flag: Option<bool>,
}

/// A validated, client-supplied payment transaction.
///
/// # Invariants
/// - Never mutated after construction; downstream components clone fields
///   they need rather than writing back into it.
/// - `validate` must be called before the event enters the orchestrator; the
///   type itself does not enforce `amount > 0` so that malformed JSON can
///   still deserialize into a `400` response instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TransactionEvent {
    /// Globally unique, client-supplied event identifier.
    pub event_id: String,
    /// Tenant identifier; defaults to `"default"`.
    #[serde(default = "default_tenant")]
    pub tenant_id: String,
    /// Transaction amount; must be positive.
    pub amount: f64,
    /// ISO-4217-ish currency code.
    pub currency: String,
    /// Merchant details.
    pub merchant: Merchant,
    /// Card details.
    pub card: Card,
    /// Submission context.
    #[serde(default)]
    pub context: TransactionContext,
    /// Whether the caller already performed a step-up authentication.
    #[serde(default)]
    pub has_initial_2fa: bool,
    /// Opaque caller-supplied metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

fn default_tenant() -> String {
    "default".to_owned()
}

/// Reasons a [`TransactionEvent`] fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `amount` was not strictly positive.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(f64),
    /// `currency` was empty.
    #[error("currency must not be empty")]
    EmptyCurrency,
    /// `card.user_id` was empty.
    #[error("card.user_id must not be empty")]
    EmptyUserId,
    /// `event_id` was empty.
    #[error("event_id must not be empty")]
    EmptyEventId,
}

impl TransactionEvent {
    /// Validates the invariants from `spec.md` §3: `amount > 0`, `currency`
    /// non-empty, `card.user_id` non-empty, `event_id` non-empty.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.event_id.trim().is_empty() {
            return Err(ValidationError::EmptyEventId);
        }
        if !(self.amount > 0.0) {
            return Err(ValidationError::NonPositiveAmount(self.amount));
        }
        if self.currency.trim().is_empty() {
            return Err(ValidationError::EmptyCurrency);
        }
        if self.card.user_id.trim().is_empty() {
            return Err(ValidationError::EmptyUserId);
        }
        Ok(())
    }

    /// Computes the idempotency fingerprint `tenant_id + ":" + event_id`.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!("{}:{}", self.tenant_id, self.event_id)
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Terminal scoring outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionType {
    /// The transaction may proceed without friction.
    Allow,
    /// Step-up authentication is required before the transaction proceeds.
    Challenge,
    /// The transaction is refused.
    Deny,
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Allow => "ALLOW",
            Self::Challenge => "CHALLENGE",
            Self::Deny => "DENY",
        };
        f.write_str(text)
    }
}

/// Decision thresholds snapshotted onto every [`Decision`] for auditability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Thresholds {
    /// Scores at or below this value are low risk.
    pub low: f64,
    /// Scores above this value are high risk.
    pub high: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { low: 0.50, high: 0.70 }
    }
}

/// The single, immutable record produced for one logical scoring request.
///
/// # Invariants
/// - Exactly one `Decision` exists per logical request (enforced by the
///   idempotency store plus insert-if-absent semantics in storage).
/// - `score` is `None` only when the ML call failed.
/// - `reasons` is always non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Decision {
    /// Server-generated decision identifier (`dec_` + 12 lowercase hex).
    pub decision_id: String,
    /// The triggering event's identifier.
    pub event_id: String,
    /// Tenant identifier.
    pub tenant_id: String,
    /// Terminal outcome.
    pub decision: DecisionType,
    /// ML risk score in `[0, 1]`, or `None` if the model call failed.
    pub score: Option<f64>,
    /// Ordered, human-readable explanation of the outcome.
    pub reasons: Vec<String>,
    /// Ordered rule identifiers that matched, in full (not truncated).
    pub rule_hits: Vec<String>,
    /// Total processing latency observed by the orchestrator.
    pub latency_ms: u64,
    /// ML model version used for this decision.
    pub model_version: String,
    /// Threshold snapshot in effect when the decision was made.
    pub thresholds: Thresholds,
    /// Decision creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Whether step-up authentication is required.
    pub requires_2fa: bool,
}

// ============================================================================
// SECTION: Rule
// ============================================================================

/// The disposition a matched rule recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Hard deny; overrides the ML score (a "critical" rule).
    Deny,
    /// Flag for manual review without blocking.
    Review,
    /// Explicit allow.
    Allow,
}

/// A rule loaded from the rule store.
///
/// # Invariants
/// - Immutable outside an administrative path.
/// - `priority` sorts descending (higher evaluates first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Rule {
    /// Rule identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// DSL expression evaluated against the transaction context.
    pub expression: String,
    /// Disposition when this rule matches.
    pub action: RuleAction,
    /// Evaluation priority, descending.
    pub priority: i32,
    /// Whether this rule is active.
    pub enabled: bool,
    /// Optional human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Opaque metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// A rule that matched during evaluation, in the structured shape used at
/// the Rules-service boundary (`spec.md` §9, Open Question 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuleMatch {
    /// Matched rule's identifier.
    pub rule_id: String,
    /// Matched rule's name.
    pub rule_name: String,
    /// The expression that was evaluated.
    pub expression: String,
    /// The rule's configured action.
    pub action: RuleAction,
    /// Human-readable reason for the match.
    pub reason: String,
    /// The rule's priority at match time.
    pub priority: i32,
    /// The rule's metadata at match time.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

// ============================================================================
// SECTION: Audit Log Entry
// ============================================================================

/// A single append-only audit log row.
///
/// # Invariants
/// - `signature` is an HMAC-SHA256 over the canonical JSON rendering of every
///   other field except `log_id` and `signature` itself.
/// - The storage layer rejects `UPDATE`/`DELETE` against the backing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditLogEntry {
    /// Auto-assigned row identifier; `None` before the entry is persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_id: Option<i64>,
    /// Who performed the action (service, user, or system name).
    pub actor: String,
    /// What action was performed.
    pub action: String,
    /// Entity type affected.
    pub entity: String,
    /// Entity identifier affected.
    pub entity_id: String,
    /// Entity state before the action, if applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,
    /// Entity state after the action, if applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,
    /// Entry timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    /// Hex-encoded HMAC-SHA256 signature over the canonical entry.
    pub signature: String,
    /// Optional hash of the previous entry in this entity's chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_log_hash: Option<String>,
}

// ============================================================================
// SECTION: Velocity and Idempotency
// ============================================================================

/// Sliding-window transaction counters for one user, as returned by
/// [`crate::interfaces::VelocityTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct VelocityCounters {
    /// Transaction count in the trailing 1 hour.
    pub velocity_1h: u64,
    /// Transaction count in the trailing 24 hours.
    pub velocity_24h: u64,
    /// Summed transaction amount in the trailing 24 hours.
    pub amount_sum_24h: f64,
}

/// A resolved idempotency mapping from fingerprint to decision identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IdempotencyRecord {
    /// `tenant_id:event_id` fingerprint.
    pub fp: String,
    /// The decision identifier this fingerprint resolves to.
    pub decision_id: String,
}

// ============================================================================
// SECTION: SCA Challenge
// ============================================================================

/// Lifecycle state of an SCA challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SCAStatus {
    /// Awaiting completion by the authentication collaborator.
    Pending,
    /// Completed successfully.
    Completed,
    /// Completed unsuccessfully.
    Failed,
    /// Expired before completion.
    Expired,
    /// Bypassed by an operator or policy override.
    Bypassed,
}

/// A step-up authentication challenge record.
///
/// # Invariants
/// - Created by [`crate::sca`] whenever the policy requires one; the actual
///   challenge UX is an out-of-scope collaborator (`spec.md` §1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SCAChallenge {
    /// Server-assigned challenge identifier.
    pub challenge_id: i64,
    /// User this challenge was issued to.
    pub user_id: String,
    /// Transaction (event) identifier this challenge covers.
    pub transaction_id: String,
    /// Risk score at challenge creation time.
    pub risk_score: f64,
    /// Required authentication strength.
    pub challenge_type: SCALevel,
    /// Current lifecycle state.
    pub status: SCAStatus,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Completion time, if completed.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

// ============================================================================
// SECTION: Scoring Response
// ============================================================================

/// The `POST /v1/score` response body (`spec.md` §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoreResponse {
    /// Echoed event identifier.
    pub event_id: String,
    /// Decision identifier (fresh or replayed).
    pub decision_id: String,
    /// Terminal outcome.
    pub decision: DecisionType,
    /// ML risk score, if the model call succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Ordered human-readable reasons.
    pub reasons: Vec<String>,
    /// Flat list of matched rule names.
    pub rule_hits: Vec<String>,
    /// Total processing latency in milliseconds.
    pub latency_ms: u64,
    /// ML model version used.
    pub model_version: String,
    /// Whether step-up authentication is required.
    pub requires_2fa: bool,
    /// Top ML-contributing feature names, if returned by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_features: Option<Vec<String>>,
    /// The SCA challenge created for this transaction, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sca_challenge: Option<SCAChallenge>,
}
