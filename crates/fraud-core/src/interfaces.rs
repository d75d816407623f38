// crates/fraud-core/src/interfaces.rs
// ============================================================================
// Module: Fraud Core Interfaces
// Description: Backend-agnostic async traits for the stores and services the
//              orchestrator depends on.
// Purpose: Let fraud-orchestrator depend on behaviour, not on Redis/Postgres/
//          Kafka/HTTP directly, and let tests substitute in-memory fakes.
// Dependencies: crate::model, async_trait, thiserror
// ============================================================================

//! ## Overview
//! Every trait in this module is implemented by exactly one other crate in
//! the workspace in production (`fraud-stores-redis`, `fraud-store-postgres`,
//! `fraud-providers`, `fraud-rules`, `fraud-publisher`) and by hand-written
//! fakes in `fraud-orchestrator`'s test suite. Each trait carries its own
//! `thiserror` error enum (`spec.md` §7's "structured results, not
//! exceptions-for-control-flow" propagation policy) and a default-`Ok`
//! `readiness` method used to populate `GET /health`'s `dependencies` map.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::Decision;
use crate::model::RuleAction;
use crate::model::RuleMatch;
use crate::model::SCAChallenge;
use crate::model::TransactionEvent;
use crate::model::VelocityCounters;
use crate::sca::SCALevel;

// ============================================================================
// SECTION: Idempotency Store
// ============================================================================

/// Errors returned by an [`IdempotencyStore`].
#[derive(Debug, Error)]
pub enum IdempotencyStoreError {
    /// The backing store is unreachable or returned a transport error.
    #[error("idempotency store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed, ephemeral, concurrency-safe test-and-set mapping from fingerprint
/// to decision identifier (`spec.md` §4.5).
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Atomically sets `fp -> decision_id` if absent, returning the prior
    /// decision id if `fp` was already present.
    ///
    /// # Errors
    ///
    /// Returns [`IdempotencyStoreError`] when the store cannot be reached.
    /// Callers treat this as fail-open: proceed without deduplication rather
    /// than reject the request (`spec.md` §4.5 "Availability policy").
    async fn check_and_set(
        &self,
        fp: &str,
        decision_id: &str,
        ttl: Duration,
    ) -> Result<Option<String>, IdempotencyStoreError>;

    /// Reports store readiness for `GET /health`.
    async fn readiness(&self) -> Result<(), IdempotencyStoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Velocity Tracker
// ============================================================================

/// Errors returned by a [`VelocityTracker`].
#[derive(Debug, Error)]
pub enum VelocityTrackerError {
    /// The backing store is unreachable or returned a transport error.
    #[error("velocity store unavailable: {0}")]
    Unavailable(String),
}

/// Per-user sliding-window transaction counters over 1h and 24h
/// (`spec.md` §4.4).
#[async_trait]
pub trait VelocityTracker: Send + Sync {
    /// Records a transaction for `user_id` and returns the updated counters.
    ///
    /// # Errors
    ///
    /// Returns [`VelocityTrackerError`] when the store cannot be reached.
    /// Callers degrade to zeroed counters on error (fail-open) unless the
    /// deployment has opted into fail-closed via configuration.
    async fn record(
        &self,
        user_id: &str,
        amount: f64,
    ) -> Result<VelocityCounters, VelocityTrackerError>;

    /// Reads the current counters for `user_id` without recording a write.
    ///
    /// # Errors
    ///
    /// Returns [`VelocityTrackerError`] when the store cannot be reached.
    async fn get(&self, user_id: &str) -> Result<VelocityCounters, VelocityTrackerError>;

    /// Reports store readiness for `GET /health`.
    async fn readiness(&self) -> Result<(), VelocityTrackerError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Rule Engine
// ============================================================================

/// Errors returned by a [`RuleEngine`].
#[derive(Debug, Error)]
pub enum RuleEngineError {
    /// The rule store could not be reached and no cached rule set is
    /// available yet (fail-static has nothing to serve).
    #[error("rule store unavailable and no cached rules: {0}")]
    Unavailable(String),
}

/// The side of a list match (`spec.md` §4.3 "List checks").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    /// The value appeared on a deny list.
    Deny,
    /// The value appeared on an allow list.
    Allow,
}

/// A single deny/allow list hit against one of the fixed checked fields.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListMatch {
    /// Which list kind matched.
    pub list_type: ListKind,
    /// Redis key (or equivalent) the value matched against.
    pub list_name: String,
    /// The matched value.
    pub matched_value: String,
    /// The context field the value came from.
    pub field: String,
    /// Human-readable explanation.
    pub reason: String,
}

/// The transaction context passed to the Rules boundary (`spec.md` §6).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuleEvaluationContext {
    /// Transaction (event) identifier.
    pub transaction_id: String,
    /// Cardholder user identifier.
    pub user_id: String,
    /// Transaction amount.
    pub amount: f64,
    /// Transaction currency.
    pub currency: String,
    /// Merchant identifier.
    pub merchant_id: String,
    /// Merchant category code.
    pub merchant_category: String,
    /// Merchant/transaction geography.
    pub geo: String,
    /// Client IP address, if known.
    pub ip_address: Option<String>,
    /// Client device identifier, if known.
    pub device_id: Option<String>,
    /// Card form factor / payment method.
    pub payment_method: String,
    /// Trailing 1h transaction count from the velocity tracker.
    pub tx_count_1h: u64,
    /// Trailing 24h transaction count from the velocity tracker.
    pub tx_count_24h: u64,
    /// Trailing 24h summed amount from the velocity tracker.
    pub amount_sum_24h: f64,
    /// Caller-supplied metadata, including tenant and channel.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// The outcome of one rule-evaluation pass (`spec.md` §4.3 "Output shape").
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuleEvaluationOutcome {
    /// Rules that matched, sorted by descending priority.
    pub matched_rules: Vec<RuleMatch>,
    /// `true` iff any matched rule has `action == deny`.
    pub is_critical: bool,
    /// Deny/allow list matches observed during this evaluation.
    pub list_matches: Vec<ListMatch>,
    /// Wall-clock time spent evaluating, in milliseconds.
    pub evaluation_time_ms: u64,
}

impl RuleEvaluationOutcome {
    /// Flattens `matched_rules` into rule names, in match order, for the
    /// scoring response boundary (`spec.md` §9, Open Question 3).
    #[must_use]
    pub fn rule_hit_names(&self) -> Vec<String> {
        self.matched_rules.iter().map(|m| m.rule_name.clone()).collect()
    }

    /// `true` iff any list match is a deny-list hit.
    #[must_use]
    pub fn has_deny_list_match(&self) -> bool {
        self.list_matches.iter().any(|m| m.list_type == ListKind::Deny)
    }

    /// `true` iff any list match is an allow-list hit and no deny-list match
    /// is present (deny takes precedence, `spec.md` §4.3).
    #[must_use]
    pub fn has_allow_override(&self) -> bool {
        !self.has_deny_list_match() && self.list_matches.iter().any(|m| m.list_type == ListKind::Allow)
    }
}

/// Computes `is_critical` from a set of matched rules.
#[must_use]
pub fn is_critical(matches: &[RuleMatch]) -> bool {
    matches.iter().any(|m| m.action == RuleAction::Deny)
}

/// Rule evaluation and list-check engine (`spec.md` §4.3).
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// Evaluates the priority-ordered, enabled rule set against `context`,
    /// optionally also consulting deny/allow lists.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError`] only when no cached rule set exists at
    /// all; once a rule set has been loaded once, subsequent DB outages are
    /// served fail-static from cache rather than erroring.
    async fn evaluate(
        &self,
        context: &RuleEvaluationContext,
        check_lists: bool,
    ) -> Result<RuleEvaluationOutcome, RuleEngineError>;

    /// Reports store readiness for `GET /health`.
    async fn readiness(&self) -> Result<(), RuleEngineError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Predictor (ML)
// ============================================================================

/// Errors returned by a [`Predictor`].
#[derive(Debug, Error)]
pub enum PredictorError {
    /// The call exceeded its budget.
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    /// The model service returned a transport or protocol error.
    #[error("model call failed: {0}")]
    Failed(String),
}

/// The ML predictor's response (`spec.md` §6 "Downstream HTTP to ML").
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PredictorOutcome {
    /// Risk score in `[0, 1]`.
    pub score: f64,
    /// Names of the features that most contributed to the score.
    pub top_features: Vec<String>,
    /// The model version that produced this score.
    pub model_version: String,
    /// Server-side prediction latency in milliseconds.
    pub prediction_time_ms: u64,
}

/// ML scoring collaborator, treated purely as an HTTP predictor
/// (`spec.md` §1 "Out of scope").
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Requests a risk score for `event`.
    ///
    /// # Errors
    ///
    /// Returns [`PredictorError`] on timeout or transport failure; callers
    /// treat either as `score = None` and proceed per the combination
    /// policy (`spec.md` §4.2).
    async fn predict(&self, event: &TransactionEvent) -> Result<PredictorOutcome, PredictorError>;
}

// ============================================================================
// SECTION: Audit & Storage
// ============================================================================

/// Errors returned by an [`AuditStore`].
#[derive(Debug, Error)]
pub enum AuditStoreError {
    /// The backing store is unreachable or returned a transport error.
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
    /// A write was rejected by the storage layer's WORM enforcement.
    #[error("audit log is immutable (WORM): {0}")]
    Immutable(String),
}

/// Events, decisions, the WORM audit log, and SCA challenges
/// (`spec.md` §4.6).
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persists `event` with insert-if-absent semantics keyed by
    /// `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] on unrecoverable write failure. Callers
    /// log and continue (`spec.md` §7): a failed event write must not block
    /// the decision, since the decision is still deterministic.
    async fn store_event(&self, event: &TransactionEvent) -> Result<(), AuditStoreError>;

    /// Persists `decision`, append-only.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] on unrecoverable write failure.
    async fn store_decision(&self, decision: &Decision) -> Result<(), AuditStoreError>;

    /// Looks up a previously persisted decision for idempotent replay.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] when the store cannot be reached.
    async fn get_decision(&self, decision_id: &str) -> Result<Option<Decision>, AuditStoreError>;

    /// Signs and appends one audit log entry.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError::Immutable`] if the storage layer's WORM
    /// trigger rejects the write (it never should, since this is an insert),
    /// or [`AuditStoreError::Unavailable`] on transport failure.
    async fn store_audit_log(
        &self,
        actor: &str,
        action: &str,
        entity: &str,
        entity_id: &str,
        details: Option<serde_json::Value>,
        ip_address: Option<&str>,
    ) -> Result<(), AuditStoreError>;

    /// Creates a pending SCA challenge row (`spec.md` §4.8).
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] on unrecoverable write failure.
    async fn create_sca_challenge(
        &self,
        user_id: &str,
        transaction_id: &str,
        risk_score: f64,
        challenge_type: SCALevel,
    ) -> Result<SCAChallenge, AuditStoreError>;

    /// Reports store readiness for `GET /health`.
    async fn readiness(&self) -> Result<(), AuditStoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Decision-Event Publisher
// ============================================================================

/// Errors returned by a [`Publisher`].
#[derive(Debug, Error)]
pub enum PublishError {
    /// The bus is unreachable or returned a transport error.
    #[error("publish failed: {0}")]
    Failed(String),
}

/// Case queue a `case_event` is routed to (`spec.md` §4.1 step 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseQueue {
    /// High-risk queue for `DENY` decisions.
    HighRisk,
    /// Medium-risk queue for `CHALLENGE` decisions.
    MediumRisk,
}

impl CaseQueue {
    /// The queue name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HighRisk => "high_risk",
            Self::MediumRisk => "medium_risk",
        }
    }

    /// The case priority used on the wire (`DENY` => 2, `CHALLENGE` => 1).
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::HighRisk => 2,
            Self::MediumRisk => 1,
        }
    }
}

/// Fire-and-forget delivery of decision and case events
/// (`spec.md` §4.7).
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes a `decision_events` message.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] on transport failure. Callers log and
    /// swallow; publication failure must never fail the scoring response.
    async fn publish_decision_event(&self, decision: &Decision) -> Result<(), PublishError>;

    /// Publishes a `case_events` message for a non-`ALLOW` decision.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] on transport failure.
    async fn publish_case_event(
        &self,
        decision: &Decision,
        queue: CaseQueue,
    ) -> Result<(), PublishError>;

    /// Reports bus readiness for `GET /health`.
    async fn readiness(&self) -> Result<(), PublishError> {
        Ok(())
    }

    /// Whether this publisher is wired to a live bus, as opposed to a
    /// configuration-disabled no-op (`spec.md` §4.7: "If the bus is disabled
    /// by configuration the publisher is a no-op"). `GET /health` reports a
    /// disabled publisher as `"disabled"` rather than `"unhealthy"`.
    fn is_enabled(&self) -> bool {
        true
    }
}
