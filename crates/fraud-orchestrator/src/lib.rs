// crates/fraud-orchestrator/src/lib.rs
// ============================================================================
// Crate: fraud-orchestrator
// Description: The decision orchestrator: dedupe, ML/rules fan-out under
//              independent deadlines, combination policy, SCA resolution,
//              persistence, and downstream publication.
// Purpose: Drive `POST /v1/score` end to end (`spec.md` §4.1) without
//          coupling the scoring algorithm to any concrete Redis/Postgres/
//          Kafka/HTTP implementation.
// Dependencies: fraud-core, fraud-config, rand, thiserror, time, tokio,
//               tracing
// ============================================================================

//! ## Overview
//!
//! `Orchestrator` is generic over the six collaborator traits defined in
//! `fraud_core::interfaces`, rather than boxing them behind `dyn Trait` the
//! way `decision-gate-mcp::server`'s tool registry does — this service has a
//! fixed, known-at-compile-time set of six collaborators (no plugin
//! registration), so static dispatch avoids a vtable indirection on every
//! call in the sub-100ms hot path. Each collaborator is still wrapped in an
//! `Arc` so it can be cheaply cloned into the background task spawned at the
//! tail of [`Orchestrator::score`] (`spec.md` §9, "Background vs. hot path").
//!
//! [`Orchestrator::score`] implements `spec.md` §4.1's nine steps:
//!
//! 1. Generate a candidate decision id and attempt to claim the request's
//!    idempotency fingerprint; a losing claim replays the winning decision.
//! 2. Persist the raw event (best-effort).
//! 3. Record this transaction against the user's velocity counters.
//! 4. Build the Rules-boundary context from the event and those counters.
//! 5. Fan out to the ML predictor and rule engine concurrently, each under
//!    its own timeout.
//! 6. Apply deny/allow-list overrides on top of the rule engine's verdict.
//! 7. Combine score, criticality, and 2FA state via `fraud_core::policy`.
//! 8. Resolve an SCA challenge whenever the score clears `0.3`, independent
//!    of the final decision.
//! 9. Persist the decision, sign an audit log entry, and publish downstream
//!    events — inline if the request still has budget, backgrounded
//!    otherwise.

pub mod context;
pub mod deadline;
pub mod error;
pub mod health;

use std::sync::Arc;
use std::time::Duration;

use fraud_config::Degradation;
use fraud_config::Timeouts;
use fraud_core::interfaces::AuditStore;
use fraud_core::interfaces::CaseQueue;
use fraud_core::interfaces::IdempotencyStore;
use fraud_core::interfaces::Predictor;
use fraud_core::interfaces::PredictorOutcome;
use fraud_core::interfaces::Publisher;
use fraud_core::interfaces::RuleEngine;
use fraud_core::interfaces::RuleEvaluationContext;
use fraud_core::interfaces::RuleEvaluationOutcome;
use fraud_core::interfaces::VelocityTracker;
use fraud_core::model::Decision;
use fraud_core::model::DecisionType;
use fraud_core::model::ScoreResponse;
use fraud_core::model::Thresholds;
use fraud_core::model::TransactionEvent;
use fraud_core::model::VelocityCounters;
use fraud_core::policy;
use fraud_core::policy::PolicyInput;
use fraud_core::sca::determine_sca_level;
use time::OffsetDateTime;

use crate::deadline::Deadline;
use crate::error::OrchestratorError;
use crate::health::DependencyState;
use crate::health::HealthReport;

/// Tunables the orchestrator needs that are not collaborator-shaped: risk
/// thresholds, per-call/total timeouts, idempotency TTL, the velocity
/// degradation policy, and the ML model version quoted when the predictor
/// call itself never returned one.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Risk-score thresholds (`spec.md` §4.2).
    pub thresholds: Thresholds,
    /// Per-call and total timeout budgets (`spec.md` §4.1 step 5, §5).
    pub timeouts: Timeouts,
    /// How long an idempotency claim is held.
    pub idempotency_ttl: Duration,
    /// Fail-open vs. fail-closed behaviour when the velocity tracker is
    /// unreachable (`spec.md` §9).
    pub velocity_degradation: Degradation,
    /// Model version quoted on a decision whose predictor call failed.
    pub model_version: String,
}

/// Drives one request through dedupe, fan-out, policy, and publication.
///
/// Generic over the six collaborator traits so a test suite can substitute
/// in-memory fakes for all of them without a `dyn` vtable on the hot path.
pub struct Orchestrator<IS, VT, RE, PR, AU, PB>
where
    IS: IdempotencyStore,
    VT: VelocityTracker,
    RE: RuleEngine,
    PR: Predictor,
    AU: AuditStore,
    PB: Publisher,
{
    /// Idempotency fingerprint claim store.
    idempotency: Arc<IS>,
    /// Sliding-window velocity tracker.
    velocity: Arc<VT>,
    /// Rule/list evaluation engine.
    rules: Arc<RE>,
    /// ML risk-scoring collaborator.
    predictor: Arc<PR>,
    /// Durable event/decision/audit-log/SCA-challenge store.
    audit: Arc<AU>,
    /// Downstream decision/case event publisher.
    publisher: Arc<PB>,
    /// Tunables not shaped like a collaborator.
    config: OrchestratorConfig,
}

impl<IS, VT, RE, PR, AU, PB> Orchestrator<IS, VT, RE, PR, AU, PB>
where
    IS: IdempotencyStore + 'static,
    VT: VelocityTracker + 'static,
    RE: RuleEngine + 'static,
    PR: Predictor + 'static,
    AU: AuditStore + 'static,
    PB: Publisher + 'static,
{
    /// Wires an orchestrator over its six collaborators and tunables.
    pub fn new(
        idempotency: Arc<IS>,
        velocity: Arc<VT>,
        rules: Arc<RE>,
        predictor: Arc<PR>,
        audit: Arc<AU>,
        publisher: Arc<PB>,
        config: OrchestratorConfig,
    ) -> Self {
        Self { idempotency, velocity, rules, predictor, audit, publisher, config }
    }

    /// Scores one already-validated transaction end to end.
    ///
    /// `event` must already have passed [`TransactionEvent::validate`]; this
    /// method assumes that precondition and never re-checks it (`spec.md`
    /// §3 notes validation happens at the HTTP boundary so malformed JSON
    /// can still produce a structured `400` rather than fail to parse).
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] only when the idempotency store reports
    /// a winning claim for another request but that request's decision
    /// cannot be retrieved or has not yet been persisted. Every other
    /// collaborator failure degrades in place per `spec.md` §7/§9 and is
    /// folded into the returned [`ScoreResponse`] instead of an error.
    #[tracing::instrument(skip_all, fields(event_id = %event.event_id, tenant_id = %event.tenant_id))]
    pub async fn score(&self, event: &TransactionEvent) -> Result<ScoreResponse, OrchestratorError> {
        let deadline = Deadline::start(self.config.timeouts.total());
        let fingerprint = event.fingerprint();
        let candidate_id = generate_decision_id();

        match self.idempotency.check_and_set(&fingerprint, &candidate_id, self.config.idempotency_ttl).await {
            Ok(Some(existing_id)) => return self.replay(existing_id).await,
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "idempotency store unavailable, proceeding without deduplication");
            }
        }

        if let Err(err) = self.audit.store_event(event).await {
            tracing::warn!(error = %err, "failed to persist transaction event");
        }

        let velocity = match self.velocity.record(&event.card.user_id, event.amount).await {
            Ok(counters) => counters,
            Err(err) => match self.config.velocity_degradation {
                Degradation::FailOpen => {
                    tracing::warn!(error = %err, "velocity tracker unavailable, proceeding with zeroed counters");
                    VelocityCounters::default()
                }
                Degradation::FailClosed => {
                    tracing::warn!(error = %err, "velocity tracker unavailable, forcing a conservative decision");
                    return Ok(self
                        .finish(
                            event,
                            candidate_id,
                            deadline,
                            DecisionType::Challenge,
                            None,
                            vec!["Velocity tracking unavailable; step-up required as a precaution".to_owned()],
                            Vec::new(),
                            true,
                            self.config.model_version.clone(),
                            None,
                        )
                        .await);
                }
            },
        };

        let rule_context = context::rule_evaluation_context(event, velocity);
        let (predicted, ruled) = self.fan_out(event, &rule_context).await;

        let is_critical = ruled.is_critical || ruled.has_deny_list_match();
        let rule_hits = ruled.rule_hit_names();
        let top_features = predicted.as_ref().map(|outcome| outcome.top_features.clone()).unwrap_or_default();
        let model_version = predicted
            .as_ref()
            .map(|outcome| outcome.model_version.clone())
            .unwrap_or_else(|| self.config.model_version.clone());
        let score = predicted.as_ref().map(|outcome| outcome.score);

        let outcome = if ruled.has_allow_override() {
            allow_override_outcome()
        } else {
            policy::decide(PolicyInput {
                score,
                rule_hits: &rule_hits,
                is_critical,
                has_initial_2fa: event.has_initial_2fa,
                thresholds: &self.config.thresholds,
                top_features: &top_features,
            })
        };

        let top_features = (!top_features.is_empty()).then_some(top_features);

        Ok(self
            .finish(
                event,
                candidate_id,
                deadline,
                outcome.decision,
                score,
                outcome.reasons,
                rule_hits,
                outcome.requires_2fa,
                model_version,
                top_features,
            )
            .await)
    }

    /// Runs the ML predictor and rule engine concurrently, each bounded by
    /// its own configured timeout, degrading independently on failure
    /// (`spec.md` §4.1 step 5).
    async fn fan_out(
        &self,
        event: &TransactionEvent,
        rule_context: &RuleEvaluationContext,
    ) -> (Option<PredictorOutcome>, RuleEvaluationOutcome) {
        let model_budget = self.config.timeouts.model();
        let rules_budget = self.config.timeouts.rules();

        let predict = async {
            match tokio::time::timeout(model_budget, self.predictor.predict(event)).await {
                Ok(Ok(outcome)) => Some(outcome),
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "ML predictor call failed");
                    None
                }
                Err(_elapsed) => {
                    tracing::warn!(?model_budget, "ML predictor call timed out");
                    None
                }
            }
        };

        let evaluate = async {
            match tokio::time::timeout(rules_budget, self.rules.evaluate(rule_context, true)).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "rule engine evaluation failed");
                    empty_rule_outcome()
                }
                Err(_elapsed) => {
                    tracing::warn!(?rules_budget, "rule engine evaluation timed out");
                    empty_rule_outcome()
                }
            }
        };

        tokio::join!(predict, evaluate)
    }

    /// Resolves an idempotent replay: the fingerprint was already claimed by
    /// another request, so this request returns that decision instead of
    /// producing a new one.
    async fn replay(&self, existing_id: String) -> Result<ScoreResponse, OrchestratorError> {
        match self.audit.get_decision(&existing_id).await {
            Ok(Some(decision)) => Ok(response_from_decision(decision)),
            Ok(None) => Err(OrchestratorError::ReplayPending { decision_id: existing_id }),
            Err(source) => Err(OrchestratorError::ReplayLookupFailed { decision_id: existing_id, source }),
        }
    }

    /// Resolves the SCA challenge (if required), assembles the final
    /// [`Decision`], and persists/publishes it, backgrounding that work once
    /// the request is within [`deadline::BACKGROUND_MARGIN`] of its total
    /// budget.
    #[allow(clippy::too_many_arguments, reason = "Each parameter is one distinct decision component; a wrapper struct would just rename this problem.")]
    async fn finish(
        &self,
        event: &TransactionEvent,
        decision_id: String,
        deadline: Deadline,
        decision_type: DecisionType,
        score: Option<f64>,
        reasons: Vec<String>,
        rule_hits: Vec<String>,
        requires_2fa: bool,
        model_version: String,
        top_features: Option<Vec<String>>,
    ) -> ScoreResponse {
        // A challenge is created whenever the score clears 0.3, independent of
        // the final decision (`spec.md` §9 / `DESIGN.md` Open Question 2) —
        // not whenever `requires_2fa` is set, which a missing score always
        // forces regardless of score.
        let sca_challenge = if let Some(score) = score.filter(|&s| s > 0.3) {
            let level = determine_sca_level(score, event.amount);
            match self.audit.create_sca_challenge(&event.card.user_id, &event.event_id, score, level).await {
                Ok(challenge) => Some(challenge),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to persist SCA challenge");
                    None
                }
            }
        } else {
            None
        };

        let decision = Decision {
            decision_id: decision_id.clone(),
            event_id: event.event_id.clone(),
            tenant_id: event.tenant_id.clone(),
            decision: decision_type,
            score,
            reasons: reasons.clone(),
            rule_hits: rule_hits.clone(),
            latency_ms: deadline.elapsed_ms(),
            model_version: model_version.clone(),
            thresholds: self.config.thresholds,
            created_at: OffsetDateTime::now_utc(),
            requires_2fa,
        };

        self.persist_and_publish(decision, event.context.ip.clone(), deadline).await;

        ScoreResponse {
            event_id: event.event_id.clone(),
            decision_id,
            decision: decision_type,
            score,
            reasons,
            rule_hits,
            latency_ms: deadline.elapsed_ms(),
            model_version,
            requires_2fa,
            top_features,
            sca_challenge,
        }
    }

    /// Persists `decision`, signs an audit log entry, and publishes the
    /// downstream decision/case events. Always runs as a spawned task so the
    /// background-vs-hot-path split is a single code path: the caller awaits
    /// the task only when the deadline still has more than
    /// [`deadline::BACKGROUND_MARGIN`] remaining (`spec.md` §9).
    async fn persist_and_publish(&self, decision: Decision, ip_address: Option<String>, deadline: Deadline) {
        let audit = Arc::clone(&self.audit);
        let publisher = Arc::clone(&self.publisher);
        let handle = tokio::spawn(async move {
            if let Err(err) = audit.store_decision(&decision).await {
                tracing::warn!(error = %err, decision_id = %decision.decision_id, "failed to persist decision");
            }

            let details = serde_json::json!({
                "decision": decision.decision.to_string(),
                "score": decision.score,
                "requires_2fa": decision.requires_2fa,
            });
            if let Err(err) = audit
                .store_audit_log(
                    "fraud-orchestrator",
                    "decision.create",
                    "decision",
                    &decision.decision_id,
                    Some(details),
                    ip_address.as_deref(),
                )
                .await
            {
                tracing::warn!(error = %err, decision_id = %decision.decision_id, "failed to append audit log entry");
            }

            if let Err(err) = publisher.publish_decision_event(&decision).await {
                tracing::warn!(error = %err, decision_id = %decision.decision_id, "failed to publish decision event");
            }

            if decision.decision != DecisionType::Allow {
                let queue = match decision.decision {
                    DecisionType::Deny => CaseQueue::HighRisk,
                    DecisionType::Challenge | DecisionType::Allow => CaseQueue::MediumRisk,
                };
                if let Err(err) = publisher.publish_case_event(&decision, queue).await {
                    tracing::warn!(error = %err, decision_id = %decision.decision_id, "failed to publish case event");
                }
            }
        });

        if deadline.is_near_exhaustion(deadline::BACKGROUND_MARGIN) {
            tracing::debug!("deadline near exhaustion, backgrounding persistence and publish");
            return;
        }
        if let Err(err) = handle.await {
            tracing::warn!(error = %err, "persistence/publish task panicked");
        }
    }

    /// Polls every collaborator's readiness concurrently for `GET /health`.
    pub async fn health(&self) -> HealthReport {
        let (idempotency, velocity, rules, audit, publisher) = tokio::join!(
            self.idempotency.readiness(),
            self.velocity.readiness(),
            self.rules.readiness(),
            self.audit.readiness(),
            self.publisher.readiness(),
        );

        let publisher_state = if self.publisher.is_enabled() {
            DependencyState::from_result(publisher)
        } else {
            DependencyState::Disabled
        };

        HealthReport::from_dependencies(
            DependencyState::from_result(idempotency),
            DependencyState::from_result(velocity),
            DependencyState::from_result(rules),
            DependencyState::from_result(audit),
            publisher_state,
        )
    }
}

/// Builds the fixed `ALLOW` outcome produced when an allow-list match
/// overrides the combination policy entirely (`spec.md` §4.3: deny-list wins
/// over allow-list, and an allow-list hit with no deny match short-circuits
/// straight to `ALLOW`).
fn allow_override_outcome() -> policy::PolicyOutcome {
    policy::PolicyOutcome { decision: DecisionType::Allow, reasons: vec!["Allow-list match".to_owned()], requires_2fa: false }
}

/// The neutral [`RuleEvaluationOutcome`] used when the rule engine call
/// itself failed or timed out: no matches, not critical, no list hits.
fn empty_rule_outcome() -> RuleEvaluationOutcome {
    RuleEvaluationOutcome { matched_rules: Vec::new(), is_critical: false, list_matches: Vec::new(), evaluation_time_ms: 0 }
}

/// Reconstructs a [`ScoreResponse`] from a previously persisted [`Decision`]
/// for idempotent replay. `top_features` and `sca_challenge` are not part of
/// [`Decision`]'s durable shape, so a replayed response never repeats them.
fn response_from_decision(decision: Decision) -> ScoreResponse {
    ScoreResponse {
        event_id: decision.event_id,
        decision_id: decision.decision_id,
        decision: decision.decision,
        score: decision.score,
        reasons: decision.reasons,
        rule_hits: decision.rule_hits,
        latency_ms: decision.latency_ms,
        model_version: decision.model_version,
        requires_2fa: decision.requires_2fa,
        top_features: None,
        sca_challenge: None,
    }
}

/// Generates a decision identifier: `"dec_"` followed by 12 lowercase hex
/// characters (`spec.md` §3).
fn generate_decision_id() -> String {
    let bytes: [u8; 6] = rand::random();
    let mut hex = String::with_capacity(12);
    for byte in bytes {
        hex.push_str(&format!("{byte:02x}"));
    }
    format!("dec_{hex}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn generated_decision_ids_have_the_expected_shape() {
        let id = generate_decision_id();
        assert!(id.starts_with("dec_"));
        assert_eq!(id.len(), 16);
        assert!(id["dec_".len()..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn generated_decision_ids_are_not_trivially_repeated() {
        let a = generate_decision_id();
        let b = generate_decision_id();
        assert_ne!(a, b);
    }
}
