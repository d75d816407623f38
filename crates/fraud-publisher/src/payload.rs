// crates/fraud-publisher/src/payload.rs
// ============================================================================
// Module: Bus payload shapes
// Description: Wire shapes for `decision_events` and `case_events` messages.
// Purpose: Pin the exact JSON produced for each topic (`spec.md` section 6).
// Dependencies: fraud-core, serde_json
// ============================================================================

//! ## Overview
//! Mirrors the original Kafka producer's `publish_decision_event`/
//! `publish_case_event` payload dictionaries, with `timestamp` populated from
//! the decision's `created_at` rather than left for Kafka to stamp.

use fraud_core::interfaces::CaseQueue;
use fraud_core::model::Decision;
use serde::Serialize;

/// Message published to `decision_events`, keyed by `event_id`.
#[derive(Debug, Serialize)]
pub struct DecisionEventPayload {
    /// The triggering event's identifier.
    pub event_id: String,
    /// The decision's identifier.
    pub decision_id: String,
    /// Terminal outcome, as its display string (`"ALLOW"`/`"CHALLENGE"`/`"DENY"`).
    pub decision: String,
    /// ML risk score, if one was produced.
    pub score: Option<f64>,
    /// Tenant identifier.
    pub tenant_id: String,
    /// Decision creation time, RFC 3339.
    pub timestamp: String,
    /// Reserved for caller-supplied context; always empty today, matching the
    /// original producer's `metadata or {}` default.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl DecisionEventPayload {
    /// Builds the `decision_events` payload for `decision`.
    #[must_use]
    pub fn from_decision(decision: &Decision) -> Self {
        Self {
            event_id: decision.event_id.clone(),
            decision_id: decision.decision_id.clone(),
            decision: decision.decision.to_string(),
            score: decision.score,
            tenant_id: decision.tenant_id.clone(),
            timestamp: decision
                .created_at
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| decision.created_at.to_string()),
            metadata: serde_json::Map::new(),
        }
    }
}

/// Message published to `case_events`, keyed by `event_id`.
#[derive(Debug, Serialize)]
pub struct CaseEventPayload {
    /// The triggering event's identifier.
    pub event_id: String,
    /// The decision's identifier.
    pub decision_id: String,
    /// Terminal outcome, as its display string.
    pub decision: String,
    /// ML risk score, if one was produced.
    pub score: Option<f64>,
    /// Case priority (`DENY` => 2, `CHALLENGE` => 1).
    pub priority: u8,
    /// Queue name the case is routed to.
    pub queue: String,
    /// Tenant identifier.
    pub tenant_id: String,
    /// Decision creation time, RFC 3339.
    pub timestamp: String,
}

impl CaseEventPayload {
    /// Builds the `case_events` payload for `decision`, routed to `queue`.
    #[must_use]
    pub fn from_decision(decision: &Decision, queue: CaseQueue) -> Self {
        Self {
            event_id: decision.event_id.clone(),
            decision_id: decision.decision_id.clone(),
            decision: decision.decision.to_string(),
            score: decision.score,
            priority: queue.priority(),
            queue: queue.as_str().to_owned(),
            tenant_id: decision.tenant_id.clone(),
            timestamp: decision
                .created_at
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| decision.created_at.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]
mod tests {
    use fraud_core::model::DecisionType;
    use fraud_core::model::Thresholds;
    use time::OffsetDateTime;

    use super::*;

    fn decision() -> Decision {
        Decision {
            decision_id: "dec_000000000001".to_owned(),
            event_id: "evt_1".to_owned(),
            tenant_id: "default".to_owned(),
            decision: DecisionType::Deny,
            score: Some(0.91),
            reasons: vec!["rule 'velocity_spike' matched".to_owned()],
            rule_hits: vec!["velocity_spike".to_owned()],
            latency_ms: 42,
            model_version: "v1".to_owned(),
            thresholds: Thresholds { low: 0.50, high: 0.70 },
            created_at: OffsetDateTime::UNIX_EPOCH,
            requires_2fa: false,
        }
    }

    #[test]
    fn decision_event_payload_mirrors_the_decision() {
        let payload = DecisionEventPayload::from_decision(&decision());
        assert_eq!(payload.decision, "DENY");
        assert_eq!(payload.score, Some(0.91));
        assert_eq!(payload.timestamp, "1970-01-01T00:00:00Z");
    }

    #[test]
    fn case_event_payload_carries_queue_priority() {
        let payload = CaseEventPayload::from_decision(&decision(), CaseQueue::HighRisk);
        assert_eq!(payload.queue, "high_risk");
        assert_eq!(payload.priority, 2);
    }
}
