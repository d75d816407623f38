// crates/fraud-publisher/src/kafka.rs
// ============================================================================
// Module: Kafka publisher
// Description: Fire-and-forget `Publisher` over a single `rdkafka`
//              `FutureProducer`, publishing to `decision_events`/`case_events`.
// Purpose: Notify downstream consumers of a decision without ever blocking or
//          failing the scoring response (`spec.md` section 4.7).
// Dependencies: fraud-core, rdkafka
// ============================================================================

//! ## Overview
//! Ported from the original decision engine's `kafka_producer.py`: one
//! producer, two fixed topics, and a `KAFKA_ENABLE` switch that turns
//! publishing into a no-op rather than standing up a producer at all. Unlike
//! the Python original this uses `rdkafka`'s `FutureProducer`, whose `send`
//! future is awaited with a short timeout rather than `send_and_wait`'s
//! unbounded wait.

use std::time::Duration;

use async_trait::async_trait;
use fraud_core::interfaces::CaseQueue;
use fraud_core::interfaces::PublishError;
use fraud_core::interfaces::Publisher;
use fraud_core::model::Decision;
use fraud_config::KafkaConfig;
use rdkafka::ClientConfig;
use rdkafka::producer::FutureProducer;
use rdkafka::producer::FutureRecord;
use rdkafka::util::Timeout;

use crate::payload::CaseEventPayload;
use crate::payload::DecisionEventPayload;

/// `decision_events` topic name.
const DECISION_EVENTS_TOPIC: &str = "decision_events";
/// `case_events` topic name.
const CASE_EVENTS_TOPIC: &str = "case_events";
/// How long one publish attempt is allowed to block before giving up.
const SEND_TIMEOUT: Duration = Duration::from_millis(500);

/// A [`Publisher`] backed by `rdkafka`, or a no-op when Kafka publishing is
/// disabled in configuration.
pub struct KafkaPublisher {
    /// `None` when `KafkaConfig::enabled` is `false`.
    producer: Option<FutureProducer>,
}

impl KafkaPublisher {
    /// Builds a publisher from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Failed`] if the producer cannot be
    /// constructed while publishing is enabled.
    pub fn new(config: &KafkaConfig) -> Result<Self, PublishError> {
        if !config.enabled {
            tracing::info!("Kafka publishing disabled");
            return Ok(Self { producer: None });
        }
        let producer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("compression.type", "gzip")
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|err| PublishError::Failed(err.to_string()))?;
        Ok(Self { producer: Some(producer) })
    }

    /// Sends one JSON-encoded, keyed record to `topic`, swallowing (but
    /// logging) delivery failures at the call site per [`Publisher`]'s
    /// contract.
    async fn send(&self, topic: &str, key: &str, payload: &(impl serde::Serialize + Sync)) -> Result<(), PublishError> {
        let Some(producer) = &self.producer else {
            tracing::debug!(topic, "Kafka publishing disabled, skipping event");
            return Ok(());
        };
        let body = serde_json::to_vec(payload).map_err(|err| PublishError::Failed(err.to_string()))?;
        let record = FutureRecord::to(topic).key(key).payload(&body);
        producer
            .send(record, Timeout::After(SEND_TIMEOUT))
            .await
            .map_err(|(err, _message)| PublishError::Failed(err.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish_decision_event(&self, decision: &Decision) -> Result<(), PublishError> {
        let payload = DecisionEventPayload::from_decision(decision);
        self.send(DECISION_EVENTS_TOPIC, &decision.event_id, &payload).await
    }

    async fn publish_case_event(&self, decision: &Decision, queue: CaseQueue) -> Result<(), PublishError> {
        let payload = CaseEventPayload::from_decision(decision, queue);
        self.send(CASE_EVENTS_TOPIC, &decision.event_id, &payload).await
    }

    async fn readiness(&self) -> Result<(), PublishError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.producer.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]
mod tests {
    use fraud_core::model::DecisionType;
    use fraud_core::model::Thresholds;
    use time::OffsetDateTime;

    use super::*;

    fn disabled_config() -> KafkaConfig {
        KafkaConfig { enabled: false, bootstrap_servers: "localhost:9092".to_owned() }
    }

    fn decision() -> Decision {
        Decision {
            decision_id: "dec_000000000001".to_owned(),
            event_id: "evt_1".to_owned(),
            tenant_id: "default".to_owned(),
            decision: DecisionType::Allow,
            score: Some(0.1),
            reasons: vec![],
            rule_hits: vec![],
            latency_ms: 10,
            model_version: "v1".to_owned(),
            thresholds: Thresholds { low: 0.50, high: 0.70 },
            created_at: OffsetDateTime::UNIX_EPOCH,
            requires_2fa: false,
        }
    }

    #[tokio::test]
    async fn disabled_publisher_is_a_no_op() {
        let publisher = KafkaPublisher::new(&disabled_config()).expect("construct publisher");
        publisher.publish_decision_event(&decision()).await.expect("no-op publish succeeds");
        publisher.publish_case_event(&decision(), CaseQueue::MediumRisk).await.expect("no-op publish succeeds");
    }

    #[tokio::test]
    async fn readiness_is_always_ok() {
        let publisher = KafkaPublisher::new(&disabled_config()).expect("construct publisher");
        publisher.readiness().await.expect("readiness always succeeds");
    }

    #[test]
    fn disabled_config_reports_disabled() {
        let publisher = KafkaPublisher::new(&disabled_config()).expect("construct publisher");
        assert!(!publisher.is_enabled());
    }
}
