// crates/fraud-publisher/src/lib.rs
// ============================================================================
// Crate: fraud-publisher
// Description: Fire-and-forget Kafka publisher for decision and case events.
// Purpose: Notify downstream consumers of a decision without ever blocking or
//          failing the scoring response (`spec.md` section 4.7).
// Dependencies: fraud-core, rdkafka
// ============================================================================

//! Decision/case event publishing for the fraud decision service.
//!
//! This crate implements `fraud_core::interfaces::Publisher` over a single
//! `rdkafka` producer, replacing the upstream broker's generic multi-source,
//! multi-sink dispatch with the one fixed transport the spec names: Kafka,
//! behind an enable/disable switch.

pub mod kafka;
pub mod payload;

pub use kafka::KafkaPublisher;
pub use payload::CaseEventPayload;
pub use payload::DecisionEventPayload;
