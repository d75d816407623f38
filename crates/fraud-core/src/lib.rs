// crates/fraud-core/src/lib.rs
// ============================================================================
// Module: Fraud Core
// Description: Domain model, store/service interfaces, combination policy,
//              SCA level resolution, and audit hashing for the fraud decision
//              core.
// Purpose: Give every other crate in the workspace one shared, dependency-free
//          vocabulary for transactions, decisions, rules, and audit records.
// Dependencies: serde, serde_json, bigdecimal, sha2, hmac, time, thiserror
// ============================================================================

//! ## Overview
//!
//! `fraud-core` has no knowledge of Redis, Postgres, Kafka, or HTTP. It
//! defines:
//!
//! - [`model`] — the wire/storage data model (`TransactionEvent`, `Decision`,
//!   `Rule`, `AuditLogEntry`, `VelocityCounters`, `IdempotencyRecord`,
//!   `SCAChallenge`).
//! - [`interfaces`] — the async traits every store/service implements
//!   (`IdempotencyStore`, `VelocityTracker`, `RuleEngine`, `Predictor`,
//!   `AuditStore`, `Publisher`), each with its own error enum.
//! - [`policy`] — the pure combination function `policy::decide`.
//! - [`sca`] — the SCA level decision table.
//! - [`hashing`] — canonical JSON rendering, HMAC-SHA256 signing/verification,
//!   and the event integrity hash.
//!
//! Everything here is synchronous and side-effect free except the traits
//! themselves, which are `async_trait` contracts implemented elsewhere in the
//! workspace (`fraud-stores-redis`, `fraud-store-postgres`, `fraud-providers`,
//! `fraud-publisher`).

pub mod hashing;
pub mod interfaces;
pub mod model;
pub mod policy;
pub mod sca;

pub use interfaces::AuditStore;
pub use interfaces::AuditStoreError;
pub use interfaces::IdempotencyStore;
pub use interfaces::IdempotencyStoreError;
pub use interfaces::Predictor;
pub use interfaces::PredictorError;
pub use interfaces::Publisher;
pub use interfaces::PublishError;
pub use interfaces::RuleEngine;
pub use interfaces::RuleEngineError;
pub use interfaces::VelocityTracker;
pub use interfaces::VelocityTrackerError;
pub use model::AuditLogEntry;
pub use model::Card;
pub use model::CardType;
pub use model::Channel;
pub use model::Decision;
pub use model::DecisionType;
pub use model::IdempotencyRecord;
pub use model::Merchant;
pub use model::Rule;
pub use model::RuleAction;
pub use model::RuleMatch;
pub use model::SCAChallenge;
pub use model::SCAStatus;
pub use model::ScoreResponse;
pub use model::Thresholds;
pub use model::TransactionContext;
pub use model::TransactionEvent;
pub use model::VelocityCounters;
pub use sca::SCALevel;
