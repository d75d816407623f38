// crates/fraud-rules/src/lib.rs
// ============================================================================
// Crate: fraud-rules
// Description: In-process rule engine over rule-dsl, backed by a
//              TTL-refreshed Postgres rule cache and an optional Redis
//              deny/allow list checker.
// Purpose: Collapse the original decision-engine/rules-service split into
//          a single in-process Rules boundary (`spec.md` section 4.3).
// Dependencies: fraud-core, rule-dsl, fraud-stores-redis, sqlx
// ============================================================================

//! Rule evaluation for the fraud decision service.
//!
//! This crate implements `fraud_core::interfaces::RuleEngine` directly
//! against `rule-dsl`'s parser/evaluator, rather than calling out to an
//! HTTP rules service: `spec.md` describes the Rules boundary as a
//! collaborator the orchestrator calls, but says nothing requires it to run
//! out of process, and folding it in removes a network hop from the
//! sub-100ms budget (`spec.md` section 5). See `DESIGN.md`'s Open Question
//! decisions for the full rationale.

pub mod cache;
pub mod context;

pub use cache::PostgresRuleCache;
pub use context::DslContext;
