// crates/fraud-stores-redis/src/lib.rs
// ============================================================================
// Crate: fraud-stores-redis
// Description: Redis-backed idempotency store, velocity tracker, and
//              deny/allow list checker.
// Purpose: Give the orchestrator fast, ephemeral state without coupling it
//          to Redis directly.
// Dependencies: fraud-core, redis
// ============================================================================

//! Redis collaborators for the fraud decision service.
//!
//! Ported from the original Python decision engine's `app/idempotency.py`
//! and `app/velocity.py`, and the rules service's `app/lists_checker.py`.
//! Every public type here fails open by design (`spec.md` §4.5/§4.4): a
//! Redis outage degrades deduplication or velocity accuracy, it never turns
//! into a `500`.

pub mod idempotency;
pub mod lists;
pub mod velocity;

pub use idempotency::RedisIdempotencyStore;
pub use lists::RedisListChecker;
pub use velocity::RedisVelocityTracker;
