// crates/fraud-store-postgres/src/lib.rs
// ============================================================================
// Crate: fraud-store-postgres
// Description: Postgres-backed `AuditStore`: events, decisions, the WORM
//              audit log, and SCA challenges.
// Purpose: Give the orchestrator durable, append-only storage for every
//          record `spec.md` section 4.6 requires it to keep.
// Dependencies: fraud-core, sqlx
// ============================================================================

//! Durable storage for the fraud decision service.
//!
//! Ported from the original Python decision engine's `app/storage.py` and
//! `app/audit.py`. The WORM guarantee lives in the schema (`migrations/`),
//! not in application discipline: `audit_logs` carries a trigger that rejects
//! `UPDATE`/`DELETE` outright, so a bug here cannot silently rewrite history.

pub mod error;
pub mod store;

pub use error::map_sqlx_error;
pub use store::PostgresAuditStore;

/// Embedded schema migrations, run via [`PostgresAuditStore::migrate`].
pub(crate) static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
