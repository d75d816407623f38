// crates/fraud-store-postgres/src/error.rs
// ============================================================================
// Module: Error mapping
// Description: Translates `sqlx::Error` into `fraud_core::interfaces::AuditStoreError`.
// Purpose: Keep the WORM trigger's raised exception distinguishable from an
//          ordinary transport failure at the trait boundary.
// Dependencies: sqlx, fraud-core
// ============================================================================

use fraud_core::interfaces::AuditStoreError;

/// Maps a raw `sqlx::Error` onto the two cases [`AuditStoreError`] exposes.
///
/// A Postgres error raised by the `audit_logs_worm_guard` trigger surfaces as
/// a database error whose message contains `"immutable"`; everything else
/// (connection failure, pool exhaustion, constraint violations unrelated to
/// WORM) is reported as [`AuditStoreError::Unavailable`].
#[must_use]
pub fn map_sqlx_error(err: sqlx::Error) -> AuditStoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.message().contains("immutable") {
            return AuditStoreError::Immutable(db_err.message().to_owned());
        }
    }
    AuditStoreError::Unavailable(err.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_map_to_unavailable() {
        let err = sqlx::Error::PoolTimedOut;
        assert!(matches!(map_sqlx_error(err), AuditStoreError::Unavailable(_)));
    }
}
