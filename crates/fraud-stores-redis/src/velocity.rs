// crates/fraud-stores-redis/src/velocity.rs
// ============================================================================
// Module: Redis velocity tracker
// Description: Sliding 1h/24h transaction-count and 24h amount-sum windows
//              per user, backed by Redis sorted sets.
// Purpose: Feed `velocity_1h`/`velocity_24h`/`amount_sum_24h` into the rule
//          engine and the ML feature set.
// Dependencies: redis, fraud_core
// ============================================================================

//! ## Overview
//! Ported from `VelocityTracker.record_transaction`/`get_velocity` in the
//! original Python decision engine's `app/velocity.py`: three sorted sets
//! per user (`velocity:{user_id}:1h`, `:24h`, `:amount_24h`), each scored by
//! transaction timestamp. A write prunes entries older than the window,
//! adds the current transaction, refreshes the key's TTL, then counts. The
//! amount sum is a second pass over `:amount_24h`'s members, each encoded
//! `"{unique_id}:{amount}"` the way the original embeds the amount in the
//! member string rather than the score (the score is reserved for the
//! timestamp used to prune the window).

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use fraud_core::interfaces::VelocityTracker;
use fraud_core::interfaces::VelocityTrackerError;
use fraud_core::model::VelocityCounters;
use redis::AsyncCommands as _;
use redis::Client;

/// Trailing window, in seconds, for the 1h counter.
const WINDOW_1H_SECS: i64 = 3_600;

/// Trailing window, in seconds, for the 24h counter and amount sum.
const WINDOW_24H_SECS: i64 = 86_400;

/// Extra seconds of key TTL beyond the window, so a quiet user's keys
/// self-expire instead of accumulating forever.
const TTL_GRACE_SECS: i64 = 60;

/// Redis-backed [`VelocityTracker`].
pub struct RedisVelocityTracker {
    client: Client,
}

impl RedisVelocityTracker {
    /// Builds a tracker against `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns [`VelocityTrackerError::Unavailable`] if `redis_url` does not
    /// parse.
    pub fn new(redis_url: &str) -> Result<Self, VelocityTrackerError> {
        let client = Client::open(redis_url).map_err(|err| VelocityTrackerError::Unavailable(err.to_string()))?;
        Ok(Self { client })
    }

    fn key_1h(user_id: &str) -> String {
        format!("velocity:{user_id}:1h")
    }

    fn key_24h(user_id: &str) -> String {
        format!("velocity:{user_id}:24h")
    }

    fn key_amount_24h(user_id: &str) -> String {
        format!("velocity:{user_id}:amount_24h")
    }
}

/// Seconds since the Unix epoch, for use as a sorted-set score.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Sums the embedded amounts out of `"{member_id}:{amount}"` entries,
/// skipping any that don't carry an amount (defensive against a key that
/// predates this field).
fn sum_amounts(entries: &[String]) -> f64 {
    entries
        .iter()
        .filter_map(|entry| entry.rsplit_once(':').and_then(|(_, amount)| amount.parse::<f64>().ok()))
        .sum()
}

#[async_trait]
impl VelocityTracker for RedisVelocityTracker {
    async fn record(&self, user_id: &str, amount: f64) -> Result<VelocityCounters, VelocityTrackerError> {
        let mut conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|err| VelocityTrackerError::Unavailable(err.to_string()))?;

        let now = now_secs();
        let key_1h = Self::key_1h(user_id);
        let key_24h = Self::key_24h(user_id);
        let key_amount = Self::key_amount_24h(user_id);
        let member = format!("{now}:{user_id}");
        let amount_member = format!("{member}:{amount}");

        let mut pipe = redis::pipe();
        pipe.atomic()
            .zrembyscore(&key_1h, 0, now - WINDOW_1H_SECS)
            .ignore()
            .zrembyscore(&key_24h, 0, now - WINDOW_24H_SECS)
            .ignore()
            .zrembyscore(&key_amount, 0, now - WINDOW_24H_SECS)
            .ignore()
            .zadd(&key_1h, &member, now)
            .ignore()
            .zadd(&key_24h, &member, now)
            .ignore()
            .zadd(&key_amount, &amount_member, now)
            .ignore()
            .expire(&key_1h, WINDOW_1H_SECS + TTL_GRACE_SECS)
            .ignore()
            .expire(&key_24h, WINDOW_24H_SECS + TTL_GRACE_SECS)
            .ignore()
            .expire(&key_amount, WINDOW_24H_SECS + TTL_GRACE_SECS)
            .ignore()
            .zcard(&key_1h)
            .zcard(&key_24h);

        let (velocity_1h, velocity_24h): (u64, u64) = pipe
            .query_async(&mut conn)
            .await
            .map_err(|err| VelocityTrackerError::Unavailable(err.to_string()))?;

        let amount_entries: Vec<String> = conn
            .zrange(&key_amount, 0, -1)
            .await
            .map_err(|err| VelocityTrackerError::Unavailable(err.to_string()))?;
        let amount_sum_24h = sum_amounts(&amount_entries);

        tracing::debug!(user_id, velocity_1h, velocity_24h, amount_sum_24h, "velocity recorded");

        Ok(VelocityCounters { velocity_1h, velocity_24h, amount_sum_24h })
    }

    async fn get(&self, user_id: &str) -> Result<VelocityCounters, VelocityTrackerError> {
        let mut conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|err| VelocityTrackerError::Unavailable(err.to_string()))?;

        let now = now_secs();
        let key_1h = Self::key_1h(user_id);
        let key_24h = Self::key_24h(user_id);
        let key_amount = Self::key_amount_24h(user_id);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .zrembyscore(&key_1h, 0, now - WINDOW_1H_SECS)
            .ignore()
            .zrembyscore(&key_24h, 0, now - WINDOW_24H_SECS)
            .ignore()
            .zcard(&key_1h)
            .zcard(&key_24h);

        let (velocity_1h, velocity_24h): (u64, u64) = pipe
            .query_async(&mut conn)
            .await
            .map_err(|err| VelocityTrackerError::Unavailable(err.to_string()))?;

        let amount_entries: Vec<String> = conn
            .zrange(&key_amount, 0, -1)
            .await
            .map_err(|err| VelocityTrackerError::Unavailable(err.to_string()))?;
        let amount_sum_24h = sum_amounts(&amount_entries);

        Ok(VelocityCounters { velocity_1h, velocity_24h, amount_sum_24h })
    }

    async fn readiness(&self) -> Result<(), VelocityTrackerError> {
        let mut conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|err| VelocityTrackerError::Unavailable(err.to_string()))?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|err| VelocityTrackerError::Unavailable(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_user() {
        assert_eq!(RedisVelocityTracker::key_1h("user_1"), "velocity:user_1:1h");
        assert_eq!(RedisVelocityTracker::key_24h("user_1"), "velocity:user_1:24h");
        assert_eq!(RedisVelocityTracker::key_amount_24h("user_1"), "velocity:user_1:amount_24h");
    }

    #[test]
    fn sum_amounts_parses_trailing_amount() {
        let entries = vec!["1700000000:user_1:19.99".to_owned(), "1700000001:user_1:5.01".to_owned()];
        assert!((sum_amounts(&entries) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sum_amounts_skips_malformed_entries() {
        let entries = vec!["no-amount-here".to_owned(), "1700000000:user_1:10.0".to_owned()];
        assert!((sum_amounts(&entries) - 10.0).abs() < f64::EPSILON);
    }
}
