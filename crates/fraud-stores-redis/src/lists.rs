// crates/fraud-stores-redis/src/lists.rs
// ============================================================================
// Module: Redis deny/allow list checker
// Description: `sismember` checks against `deny_list:{field}`/
//              `allow_list:{field}` Redis sets for a fixed set of context
//              fields.
// Purpose: Give the rule engine list-based overrides independent of the DSL.
// Dependencies: redis, fraud_core
// ============================================================================

//! ## Overview
//! Ported from `ListsChecker.check_all_lists` in the original rules
//! service's `app/lists_checker.py`. `check_fields` is fixed, matching
//! `spec.md` §4.3 "List checks": `user_id`, `ip_address`, `device_id`,
//! `merchant_id`, `geo`. Deny and allow checks run independently; precedence
//! between them (deny wins) is resolved by the caller via
//! [`fraud_core::interfaces::RuleEvaluationOutcome::has_deny_list_match`]/
//! `has_allow_override`, not here.

use fraud_core::interfaces::ListKind;
use fraud_core::interfaces::ListMatch;
use fraud_core::interfaces::RuleEngineError;
use fraud_core::interfaces::RuleEvaluationContext;
use redis::AsyncCommands as _;
use redis::Client;

/// The fixed set of context fields checked against deny/allow lists, in
/// check order.
const CHECK_FIELDS: &[&str] = &["user_id", "ip_address", "device_id", "merchant_id", "geo"];

/// Redis-backed deny/allow list checker.
pub struct RedisListChecker {
    client: Client,
}

impl RedisListChecker {
    /// Builds a checker against `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::Unavailable`] if `redis_url` does not
    /// parse.
    pub fn new(redis_url: &str) -> Result<Self, RuleEngineError> {
        let client = Client::open(redis_url).map_err(|err| RuleEngineError::Unavailable(err.to_string()))?;
        Ok(Self { client })
    }

    /// Reads the field values from `context` in [`CHECK_FIELDS`] order,
    /// skipping fields the context doesn't carry a value for.
    fn field_values(context: &RuleEvaluationContext) -> Vec<(&'static str, String)> {
        let mut values = Vec::with_capacity(CHECK_FIELDS.len());
        values.push(("user_id", context.user_id.clone()));
        if let Some(ip) = &context.ip_address {
            values.push(("ip_address", ip.clone()));
        }
        if let Some(device_id) = &context.device_id {
            values.push(("device_id", device_id.clone()));
        }
        values.push(("merchant_id", context.merchant_id.clone()));
        values.push(("geo", context.geo.clone()));
        values.retain(|(_, value)| !value.is_empty());
        values
    }

    /// Checks `context`'s fields against both deny and allow lists,
    /// returning `(deny_matches, allow_matches)`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::Unavailable`] if Redis cannot be reached.
    pub async fn check_all(
        &self,
        context: &RuleEvaluationContext,
    ) -> Result<(Vec<ListMatch>, Vec<ListMatch>), RuleEngineError> {
        let mut conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|err| RuleEngineError::Unavailable(err.to_string()))?;

        let fields = Self::field_values(context);
        let mut deny_matches = Vec::new();
        let mut allow_matches = Vec::new();

        for (field, value) in &fields {
            let deny_key = format!("deny_list:{field}");
            let is_denied: bool = conn
                .sismember(&deny_key, value)
                .await
                .map_err(|err| RuleEngineError::Unavailable(err.to_string()))?;
            if is_denied {
                deny_matches.push(ListMatch {
                    list_type: ListKind::Deny,
                    list_name: deny_key,
                    matched_value: value.clone(),
                    field: (*field).to_owned(),
                    reason: format!("{field} '{value}' is on deny list"),
                });
            }

            let allow_key = format!("allow_list:{field}");
            let is_allowed: bool = conn
                .sismember(&allow_key, value)
                .await
                .map_err(|err| RuleEngineError::Unavailable(err.to_string()))?;
            if is_allowed {
                allow_matches.push(ListMatch {
                    list_type: ListKind::Allow,
                    list_name: allow_key,
                    matched_value: value.clone(),
                    field: (*field).to_owned(),
                    reason: format!("{field} '{value}' is on allow list"),
                });
            }
        }

        Ok((deny_matches, allow_matches))
    }

    /// Adds `value` to `field`'s deny list, administrative path.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::Unavailable`] if Redis cannot be reached.
    pub async fn add_to_deny_list(&self, field: &str, value: &str) -> Result<(), RuleEngineError> {
        self.add_to_list("deny_list", field, value).await
    }

    /// Adds `value` to `field`'s allow list, administrative path.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::Unavailable`] if Redis cannot be reached.
    pub async fn add_to_allow_list(&self, field: &str, value: &str) -> Result<(), RuleEngineError> {
        self.add_to_list("allow_list", field, value).await
    }

    async fn add_to_list(&self, prefix: &str, field: &str, value: &str) -> Result<(), RuleEngineError> {
        let mut conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|err| RuleEngineError::Unavailable(err.to_string()))?;
        let key = format!("{prefix}:{field}");
        let _: i64 = conn
            .sadd(&key, value)
            .await
            .map_err(|err| RuleEngineError::Unavailable(err.to_string()))?;
        Ok(())
    }

    /// Reports Redis readiness for `GET /health`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::Unavailable`] if Redis cannot be reached.
    pub async fn readiness(&self) -> Result<(), RuleEngineError> {
        let mut conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|err| RuleEngineError::Unavailable(err.to_string()))?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|err| RuleEngineError::Unavailable(err.to_string()))?;
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
    use std::collections::BTreeMap;

    use super::*;

    fn context() -> RuleEvaluationContext {
        RuleEvaluationContext {
            transaction_id: "txn_1".to_owned(),
            user_id: "user_1".to_owned(),
            amount: 10.0,
            currency: "USD".to_owned(),
            merchant_id: "merch_1".to_owned(),
            merchant_category: "5411".to_owned(),
            geo: "US".to_owned(),
            ip_address: Some("1.2.3.4".to_owned()),
            device_id: None,
            payment_method: "physical".to_owned(),
            tx_count_1h: 0,
            tx_count_24h: 0,
            amount_sum_24h: 0.0,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn field_values_skips_missing_device_id() {
        let values = RedisListChecker::field_values(&context());
        assert!(!values.iter().any(|(field, _)| *field == "device_id"));
        assert!(values.iter().any(|(field, _)| *field == "ip_address"));
    }

    #[test]
    fn field_values_covers_all_fixed_fields_when_present() {
        let mut ctx = context();
        ctx.device_id = Some("dev_1".to_owned());
        let values = RedisListChecker::field_values(&ctx);
        let names: Vec<_> = values.iter().map(|(field, _)| *field).collect();
        assert_eq!(names, CHECK_FIELDS);
    }
}
