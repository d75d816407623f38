// crates/fraud-rules/src/context.rs
// ============================================================================
// Module: DSL context adapter
// Description: Bridges `fraud_core::interfaces::RuleEvaluationContext` to
//              `rule_dsl::RuleContext`.
// Purpose: Let rule-dsl stay free of any dependency on the fraud domain
//          model while still resolving its fixed field set.
// Dependencies: fraud-core, rule-dsl
// ============================================================================

use fraud_core::interfaces::RuleEvaluationContext;
use rule_dsl::RuleContext;

/// Adapts a [`RuleEvaluationContext`] to the field/velocity lookups
/// `rule_dsl::evaluate` needs.
pub struct DslContext<'a>(pub &'a RuleEvaluationContext);

impl RuleContext for DslContext<'_> {
    fn field(&self, path: &[String]) -> Option<serde_json::Value> {
        match path {
            [single] => self.scalar_field(single),
            [first, rest @ ..] if first == "metadata" && !rest.is_empty() => {
                let mut value = self.0.metadata.get(rest[0].as_str())?.clone();
                for key in &rest[1..] {
                    value = value.get(key.as_str())?.clone();
                }
                Some(value)
            }
            _ => None,
        }
    }

    fn velocity_24h_amount(&self) -> f64 {
        self.0.amount_sum_24h
    }

    fn velocity_24h_count(&self) -> f64 {
        #[allow(clippy::cast_precision_loss, reason = "Trailing transaction counts never approach f64's precision limit.")]
        let count = self.0.tx_count_24h as f64;
        count
    }

    fn velocity_1h_count(&self) -> f64 {
        #[allow(clippy::cast_precision_loss, reason = "Trailing transaction counts never approach f64's precision limit.")]
        let count = self.0.tx_count_1h as f64;
        count
    }
}

impl DslContext<'_> {
    /// Resolves one of the fixed top-level transaction fields.
    fn scalar_field(&self, name: &str) -> Option<serde_json::Value> {
        let ctx = self.0;
        match name {
            "transaction_id" => Some(serde_json::Value::String(ctx.transaction_id.clone())),
            "user_id" => Some(serde_json::Value::String(ctx.user_id.clone())),
            "amount" => serde_json::Number::from_f64(ctx.amount).map(serde_json::Value::Number),
            "currency" => Some(serde_json::Value::String(ctx.currency.clone())),
            "merchant_id" => Some(serde_json::Value::String(ctx.merchant_id.clone())),
            "merchant_category" => Some(serde_json::Value::String(ctx.merchant_category.clone())),
            "geo" => Some(serde_json::Value::String(ctx.geo.clone())),
            "ip_address" => ctx.ip_address.clone().map(serde_json::Value::String),
            "device_id" => ctx.device_id.clone().map(serde_json::Value::String),
            "payment_method" => Some(serde_json::Value::String(ctx.payment_method.clone())),
            "tx_count_1h" => Some(serde_json::Value::from(ctx.tx_count_1h)),
            "tx_count_24h" => Some(serde_json::Value::from(ctx.tx_count_24h)),
            "amount_sum_24h" => serde_json::Number::from_f64(ctx.amount_sum_24h).map(serde_json::Value::Number),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn context() -> RuleEvaluationContext {
        RuleEvaluationContext {
            transaction_id: "txn_1".to_owned(),
            user_id: "user_1".to_owned(),
            amount: 1500.0,
            currency: "USD".to_owned(),
            merchant_id: "merch_1".to_owned(),
            merchant_category: "5411".to_owned(),
            geo: "US".to_owned(),
            ip_address: None,
            device_id: None,
            payment_method: "physical".to_owned(),
            tx_count_1h: 2,
            tx_count_24h: 5,
            amount_sum_24h: 200.0,
            metadata: BTreeMap::from([("risk_tag".to_owned(), serde_json::json!("elevated"))]),
        }
    }

    #[test]
    fn resolves_scalar_fields() {
        let ctx = context();
        let dsl = DslContext(&ctx);
        assert_eq!(dsl.field(&["amount".to_owned()]), Some(serde_json::json!(1500.0)));
        assert_eq!(dsl.field(&["geo".to_owned()]), Some(serde_json::json!("US")));
    }

    #[test]
    fn resolves_metadata_fields() {
        let ctx = context();
        let dsl = DslContext(&ctx);
        assert_eq!(dsl.field(&["metadata".to_owned(), "risk_tag".to_owned()]), Some(serde_json::json!("elevated")));
    }

    #[test]
    fn missing_device_id_is_none() {
        let ctx = context();
        let dsl = DslContext(&ctx);
        assert_eq!(dsl.field(&["device_id".to_owned()]), None);
    }

    #[test]
    fn velocity_accessors_read_trailing_counters() {
        let ctx = context();
        let dsl = DslContext(&ctx);
        assert!((dsl.velocity_24h_amount() - 200.0).abs() < f64::EPSILON);
        assert!((dsl.velocity_24h_count() - 5.0).abs() < f64::EPSILON);
        assert!((dsl.velocity_1h_count() - 2.0).abs() < f64::EPSILON);
    }
}
