// crates/fraud-orchestrator/src/context.rs
// ============================================================================
// Module: Rules-boundary context builder
// Description: Projects a `TransactionEvent` plus freshly recorded velocity
//              counters into the `RuleEvaluationContext` shape the Rules
//              boundary consumes (`spec.md` §6 "Downstream HTTP to Rules").
// Purpose: Keep the wire-shape translation in one place instead of scattering
//          field mapping through `orchestrate`.
// Dependencies: fraud-core
// ============================================================================

use fraud_core::interfaces::RuleEvaluationContext;
use fraud_core::model::CardType;
use fraud_core::model::TransactionEvent;
use fraud_core::model::VelocityCounters;

/// Builds the Rules-boundary context for `event`, stamping in the velocity
/// counters already recorded for this request (`spec.md` §4.1 step 4 runs
/// before step 5's fan-out).
#[must_use]
pub fn rule_evaluation_context(event: &TransactionEvent, velocity: VelocityCounters) -> RuleEvaluationContext {
    RuleEvaluationContext {
        transaction_id: event.event_id.clone(),
        user_id: event.card.user_id.clone(),
        amount: event.amount,
        currency: event.currency.clone(),
        merchant_id: event.merchant.id.clone(),
        merchant_category: event.merchant.mcc.clone(),
        geo: event.context.geo.clone().unwrap_or_default(),
        ip_address: event.context.ip.clone(),
        device_id: event.context.device_id.clone(),
        payment_method: payment_method(event.card.card_type),
        tx_count_1h: velocity.velocity_1h,
        tx_count_24h: velocity.velocity_24h,
        amount_sum_24h: velocity.amount_sum_24h,
        metadata: event.metadata.clone(),
    }
}

/// Renders a card form factor the way the Rules boundary's `payment_method`
/// field expects it.
fn payment_method(card_type: CardType) -> String {
    match card_type {
        CardType::Physical => "physical".to_owned(),
        CardType::Virtual => "virtual".to_owned(),
    }
    .to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]
mod tests {
    use std::collections::BTreeMap;

    use fraud_core::model::Card;
    use fraud_core::model::Channel;
    use fraud_core::model::Merchant;
    use fraud_core::model::TransactionContext;

    use super::*;

    fn event() -> TransactionEvent {
        TransactionEvent {
            event_id: "evt_1".to_owned(),
            tenant_id: "default".to_owned(),
            amount: 125.50,
            currency: "USD".to_owned(),
            merchant: Merchant { id: "m_1".to_owned(), name: None, mcc: "5411".to_owned(), country: "US".to_owned() },
            card: Card {
                card_id: "card_1".to_owned(),
                user_id: "user_1".to_owned(),
                card_type: CardType::Virtual,
                bin: None,
            },
            context: TransactionContext {
                channel: Some(Channel::App),
                ip: Some("203.0.113.9".to_owned()),
                geo: Some("US".to_owned()),
                device_id: Some("dev_1".to_owned()),
                user_agent: None,
                proxy_vpn_flag: None,
            },
            has_initial_2fa: false,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn maps_fixed_fields_and_velocity() {
        let velocity = VelocityCounters { velocity_1h: 2, velocity_24h: 9, amount_sum_24h: 980.0 };
        let ctx = rule_evaluation_context(&event(), velocity);
        assert_eq!(ctx.transaction_id, "evt_1");
        assert_eq!(ctx.user_id, "user_1");
        assert_eq!(ctx.payment_method, "virtual");
        assert_eq!(ctx.tx_count_1h, 2);
        assert_eq!(ctx.tx_count_24h, 9);
        assert!((ctx.amount_sum_24h - 980.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_geo_defaults_to_empty_string() {
        let mut tx = event();
        tx.context.geo = None;
        let ctx = rule_evaluation_context(&tx, VelocityCounters::default());
        assert_eq!(ctx.geo, "");
    }
}
