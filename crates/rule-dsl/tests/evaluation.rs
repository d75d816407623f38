//! Runtime evaluation semantics: truthiness, numeric/string coercion, and
//! membership.

use std::collections::HashMap;

use rule_dsl::{evaluate, parse, RuleContext};
use serde_json::json;

struct TestContext {
    fields: HashMap<String, serde_json::Value>,
    velocity_24h_amount: f64,
    velocity_24h_count: f64,
    velocity_1h_count: f64,
}

impl TestContext {
    fn new() -> Self {
        Self {
            fields: HashMap::new(),
            velocity_24h_amount: 0.0,
            velocity_24h_count: 0.0,
            velocity_1h_count: 0.0,
        }
    }

    fn with_field(mut self, path: &str, value: serde_json::Value) -> Self {
        self.fields.insert(path.to_string(), value);
        self
    }
}

impl RuleContext for TestContext {
    fn field(&self, path: &[String]) -> Option<serde_json::Value> {
        self.fields.get(&path.join(".")).cloned()
    }
    fn velocity_24h_amount(&self) -> f64 {
        self.velocity_24h_amount
    }
    fn velocity_24h_count(&self) -> f64 {
        self.velocity_24h_count
    }
    fn velocity_1h_count(&self) -> f64 {
        self.velocity_1h_count
    }
}

fn eval(expression: &str, ctx: &TestContext) -> bool {
    evaluate(&parse(expression).expect("expression should parse"), ctx)
}

#[test]
fn numeric_comparison_against_field() {
    let ctx = TestContext::new().with_field("amount", json!(5000));
    assert!(eval("amount > 1000", &ctx));
    assert!(!eval("amount < 1000", &ctx));
}

#[test]
fn string_operand_coerces_to_number_when_other_side_is_numeric() {
    let ctx = TestContext::new().with_field("amount", json!("5000"));
    assert!(eval("amount > 1000", &ctx));
}

#[test]
fn non_numeric_coercion_fails_ordering_to_false() {
    let ctx = TestContext::new().with_field("tier", json!("gold"));
    assert!(!eval("tier > 1000", &ctx));
    assert!(!eval("tier < 1000", &ctx));
}

#[test]
fn string_equality_does_not_require_coercion() {
    let ctx = TestContext::new().with_field("country", json!("US"));
    assert!(eval("country == 'US'", &ctx));
    assert!(eval("country != 'CA'", &ctx));
}

#[test]
fn missing_field_is_falsy_and_fails_comparisons() {
    let ctx = TestContext::new();
    assert!(!eval("is_flagged", &ctx));
    assert!(!eval("amount > 100", &ctx));
}

#[test]
fn membership_against_literal_list() {
    let ctx = TestContext::new().with_field("country", json!("CA"));
    assert!(eval("country IN ['US', 'CA', 'MX']", &ctx));

    let ctx = TestContext::new().with_field("country", json!("FR"));
    assert!(!eval("country IN ['US', 'CA', 'MX']", &ctx));
}

#[test]
fn and_or_not_short_circuit_correctly() {
    let ctx =
        TestContext::new().with_field("amount", json!(6000)).with_field("country", json!("US"));
    assert!(eval("amount > 5000 AND country == 'US'", &ctx));
    assert!(!eval("amount > 5000 AND NOT country == 'US'", &ctx));
    assert!(eval("amount < 100 OR country == 'US'", &ctx));
}

#[test]
fn velocity_builtins_read_context_counters() {
    let mut ctx = TestContext::new();
    ctx.velocity_24h_amount = 12_000.0;
    ctx.velocity_24h_count = 4.0;
    ctx.velocity_1h_count = 2.0;

    assert!(eval("velocity_24h('amount') > 10000", &ctx));
    assert!(eval("velocity_24h('count') >= 4", &ctx));
    assert!(eval("velocity_1h('count') >= 2", &ctx));
    assert!(!eval("velocity_1h('count') >= 3", &ctx));
}

#[test]
fn bare_truthy_predicate_on_boolean_field() {
    let ctx = TestContext::new().with_field("is_flagged", json!(true));
    assert!(eval("is_flagged", &ctx));
    assert!(eval("NOT NOT is_flagged", &ctx));
}
