//! Runtime value comparison, truthiness, and membership semantics.
//!
//! Comparisons coerce a string operand to a number when the other operand is
//! numeric (or numeric-looking); when coercion fails, an ordering comparison
//! evaluates to `false` rather than raising an error — a rule that consults
//! a malformed field should not crash the scoring path.

use std::str::FromStr;

use bigdecimal::BigDecimal;

use crate::ast::CompOp;

/// Attempts to interpret a JSON value as a decimal number.
fn as_decimal(value: &serde_json::Value) -> Option<BigDecimal> {
    match value {
        serde_json::Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        serde_json::Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Evaluates `left op right` using numeric coercion where possible, falling
/// back to direct value equality for `==`/`!=` and to `false` for ordering
/// operators when coercion fails.
pub(crate) fn compare(left: &serde_json::Value, op: CompOp, right: &serde_json::Value) -> bool {
    if let (Some(l), Some(r)) = (as_decimal(left), as_decimal(right)) {
        return match op {
            CompOp::Gt => l > r,
            CompOp::Lt => l < r,
            CompOp::Ge => l >= r,
            CompOp::Le => l <= r,
            CompOp::Eq => l == r,
            CompOp::Ne => l != r,
        };
    }

    match op {
        CompOp::Eq => left == right,
        CompOp::Ne => left != right,
        CompOp::Gt | CompOp::Lt | CompOp::Ge | CompOp::Le => false,
    }
}

/// Tests `value IN items` using the same equality semantics as `==`.
pub(crate) fn membership(value: &serde_json::Value, items: &[serde_json::Value]) -> bool {
    items.iter().any(|item| compare(value, CompOp::Eq, item))
}

/// Truthiness of a resolved value when used as a bare predicate.
pub(crate) fn truthy(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(serde_json::Value::Array(a)) => !a.is_empty(),
        Some(serde_json::Value::Object(o)) => !o.is_empty(),
    }
}
