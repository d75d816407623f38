// crates/rule-dsl/src/lib.rs
// ============================================================================
// Module: Rule Expression DSL
// Description: Flat boolean/comparison expression language for fraud rules.
// Purpose: Parse a rule's `expression` string once at load time and evaluate
//          it against a transaction context on every scoring request.
// ============================================================================

//! ## Overview
//!
//! A rule expression is a single line of boolean logic over a transaction's
//! fields, velocity counters, and literal values:
//!
//! ```text
//! amount > 5000 AND country != 'US' AND velocity_24h('count') > 10
//! ```
//!
//! The grammar is intentionally flat: there are no parenthesised
//! sub-expressions. A rule author who writes `(a AND b) OR c` gets a
//! [`DslError::UnexpectedParenthesis`] at load time rather than a
//! silently-reinterpreted expression. `OR` binds looser than `AND`, and `NOT`
//! binds tighter than both.
//!
//! ### Example
//!
//! ```
//! use std::collections::HashMap;
//!
//! use rule_dsl::{parse, RuleContext};
//!
//! struct MapContext(HashMap<String, serde_json::Value>);
//!
//! impl RuleContext for MapContext {
//!     fn field(&self, path: &[String]) -> Option<serde_json::Value> {
//!         self.0.get(&path.join(".")).cloned()
//!     }
//!     fn velocity_24h_amount(&self) -> f64 { 0.0 }
//!     fn velocity_24h_count(&self) -> f64 { 0.0 }
//!     fn velocity_1h_count(&self) -> f64 { 0.0 }
//! }
//!
//! let expr = parse("amount > 1000 AND country == 'US'").unwrap();
//! let mut fields = HashMap::new();
//! fields.insert("amount".to_string(), serde_json::json!(1500));
//! fields.insert("country".to_string(), serde_json::json!("US"));
//! assert!(rule_dsl::evaluate(&expr, &MapContext(fields)));
//! ```

mod ast;
mod error;
mod lexer;
mod parser;
mod value;

pub use ast::{CompOp, Expr, Literal, Operand, Predicate};
pub use error::DslError;
pub use parser::parse;

/// Evaluation-time access to a transaction's fields and velocity counters.
///
/// Implementors back dotted-path field lookups (`merchant.category`) and the
/// three fixed velocity quantities the grammar's built-in functions expose.
/// A `None` field lookup evaluates as falsy rather than as an error: a rule
/// referencing a field absent from a given event should not abort scoring.
pub trait RuleContext {
    /// Resolves a dotted field path, e.g. `["merchant", "category"]`.
    fn field(&self, path: &[String]) -> Option<serde_json::Value>;
    /// Backs `velocity_24h('amount')`.
    fn velocity_24h_amount(&self) -> f64;
    /// Backs `velocity_24h('count')`.
    fn velocity_24h_count(&self) -> f64;
    /// Backs `velocity_1h('count')`.
    fn velocity_1h_count(&self) -> f64;
}

/// Evaluates a parsed expression against a context, returning its boolean
/// result.
pub fn evaluate(expr: &Expr, ctx: &dyn RuleContext) -> bool {
    match expr {
        Expr::Or(parts) => parts.iter().any(|part| evaluate(part, ctx)),
        Expr::And(parts) => parts.iter().all(|part| evaluate(part, ctx)),
        Expr::Not(inner) => !evaluate(inner, ctx),
        Expr::Pred(pred) => evaluate_predicate(pred, ctx),
    }
}

fn evaluate_predicate(pred: &Predicate, ctx: &dyn RuleContext) -> bool {
    match pred {
        Predicate::Truthy(operand) => value::truthy(resolve(operand, ctx).as_ref()),
        Predicate::Compare { left, op, right } => {
            match (resolve(left, ctx), resolve(right, ctx)) {
                (Some(l), Some(r)) => value::compare(&l, *op, &r),
                _ => false,
            }
        }
        Predicate::In { left, items } => {
            resolve(left, ctx).is_some_and(|v| value::membership(&v, items))
        }
    }
}

/// Resolves an operand to its runtime value, if any.
fn resolve(operand: &Operand, ctx: &dyn RuleContext) -> Option<serde_json::Value> {
    match operand {
        Operand::Field(path) => ctx.field(path),
        Operand::Literal(v) => Some(v.clone()),
        Operand::Call { name, args } => resolve_builtin(name, args, ctx),
    }
}

/// Resolves a validated built-in call. Parser-time validation guarantees the
/// `(name, arg)` shape always matches one of these arms.
fn resolve_builtin(
    name: &str,
    args: &[Literal],
    ctx: &dyn RuleContext,
) -> Option<serde_json::Value> {
    let arg = args.first().and_then(serde_json::Value::as_str);
    let value = match (name, arg) {
        ("velocity_24h", Some("amount")) => ctx.velocity_24h_amount(),
        ("velocity_24h", Some("count")) => ctx.velocity_24h_count(),
        ("velocity_1h", Some("count")) => ctx.velocity_1h_count(),
        _ => return None,
    };
    serde_json::Number::from_f64(value).map(serde_json::Value::Number)
}
