//! Grammar acceptance and rejection cases for rule expressions.

use rule_dsl::{parse, DslError};

#[test]
fn parses_simple_comparison() {
    assert!(parse("amount > 1000").is_ok());
}

#[test]
fn parses_dotted_field_path() {
    assert!(parse("merchant.category == 'gambling'").is_ok());
}

#[test]
fn parses_and_or_not_with_correct_precedence() {
    // OR binds looser than AND: this parses as (a AND b) OR c.
    let expr = parse("amount > 100 AND country == 'US' OR NOT is_trusted").unwrap();
    match expr {
        rule_dsl::Expr::Or(parts) => assert_eq!(parts.len(), 2),
        other => panic!("expected top-level OR, got {other:?}"),
    }
}

#[test]
fn keywords_are_case_insensitive() {
    assert!(parse("amount > 100 and country == 'US' or not is_trusted").is_ok());
}

#[test]
fn parses_in_membership() {
    assert!(parse("country IN ['US', 'CA', 'MX']").is_ok());
}

#[test]
fn parses_velocity_builtins() {
    assert!(parse("velocity_24h('amount') > 10000").is_ok());
    assert!(parse("velocity_24h('count') > 5").is_ok());
    assert!(parse("velocity_1h('count') > 3").is_ok());
}

#[test]
fn parses_bare_identifier_as_truthy_predicate() {
    assert!(parse("is_flagged").is_ok());
}

#[test]
fn rejects_parenthesised_subexpressions() {
    let err = parse("(amount > 100 AND country == 'US')").unwrap_err();
    assert!(matches!(err, DslError::UnexpectedParenthesis { .. }));

    let err = parse("amount > 100 AND (country == 'US' OR country == 'CA')").unwrap_err();
    assert!(matches!(err, DslError::UnexpectedParenthesis { .. }));
}

#[test]
fn rejects_unknown_function() {
    let err = parse("velocity_7d('amount') > 10").unwrap_err();
    assert!(matches!(err, DslError::UnknownFunction { .. }));
}

#[test]
fn rejects_velocity_24h_with_bad_argument() {
    let err = parse("velocity_24h('median') > 10").unwrap_err();
    assert!(matches!(err, DslError::UnknownFunction { .. }));
}

#[test]
fn rejects_velocity_1h_amount_argument() {
    // velocity_1h only exposes a count, never an amount sum.
    let err = parse("velocity_1h('amount') > 10").unwrap_err();
    assert!(matches!(err, DslError::UnknownFunction { .. }));
}

#[test]
fn rejects_empty_input() {
    assert!(matches!(parse("   ").unwrap_err(), DslError::EmptyInput));
}

#[test]
fn rejects_trailing_input() {
    let err = parse("amount > 100 garbage").unwrap_err();
    assert!(matches!(err, DslError::TrailingInput { .. }));
}

#[test]
fn rejects_unterminated_string() {
    let err = parse("country == 'US").unwrap_err();
    assert!(matches!(err, DslError::UnterminatedString { .. }));
}

#[test]
fn rejects_oversized_input() {
    let huge = format!("amount > {}", "9".repeat(64 * 1024));
    assert!(matches!(parse(&huge).unwrap_err(), DslError::InputTooLarge { .. }));
}
