// crates/fraud-core/src/policy.rs
// ============================================================================
// Module: Combination policy
// Description: Pure function combining the ML score, matched rules, and 2FA
//              state into a final decision.
// Purpose: Keep the only business-critical branching logic in one place,
//          independent of I/O, so it can be exhaustively unit tested.
// Dependencies: crate::model
// ============================================================================

//! ## Overview
//! Ported verbatim (branch order and reason text included) from
//! `DecisionOrchestrator._make_decision` in the original Python decision
//! engine, per `spec.md` §4.2. The branch order is itself load-bearing:
//! critical rules are checked before the score is even examined, and a
//! missing score is treated as CHALLENGE rather than as a default ALLOW.

use crate::model::DecisionType;
use crate::model::Thresholds;

/// Maximum number of rule ids quoted in a human-readable reason string.
const MAX_QUOTED_RULE_HITS: usize = 3;

/// Maximum number of rule ids quoted in the "minor rules" low-risk reason.
const MAX_QUOTED_MINOR_RULE_HITS: usize = 2;

/// Maximum number of top features quoted in a high-risk reason.
const MAX_QUOTED_FEATURES: usize = 3;

/// Inputs to the combination policy.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput<'a> {
    /// ML risk score in `[0, 1]`, or `None` if the model call failed.
    pub score: Option<f64>,
    /// Names of rules that matched, in match order. `rule_hits` is always
    /// the full list; reason strings truncate their own quoted excerpt.
    pub rule_hits: &'a [String],
    /// `true` iff a matched rule's action is `deny`.
    pub is_critical: bool,
    /// `true` iff the caller already completed a first factor of auth.
    pub has_initial_2fa: bool,
    /// The low/high risk thresholds in effect for this decision.
    pub thresholds: &'a Thresholds,
    /// Top contributing model features, most important first.
    pub top_features: &'a [String],
}

/// Output of the combination policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOutcome {
    /// The decision: `ALLOW`, `CHALLENGE`, or `DENY`.
    pub decision: DecisionType,
    /// Human-readable reasons, in priority order.
    pub reasons: Vec<String>,
    /// `true` iff the caller must complete a second factor of auth before
    /// the transaction may proceed.
    pub requires_2fa: bool,
}

/// Combines score, rule hits, criticality, and 2FA state into a decision.
///
/// # Invariants
///
/// 1. A critical rule match always yields `DENY`, regardless of score.
/// 2. A missing score (`score.is_none()`) always yields `CHALLENGE`, never
///    `ALLOW` — a scoring failure is treated as elevated risk, not as an
///    absence of risk.
/// 3. `score > thresholds.high` yields `CHALLENGE`.
/// 4. `thresholds.low <= score <= thresholds.high` yields `ALLOW` if
///    `has_initial_2fa`, else `CHALLENGE`.
/// 5. `score < thresholds.low` yields `ALLOW`.
#[must_use]
pub fn decide(input: PolicyInput<'_>) -> PolicyOutcome {
    if input.is_critical {
        return critical_outcome(input.rule_hits);
    }

    let Some(score) = input.score else {
        return PolicyOutcome {
            decision: DecisionType::Challenge,
            reasons: vec!["Unable to compute risk score".to_owned()],
            requires_2fa: true,
        };
    };

    if score > input.thresholds.high {
        return high_risk_outcome(score, input.top_features, input.rule_hits);
    }

    if score >= input.thresholds.low {
        return medium_risk_outcome(score, input.has_initial_2fa);
    }

    low_risk_outcome(score, input.rule_hits)
}

/// Builds the `DENY` outcome for a critical rule match.
fn critical_outcome(rule_hits: &[String]) -> PolicyOutcome {
    let mut reasons = vec!["Critical security rule triggered".to_owned()];
    if !rule_hits.is_empty() {
        reasons.push(format!("Rules: {}", quoted(rule_hits, MAX_QUOTED_RULE_HITS)));
    }
    PolicyOutcome {
        decision: DecisionType::Deny,
        reasons,
        requires_2fa: false,
    }
}

/// Builds the `CHALLENGE` outcome for `score > thresholds.high`.
fn high_risk_outcome(score: f64, top_features: &[String], rule_hits: &[String]) -> PolicyOutcome {
    let mut reasons = vec![format!("High risk score: {score:.2}")];
    if !top_features.is_empty() {
        reasons.push(format!(
            "Risk factors: {}",
            quoted(top_features, MAX_QUOTED_FEATURES)
        ));
    }
    if !rule_hits.is_empty() {
        reasons.push(format!(
            "Rules triggered: {}",
            quoted(rule_hits, MAX_QUOTED_RULE_HITS)
        ));
    }
    PolicyOutcome {
        decision: DecisionType::Challenge,
        reasons,
        requires_2fa: true,
    }
}

/// Builds the outcome for `thresholds.low <= score <= thresholds.high`.
fn medium_risk_outcome(score: f64, has_initial_2fa: bool) -> PolicyOutcome {
    let mut reasons = vec![format!("Medium risk score: {score:.2}")];
    if has_initial_2fa {
        reasons.push("2FA already validated".to_owned());
        return PolicyOutcome {
            decision: DecisionType::Allow,
            reasons,
            requires_2fa: false,
        };
    }
    reasons.push("2FA required for verification".to_owned());
    PolicyOutcome {
        decision: DecisionType::Challenge,
        reasons,
        requires_2fa: true,
    }
}

/// Builds the `ALLOW` outcome for `score < thresholds.low`.
fn low_risk_outcome(score: f64, rule_hits: &[String]) -> PolicyOutcome {
    let mut reasons = vec![format!("Low risk score: {score:.2}")];
    if rule_hits.is_empty() {
        reasons.push("No security rules triggered".to_owned());
    } else {
        reasons.push(format!(
            "Minor rules triggered: {}",
            quoted(rule_hits, MAX_QUOTED_MINOR_RULE_HITS)
        ));
    }
    PolicyOutcome {
        decision: DecisionType::Allow,
        reasons,
        requires_2fa: false,
    }
}

/// Joins the first `limit` items of `items` with `", "`.
fn quoted(items: &[String], limit: usize) -> String {
    items
        .iter()
        .take(limit)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use super::*;

    fn thresholds() -> Thresholds {
        Thresholds { low: 0.50, high: 0.70 }
    }

    #[test]
    fn critical_rule_denies_regardless_of_score() {
        let hits = vec!["velocity_spike".to_owned()];
        let outcome = decide(PolicyInput {
            score: Some(0.01),
            rule_hits: &hits,
            is_critical: true,
            has_initial_2fa: true,
            thresholds: &thresholds(),
            top_features: &[],
        });
        assert_eq!(outcome.decision, DecisionType::Deny);
        assert!(!outcome.requires_2fa);
    }

    #[test]
    fn missing_score_challenges() {
        let outcome = decide(PolicyInput {
            score: None,
            rule_hits: &[],
            is_critical: false,
            has_initial_2fa: true,
            thresholds: &thresholds(),
            top_features: &[],
        });
        assert_eq!(outcome.decision, DecisionType::Challenge);
        assert!(outcome.requires_2fa);
    }

    #[test]
    fn boundary_score_at_high_is_medium_not_high() {
        let outcome = decide(PolicyInput {
            score: Some(0.70),
            rule_hits: &[],
            is_critical: false,
            has_initial_2fa: true,
            thresholds: &thresholds(),
            top_features: &[],
        });
        assert_eq!(outcome.decision, DecisionType::Allow);
    }

    #[test]
    fn just_above_high_challenges() {
        let outcome = decide(PolicyInput {
            score: Some(0.7000001),
            rule_hits: &[],
            is_critical: false,
            has_initial_2fa: false,
            thresholds: &thresholds(),
            top_features: &[],
        });
        assert_eq!(outcome.decision, DecisionType::Challenge);
        assert!(outcome.requires_2fa);
    }

    #[test]
    fn boundary_score_at_low_with_2fa_allows() {
        let outcome = decide(PolicyInput {
            score: Some(0.50),
            rule_hits: &[],
            is_critical: false,
            has_initial_2fa: true,
            thresholds: &thresholds(),
            top_features: &[],
        });
        assert_eq!(outcome.decision, DecisionType::Allow);
        assert!(!outcome.requires_2fa);
    }

    #[test]
    fn medium_risk_without_2fa_challenges() {
        let outcome = decide(PolicyInput {
            score: Some(0.60),
            rule_hits: &[],
            is_critical: false,
            has_initial_2fa: false,
            thresholds: &thresholds(),
            top_features: &[],
        });
        assert_eq!(outcome.decision, DecisionType::Challenge);
        assert!(outcome.requires_2fa);
    }

    #[test]
    fn just_below_low_allows() {
        let outcome = decide(PolicyInput {
            score: Some(0.4999),
            rule_hits: &[],
            is_critical: false,
            has_initial_2fa: false,
            thresholds: &thresholds(),
            top_features: &[],
        });
        assert_eq!(outcome.decision, DecisionType::Allow);
        assert!(!outcome.requires_2fa);
    }

    #[test]
    fn zero_score_allows() {
        let outcome = decide(PolicyInput {
            score: Some(0.0),
            rule_hits: &[],
            is_critical: false,
            has_initial_2fa: false,
            thresholds: &thresholds(),
            top_features: &[],
        });
        assert_eq!(outcome.decision, DecisionType::Allow);
    }

    #[test]
    fn max_score_denies_via_critical_or_challenges_via_score() {
        let outcome = decide(PolicyInput {
            score: Some(1.0),
            rule_hits: &[],
            is_critical: false,
            has_initial_2fa: true,
            thresholds: &thresholds(),
            top_features: &[],
        });
        assert_eq!(outcome.decision, DecisionType::Challenge);
    }

    #[test]
    fn rule_hits_truncated_to_three_in_reason_text() {
        let hits = vec![
            "a".to_owned(),
            "b".to_owned(),
            "c".to_owned(),
            "d".to_owned(),
        ];
        let outcome = decide(PolicyInput {
            score: Some(0.01),
            rule_hits: &hits,
            is_critical: true,
            has_initial_2fa: false,
            thresholds: &thresholds(),
            top_features: &[],
        });
        let joined = outcome.reasons.join(" | ");
        assert!(joined.contains("a, b, c"));
        assert!(!joined.contains('d'));
    }
}
