// crates/fraud-rules/src/cache.rs
// ============================================================================
// Module: TTL-refreshed rule cache
// Description: Loads enabled rules from `rules_v2`, parses each expression
//              once via rule-dsl, and serves a priority-ordered evaluation
//              pass with a wall-clock early-stop.
// Purpose: Give the orchestrator an in-process `RuleEngine` that survives a
//          transient Postgres outage by serving the last-known-good rule
//          set.
// Dependencies: fraud-core, fraud-stores-redis, rule-dsl, sqlx
// ============================================================================

//! ## Overview
//! Ported from the rules service's `main.py::load_rules_from_db`/`get_rules`:
//! load every `enabled = true` row from `rules_v2` ordered by descending
//! priority, cache it, and re-load once the cache is older than
//! `RULES_CACHE_TTL`. On a failed reload the original falls back to
//! `app_state['rules_cache']`; this cache does the same (`refresh` only
//! replaces the cache on success, never clears it on failure). Unlike the
//! original, a rule's expression is parsed into a [`rule_dsl::Expr`] once at
//! load time rather than re-parsed with regexes on every evaluation.

use std::sync::RwLock;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use fraud_core::interfaces::is_critical;
use fraud_core::interfaces::ListMatch;
use fraud_core::interfaces::RuleEngine;
use fraud_core::interfaces::RuleEngineError;
use fraud_core::interfaces::RuleEvaluationContext;
use fraud_core::interfaces::RuleEvaluationOutcome;
use fraud_core::model::Rule;
use fraud_core::model::RuleAction;
use fraud_core::model::RuleMatch;
use fraud_stores_redis::RedisListChecker;
use rule_dsl::DslError;
use rule_dsl::Expr;
use sqlx::PgPool;

use crate::context::DslContext;

/// One loaded rule paired with its parsed expression.
struct CachedRule {
    /// The rule's metadata, as loaded from `rules_v2`.
    rule: Rule,
    /// `rule.expression`, parsed once at load time.
    expr: Expr,
}

/// The cache's current contents, replaced atomically on a successful
/// refresh.
struct CacheState {
    /// Enabled rules, sorted by descending priority.
    rules: Vec<CachedRule>,
    /// When this snapshot was loaded.
    loaded_at: Instant,
}

/// A [`RuleEngine`] backed by a TTL-refreshed cache of `rules_v2` rows, with
/// an optional Redis deny/allow list checker consulted when
/// `check_lists = true`.
pub struct PostgresRuleCache {
    /// Postgres connection pool.
    pool: PgPool,
    /// How long a loaded rule set is served before a reload is attempted.
    ttl: Duration,
    /// Wall-clock budget for one `evaluate` call, in milliseconds.
    timeout_ms: u64,
    /// Deny/allow list checker; `None` disables list checks entirely.
    list_checker: Option<RedisListChecker>,
    /// The cached rule set; `None` until the first successful load.
    state: RwLock<Option<CacheState>>,
}

impl PostgresRuleCache {
    /// Builds a cache with an empty initial state; the first call to
    /// [`PostgresRuleCache::evaluate`] or [`PostgresRuleCache::warm`] loads
    /// it.
    #[must_use]
    pub fn new(pool: PgPool, ttl: Duration, timeout_ms: u64, list_checker: Option<RedisListChecker>) -> Self {
        Self { pool, ttl, timeout_ms, list_checker, state: RwLock::new(None) }
    }

    /// Eagerly loads the rule set, so the first real request doesn't pay the
    /// load latency.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::Unavailable`] if the initial load fails.
    pub async fn warm(&self) -> Result<(), RuleEngineError> {
        self.refresh().await
    }

    /// Reports Postgres (and, if configured, Redis list-store) readiness.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::Unavailable`] if either dependency cannot
    /// be reached.
    pub async fn readiness(&self) -> Result<(), RuleEngineError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|err| RuleEngineError::Unavailable(err.to_string()))?;
        if let Some(checker) = &self.list_checker {
            checker.readiness().await?;
        }
        Ok(())
    }

    /// `true` iff the cache has never loaded, or has aged past `ttl`.
    fn is_stale(&self) -> bool {
        self.state.read().map_or(true, |state| {
            state.as_ref().is_none_or(|cached| cached.loaded_at.elapsed() > self.ttl)
        })
    }

    /// Re-loads every enabled rule from `rules_v2`, replacing the cache on
    /// success. On failure the existing cache (if any) is left untouched.
    async fn refresh(&self) -> Result<(), RuleEngineError> {
        let rows = sqlx::query_as::<_, RuleRow>(
            "SELECT id, name, expression, action, priority, enabled, description, metadata \
             FROM rules_v2 WHERE enabled = true ORDER BY priority DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|err| RuleEngineError::Unavailable(err.to_string()))?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            match row.into_cached_rule() {
                Ok(cached) => rules.push(cached),
                Err(err) => tracing::warn!(rule_id = %err.rule_id, error = %err.source, "skipping unparseable rule"),
            }
        }

        let mut state = self.state.write().map_err(|_poison| {
            RuleEngineError::Unavailable("rule cache lock poisoned".to_owned())
        })?;
        *state = Some(CacheState { rules, loaded_at: Instant::now() });
        Ok(())
    }

    /// Ensures a rule set is available, refreshing it if stale; tolerates a
    /// failed refresh as long as a previous snapshot is still cached
    /// (fail-static).
    async fn ensure_loaded(&self) -> Result<(), RuleEngineError> {
        if !self.is_stale() {
            return Ok(());
        }
        match self.refresh().await {
            Ok(()) => Ok(()),
            Err(err) => {
                let has_cache = self.state.read().is_ok_and(|state| state.is_some());
                if has_cache {
                    tracing::warn!(error = %err, "rule reload failed, serving cached rule set");
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }
}

#[async_trait]
impl RuleEngine for PostgresRuleCache {
    async fn evaluate(
        &self,
        context: &RuleEvaluationContext,
        check_lists: bool,
    ) -> Result<RuleEvaluationOutcome, RuleEngineError> {
        self.ensure_loaded().await?;

        let start = Instant::now();
        let budget = Duration::from_millis(self.timeout_ms);
        let dsl_ctx = DslContext(context);
        let mut matched_rules = Vec::new();

        {
            let state = self.state.read().map_err(|_poison| {
                RuleEngineError::Unavailable("rule cache lock poisoned".to_owned())
            })?;
            let Some(cached) = state.as_ref() else {
                return Err(RuleEngineError::Unavailable("no cached rule set available".to_owned()));
            };
            for candidate in &cached.rules {
                if start.elapsed() > budget {
                    tracing::warn!(
                        rules_evaluated = matched_rules.len(),
                        total_rules = cached.rules.len(),
                        "rule evaluation budget exceeded, stopping early"
                    );
                    break;
                }
                if rule_dsl::evaluate(&candidate.expr, &dsl_ctx) {
                    matched_rules.push(RuleMatch {
                        rule_id: candidate.rule.id.clone(),
                        rule_name: candidate.rule.name.clone(),
                        expression: candidate.rule.expression.clone(),
                        action: candidate.rule.action,
                        reason: format!("rule '{}' matched", candidate.rule.name),
                        priority: candidate.rule.priority,
                        metadata: candidate.rule.metadata.clone(),
                    });
                }
            }
        }

        let list_matches = if check_lists {
            self.list_matches(context).await
        } else {
            Vec::new()
        };

        let is_critical = is_critical(&matched_rules);
        #[allow(clippy::cast_possible_truncation, reason = "Evaluation never runs anywhere near u64::MAX milliseconds.")]
        let evaluation_time_ms = start.elapsed().as_millis() as u64;

        Ok(RuleEvaluationOutcome { matched_rules, is_critical, list_matches, evaluation_time_ms })
    }

    async fn readiness(&self) -> Result<(), RuleEngineError> {
        PostgresRuleCache::readiness(self).await
    }
}

impl PostgresRuleCache {
    /// Consults the configured list checker, logging and returning no
    /// matches on failure (list checks fail open, same as every other Redis
    /// collaborator in this service).
    async fn list_matches(&self, context: &RuleEvaluationContext) -> Vec<ListMatch> {
        let Some(checker) = &self.list_checker else {
            return Vec::new();
        };
        match checker.check_all(context).await {
            Ok((deny, allow)) => deny.into_iter().chain(allow).collect(),
            Err(err) => {
                tracing::warn!(error = %err, "list check failed, proceeding without list matches");
                Vec::new()
            }
        }
    }
}

/// The error a single `rules_v2` row failed to parse with.
struct UnparseableRule {
    /// The offending rule's id.
    rule_id: String,
    /// The parser's error.
    source: DslError,
}

/// Raw row shape loaded from `rules_v2`.
#[derive(sqlx::FromRow)]
struct RuleRow {
    /// See [`Rule::id`].
    id: String,
    /// See [`Rule::name`].
    name: String,
    /// See [`Rule::expression`].
    expression: String,
    /// Wire name of [`Rule::action`] (`"deny"`/`"review"`/`"allow"`).
    action: String,
    /// See [`Rule::priority`].
    priority: i32,
    /// See [`Rule::enabled`]; always `true` for rows this query returns.
    enabled: bool,
    /// See [`Rule::description`].
    description: Option<String>,
    /// See [`Rule::metadata`], as the raw JSON column value.
    metadata: serde_json::Value,
}

impl RuleRow {
    /// Parses this row's expression and converts it into a [`CachedRule`].
    fn into_cached_rule(self) -> Result<CachedRule, UnparseableRule> {
        let action = parse_rule_action(&self.action);
        let metadata = match self.metadata {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => std::collections::BTreeMap::new(),
        };
        let rule = Rule {
            id: self.id,
            name: self.name,
            expression: self.expression,
            action,
            priority: self.priority,
            enabled: self.enabled,
            description: self.description,
            metadata,
        };
        match rule_dsl::parse(&rule.expression) {
            Ok(expr) => Ok(CachedRule { rule, expr }),
            Err(source) => Err(UnparseableRule { rule_id: rule.id, source }),
        }
    }
}

/// Parses a stored `action` column value, defaulting to
/// [`RuleAction::Review`] for an unrecognised value so a malformed row
/// degrades to "flag for review" rather than silently denying or allowing.
fn parse_rule_action(value: &str) -> RuleAction {
    match value {
        "deny" => RuleAction::Deny,
        "allow" => RuleAction::Allow,
        _ => RuleAction::Review,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn unrecognised_action_defaults_to_review() {
        assert_eq!(parse_rule_action("not-a-real-action"), RuleAction::Review);
    }

    #[test]
    fn known_actions_round_trip() {
        assert_eq!(parse_rule_action("deny"), RuleAction::Deny);
        assert_eq!(parse_rule_action("allow"), RuleAction::Allow);
        assert_eq!(parse_rule_action("review"), RuleAction::Review);
    }
}
