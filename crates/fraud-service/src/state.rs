// crates/fraud-service/src/state.rs
// ============================================================================
// Module: Application wiring
// Description: Constructs every concrete collaborator from `Config` and
//              assembles the orchestrator plus shared HTTP state.
// Purpose: Keep `main` to startup sequencing; collaborator construction
//          details live here instead.
// Dependencies: fraud-config, fraud-core, fraud-orchestrator, fraud-providers,
//               fraud-publisher, fraud-rules, fraud-store-postgres,
//               fraud-stores-redis, sqlx
// ============================================================================

use std::sync::Arc;

use fraud_config::Config;
use fraud_orchestrator::Orchestrator;
use fraud_orchestrator::OrchestratorConfig;
use fraud_providers::HttpPredictor;
use fraud_providers::HttpProviderConfig;
use fraud_publisher::KafkaPublisher;
use fraud_rules::PostgresRuleCache;
use fraud_store_postgres::PostgresAuditStore;
use fraud_stores_redis::RedisIdempotencyStore;
use fraud_stores_redis::RedisListChecker;
use fraud_stores_redis::RedisVelocityTracker;
use sqlx::postgres::PgPoolOptions;

use crate::error::StartupError;
use crate::metrics::Metrics;

/// The orchestrator instantiated over this service's concrete collaborators.
///
/// `fraud-orchestrator` is generic over the six collaborator traits so tests
/// can substitute fakes; here the types are pinned to the real
/// Redis/Postgres/Kafka/HTTP implementations, so the HTTP layer never pays
/// for a `dyn` vtable.
pub type AppOrchestrator =
    Orchestrator<RedisIdempotencyStore, RedisVelocityTracker, PostgresRuleCache, HttpPredictor, PostgresAuditStore, KafkaPublisher>;

/// Shared state handed to every axum handler.
#[derive(Clone)]
pub struct AppState {
    /// The wired orchestrator.
    pub orchestrator: Arc<AppOrchestrator>,
    /// Prometheus metrics, gathered by `GET /metrics`.
    pub metrics: Arc<Metrics>,
}

/// Builds every collaborator from `config` and assembles the orchestrator.
///
/// # Errors
///
/// Returns [`StartupError`] if a Redis/Postgres connection cannot be
/// established, the rule cache's initial load fails, or the Kafka producer
/// cannot be constructed.
pub async fn build(config: &Config) -> Result<AppState, StartupError> {
    let redis_url = config.redis.connection_url();

    let idempotency = Arc::new(RedisIdempotencyStore::new(&redis_url)?);
    let velocity = Arc::new(RedisVelocityTracker::new(&redis_url)?);
    let list_checker = RedisListChecker::new(&redis_url)?;

    let rules_pool = PgPoolOptions::new()
        .min_connections(config.postgres.min_connections)
        .max_connections(config.postgres.max_connections)
        .connect(&config.postgres.connection_url())
        .await?;
    let rules = Arc::new(PostgresRuleCache::new(
        rules_pool,
        config.rules_cache_ttl,
        config.timeouts.rules_ms,
        Some(list_checker),
    ));
    rules.warm().await?;

    let predictor = Arc::new(HttpPredictor::new(HttpProviderConfig::in_cluster(
        config.model_serving_url.clone(),
        config.timeouts.model(),
    ))?);

    let audit = Arc::new(PostgresAuditStore::connect(&config.postgres, config.audit_hmac_secret.clone()).await?);
    audit.migrate().await?;

    let publisher = Arc::new(KafkaPublisher::new(&config.kafka)?);

    let orchestrator = Arc::new(Orchestrator::new(
        idempotency,
        velocity,
        rules,
        predictor,
        audit,
        publisher,
        OrchestratorConfig {
            thresholds: fraud_core::model::Thresholds { low: config.thresholds.low, high: config.thresholds.high },
            timeouts: config.timeouts,
            idempotency_ttl: config.redis.idempotency_ttl,
            velocity_degradation: config.velocity_degradation,
            model_version: config.model_version.clone(),
        },
    ));

    Ok(AppState { orchestrator, metrics: Arc::new(Metrics::new()) })
}

/// Maps an [`HttpClientError`](fraud_providers::HttpClientError) into a
/// [`StartupError`]; kept separate from the `From` impls in `error.rs`
/// because `HttpPredictor::new` is the only call site.
impl From<fraud_providers::HttpClientError> for StartupError {
    fn from(err: fraud_providers::HttpClientError) -> Self {
        Self::Predictor(err.to_string())
    }
}
