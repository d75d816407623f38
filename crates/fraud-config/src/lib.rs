// crates/fraud-config/src/lib.rs
// ============================================================================
// Module: Fraud Decision Core Configuration
// Description: Environment-variable-driven configuration for the decision
//              orchestrator binary, with typed defaults and a validation pass.
// Purpose: Give every downstream client, timeout, threshold, and secret one
//          strictly validated source of truth (`spec.md` §6).
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Grounded on `decision-gate-config::config` (typed fields, constants for
//! limits, one `validate()` pass, `thiserror`-derived error enum), adapted
//! from a TOML-file loader to the environment-variable contract `spec.md` §6
//! spells out explicitly (`MODEL_SERVING_URL`, `REDIS_*`, `POSTGRES_*`,
//! `KAFKA_*`, thresholds, timeouts, `AUDIT_HMAC_SECRET`, …).
//!
//! [`Config::from_env`] reads every recognised variable, applying the
//! documented defaults for anything unset, then [`Config::validate`] rejects
//! the handful of combinations that would make the service behave
//! unsafely (e.g. an empty HMAC secret, or `thresholds.low > thresholds.high`).

use std::env;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Default tenant identifier used when a request omits `tenant_id`.
const DEFAULT_TENANT_ID: &str = "default";

/// Default low-risk threshold (`spec.md` §4.2).
const DEFAULT_THRESHOLD_LOW: f64 = 0.50;

/// Default high-risk threshold (`spec.md` §4.2).
const DEFAULT_THRESHOLD_HIGH: f64 = 0.70;

/// Default ML predictor timeout, in milliseconds (`spec.md` §4.1 step 5).
const DEFAULT_MODEL_TIMEOUT_MS: u64 = 30;

/// Default rule engine timeout, in milliseconds (`spec.md` §4.1 step 5).
const DEFAULT_RULES_TIMEOUT_MS: u64 = 50;

/// Default total request deadline, in milliseconds (`spec.md` §1).
const DEFAULT_TOTAL_TIMEOUT_MS: u64 = 100;

/// Default idempotency record TTL, in seconds (`spec.md` §3).
const DEFAULT_IDEMPOTENCY_TTL_SECS: u64 = 86_400;

/// Default rule cache TTL, in seconds (`spec.md` §4.3).
const DEFAULT_RULES_CACHE_TTL_SECS: u64 = 300;

/// Default minimum size of the Postgres connection pool (`spec.md` §5).
const DEFAULT_POSTGRES_MIN_CONNECTIONS: u32 = 5;

/// Default maximum size of the Postgres connection pool (`spec.md` §5).
const DEFAULT_POSTGRES_MAX_CONNECTIONS: u32 = 20;

/// Default Postgres port.
const DEFAULT_POSTGRES_PORT: u16 = 5432;

/// Default Redis port.
const DEFAULT_REDIS_PORT: u16 = 6379;

/// Default Redis logical database index.
const DEFAULT_REDIS_DB: u8 = 0;

/// Default bind address for the HTTP surface.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Errors raised while loading or validating [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was present but not parseable.
    #[error("environment variable {name} could not be parsed as {expected}: {value}")]
    InvalidValue {
        /// The offending variable's name.
        name: &'static str,
        /// What type or shape was expected.
        expected: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },
    /// A required environment variable was missing.
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    /// A cross-field invariant failed.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Risk-score decision thresholds (`spec.md` §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Scores at or below this value are low risk.
    pub low: f64,
    /// Scores above this value are high risk.
    pub high: f64,
}

/// Per-call timeout budgets (`spec.md` §4.1 step 5, §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Budget for the ML predictor call.
    pub model_ms: u64,
    /// Budget for the rule engine call.
    pub rules_ms: u64,
    /// Total end-to-end budget for `POST /v1/score`.
    pub total_ms: u64,
}

impl Timeouts {
    /// The model timeout as a [`Duration`].
    #[must_use]
    pub const fn model(&self) -> Duration {
        Duration::from_millis(self.model_ms)
    }

    /// The rules timeout as a [`Duration`].
    #[must_use]
    pub const fn rules(&self) -> Duration {
        Duration::from_millis(self.rules_ms)
    }

    /// The total budget as a [`Duration`].
    #[must_use]
    pub const fn total(&self) -> Duration {
        Duration::from_millis(self.total_ms)
    }
}

/// Redis connection settings shared by the idempotency store, velocity
/// tracker, and list checker (`fraud-stores-redis`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis host.
    pub host: String,
    /// Redis port.
    pub port: u16,
    /// Logical database index.
    pub db: u8,
    /// Optional password.
    pub password: Option<String>,
    /// Idempotency record TTL.
    pub idempotency_ttl: Duration,
}

impl RedisConfig {
    /// Renders a `redis://` connection URL for this configuration.
    #[must_use]
    pub fn connection_url(&self) -> String {
        let auth = self.password.as_deref().map_or_else(String::new, |pw| format!(":{pw}@"));
        format!("redis://{auth}{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Postgres connection settings (`fraud-store-postgres`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Postgres host.
    pub host: String,
    /// Postgres port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Connecting user.
    pub user: String,
    /// Connecting user's password.
    pub password: String,
    /// Minimum pool size (`spec.md` §5: "min 5, max 20 by default").
    pub min_connections: u32,
    /// Maximum pool size.
    pub max_connections: u32,
}

impl PostgresConfig {
    /// Renders a `postgres://` connection URL for this configuration.
    #[must_use]
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// Kafka publisher settings (`fraud-publisher`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaConfig {
    /// Whether publishing is enabled at all (`spec.md` §4.7: "no-op" when
    /// disabled).
    pub enabled: bool,
    /// Bootstrap server list.
    pub bootstrap_servers: String,
}

/// Fail-open vs. fail-closed behaviour when a soft dependency is unreachable
/// (`spec.md` §9 "Fail-open vs. fail-closed for velocity").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Degradation {
    /// Proceed with zeroed/empty data (the spec default).
    FailOpen,
    /// Force a conservative outcome instead of proceeding silently.
    FailClosed,
}

/// The full, validated configuration for the decision orchestrator binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP surface binds to.
    pub bind_addr: String,
    /// Base URL of the ML predictor service.
    pub model_serving_url: String,
    /// Base URL of the rules service.
    pub rules_service_url: String,
    /// Redis connection settings.
    pub redis: RedisConfig,
    /// Postgres connection settings.
    pub postgres: PostgresConfig,
    /// Kafka publisher settings.
    pub kafka: KafkaConfig,
    /// Risk-score thresholds.
    pub thresholds: Thresholds,
    /// Per-call and total timeouts.
    pub timeouts: Timeouts,
    /// HMAC secret used to sign audit log entries (`spec.md` §3).
    pub audit_hmac_secret: String,
    /// Default tenant identifier.
    pub default_tenant_id: String,
    /// ML model version string echoed on every [`Decision`](fraud_core::Decision).
    pub model_version: String,
    /// `tracing`/`tracing-subscriber` log level filter.
    pub log_level: String,
    /// Rule cache refresh interval (`spec.md` §4.3).
    pub rules_cache_ttl: Duration,
    /// Velocity-tracker degradation policy (`spec.md` §9, operator knob).
    pub velocity_degradation: Degradation,
}

impl Config {
    /// Loads configuration from environment variables, applying the defaults
    /// documented in `spec.md` §6 for anything unset, then validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a set variable fails to parse, or if the
    /// loaded configuration fails [`Config::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            bind_addr: env_or("FRAUD_BIND_ADDR", DEFAULT_BIND_ADDR),
            model_serving_url: require_env("MODEL_SERVING_URL")?,
            rules_service_url: require_env("RULES_SERVICE_URL")?,
            redis: RedisConfig {
                host: env_or("REDIS_HOST", "localhost"),
                port: parse_env("REDIS_PORT", DEFAULT_REDIS_PORT)?,
                db: parse_env("REDIS_DB", DEFAULT_REDIS_DB)?,
                password: env::var("REDIS_PASSWORD").ok().filter(|v| !v.is_empty()),
                idempotency_ttl: Duration::from_secs(parse_env(
                    "REDIS_IDEMPOTENCY_TTL",
                    DEFAULT_IDEMPOTENCY_TTL_SECS,
                )?),
            },
            postgres: PostgresConfig {
                host: env_or("POSTGRES_HOST", "localhost"),
                port: parse_env("POSTGRES_PORT", DEFAULT_POSTGRES_PORT)?,
                database: env_or("POSTGRES_DB", "fraud_decision_core"),
                user: env_or("POSTGRES_USER", "fraud"),
                password: env::var("POSTGRES_PASSWORD").unwrap_or_default(),
                min_connections: parse_env(
                    "POSTGRES_MIN_CONNECTIONS",
                    DEFAULT_POSTGRES_MIN_CONNECTIONS,
                )?,
                max_connections: parse_env(
                    "POSTGRES_MAX_CONNECTIONS",
                    DEFAULT_POSTGRES_MAX_CONNECTIONS,
                )?,
            },
            kafka: KafkaConfig {
                enabled: parse_env("KAFKA_ENABLE", true)?,
                bootstrap_servers: env_or("KAFKA_BOOTSTRAP_SERVERS", "localhost:9092"),
            },
            thresholds: Thresholds {
                low: parse_env("THRESHOLD_LOW_RISK", DEFAULT_THRESHOLD_LOW)?,
                high: parse_env("THRESHOLD_HIGH_RISK", DEFAULT_THRESHOLD_HIGH)?,
            },
            timeouts: Timeouts {
                model_ms: parse_env("MODEL_SERVING_TIMEOUT_MS", DEFAULT_MODEL_TIMEOUT_MS)?,
                rules_ms: parse_env("RULES_SERVICE_TIMEOUT_MS", DEFAULT_RULES_TIMEOUT_MS)?,
                total_ms: parse_env("TOTAL_TIMEOUT_MS", DEFAULT_TOTAL_TIMEOUT_MS)?,
            },
            audit_hmac_secret: require_env("AUDIT_HMAC_SECRET")?,
            default_tenant_id: env_or("DEFAULT_TENANT_ID", DEFAULT_TENANT_ID),
            model_version: env_or("MODEL_VERSION", "unknown"),
            log_level: env_or("LOG_LEVEL", "INFO"),
            rules_cache_ttl: Duration::from_secs(parse_env(
                "RULES_CACHE_TTL_SECS",
                DEFAULT_RULES_CACHE_TTL_SECS,
            )?),
            velocity_degradation: if parse_env("FRAUD_VELOCITY_FAIL_CLOSED", false)? {
                Degradation::FailClosed
            } else {
                Degradation::FailOpen
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field invariants that a single environment variable
    /// cannot express on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if:
    /// - `audit_hmac_secret` is empty (every audit entry would sign with an
    ///   empty key, defeating the WORM integrity guarantee of `spec.md` §3).
    /// - `thresholds.low > thresholds.high`.
    /// - any threshold lies outside `[0.0, 1.0]`.
    /// - `postgres.min_connections > postgres.max_connections`.
    /// - `timeouts.model_ms + timeouts.rules_ms` exceeds `timeouts.total_ms`
    ///   by more than the total budget itself (a configuration that could
    ///   never complete even if both calls ran serially instead of
    ///   concurrently would indicate a misconfigured deployment).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audit_hmac_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("AUDIT_HMAC_SECRET must not be empty".to_owned()));
        }
        if self.thresholds.low > self.thresholds.high {
            return Err(ConfigError::Invalid(
                "THRESHOLD_LOW_RISK must not exceed THRESHOLD_HIGH_RISK".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&self.thresholds.low) || !(0.0..=1.0).contains(&self.thresholds.high) {
            return Err(ConfigError::Invalid(
                "risk thresholds must lie within [0.0, 1.0]".to_owned(),
            ));
        }
        if self.postgres.min_connections > self.postgres.max_connections {
            return Err(ConfigError::Invalid(
                "POSTGRES_MIN_CONNECTIONS must not exceed POSTGRES_MAX_CONNECTIONS".to_owned(),
            ));
        }
        if self.timeouts.total_ms == 0 {
            return Err(ConfigError::Invalid("TOTAL_TIMEOUT_MS must be positive".to_owned()));
        }
        Ok(())
    }
}

/// Reads `name`, falling back to `default` if unset.
fn env_or(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// Reads and requires `name` to be set and non-empty.
fn require_env(name: &'static str) -> Result<String, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    if value.trim().is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value)
}

/// Reads `name` and parses it as `T`, falling back to `default` if unset.
fn parse_env<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(value) => value.parse::<T>().map_err(|_| ConfigError::InvalidValue {
            name,
            expected: std::any::type_name::<T>(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            model_serving_url: "http://model:8000".to_owned(),
            rules_service_url: "http://rules:8001".to_owned(),
            redis: RedisConfig {
                host: "localhost".to_owned(),
                port: DEFAULT_REDIS_PORT,
                db: DEFAULT_REDIS_DB,
                password: None,
                idempotency_ttl: Duration::from_secs(DEFAULT_IDEMPOTENCY_TTL_SECS),
            },
            postgres: PostgresConfig {
                host: "localhost".to_owned(),
                port: DEFAULT_POSTGRES_PORT,
                database: "fraud".to_owned(),
                user: "fraud".to_owned(),
                password: "pw".to_owned(),
                min_connections: DEFAULT_POSTGRES_MIN_CONNECTIONS,
                max_connections: DEFAULT_POSTGRES_MAX_CONNECTIONS,
            },
            kafka: KafkaConfig { enabled: true, bootstrap_servers: "localhost:9092".to_owned() },
            thresholds: Thresholds { low: DEFAULT_THRESHOLD_LOW, high: DEFAULT_THRESHOLD_HIGH },
            timeouts: Timeouts {
                model_ms: DEFAULT_MODEL_TIMEOUT_MS,
                rules_ms: DEFAULT_RULES_TIMEOUT_MS,
                total_ms: DEFAULT_TOTAL_TIMEOUT_MS,
            },
            audit_hmac_secret: "secret".to_owned(),
            default_tenant_id: DEFAULT_TENANT_ID.to_owned(),
            model_version: "v1".to_owned(),
            log_level: "INFO".to_owned(),
            rules_cache_ttl: Duration::from_secs(DEFAULT_RULES_CACHE_TTL_SECS),
            velocity_degradation: Degradation::FailOpen,
        }
    }

    #[test]
    fn default_config_validates() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn empty_hmac_secret_is_rejected() {
        let mut config = base();
        config.audit_hmac_secret = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut config = base();
        config.thresholds = Thresholds { low: 0.9, high: 0.1 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut config = base();
        config.thresholds.high = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_pool_bounds_are_rejected() {
        let mut config = base();
        config.postgres.min_connections = 30;
        config.postgres.max_connections = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_total_timeout_is_rejected() {
        let mut config = base();
        config.timeouts.total_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn redis_connection_url_includes_password_when_set() {
        let mut config = base();
        config.redis.password = Some("hunter2".to_owned());
        let url = config.redis.connection_url();
        assert!(url.contains("hunter2"));
        assert!(url.starts_with("redis://:hunter2@"));
    }

    #[test]
    fn redis_connection_url_omits_auth_when_unset() {
        let config = base();
        assert_eq!(config.redis.connection_url(), "redis://localhost:6379/0");
    }
}
