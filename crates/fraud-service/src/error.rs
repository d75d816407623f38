// crates/fraud-service/src/error.rs
// ============================================================================
// Module: Startup error
// Description: The failures that can prevent the service from reaching a
//              servable state: bad configuration, or a collaborator that
//              won't connect at all.
// Purpose: Give `main` one error type to bubble up to `ExitCode::FAILURE`
//          instead of a grab-bag of `Box<dyn Error>`.
// Dependencies: fraud-config, fraud-core, sqlx, thiserror
// ============================================================================

use fraud_config::ConfigError;
use fraud_core::interfaces::AuditStoreError;
use fraud_core::interfaces::IdempotencyStoreError;
use fraud_core::interfaces::PublishError;
use fraud_core::interfaces::RuleEngineError;
use fraud_core::interfaces::VelocityTrackerError;
use thiserror::Error;

/// Failures that can keep the service from starting up.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A Redis-backed collaborator could not be constructed.
    #[error("redis collaborator unavailable: {0}")]
    Redis(String),
    /// The ML predictor's HTTP client could not be constructed.
    #[error("model-serving client unavailable: {0}")]
    Predictor(String),
    /// The rules Postgres pool could not be established.
    #[error("rules database unavailable: {0}")]
    RulesDatabase(#[from] sqlx::Error),
    /// The rule cache's initial warm load failed.
    #[error(transparent)]
    RuleCache(#[from] RuleEngineError),
    /// The audit store's connection or migration failed.
    #[error(transparent)]
    Audit(#[from] AuditStoreError),
    /// The Kafka publisher could not be constructed.
    #[error(transparent)]
    Publish(#[from] PublishError),
    /// Binding the HTTP listener failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl From<IdempotencyStoreError> for StartupError {
    fn from(err: IdempotencyStoreError) -> Self {
        Self::Redis(err.to_string())
    }
}

impl From<VelocityTrackerError> for StartupError {
    fn from(err: VelocityTrackerError) -> Self {
        Self::Redis(err.to_string())
    }
}
