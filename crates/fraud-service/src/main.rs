// crates/fraud-service/src/main.rs
// ============================================================================
// Binary: fraud-service
// Description: The real-time fraud decision HTTP service. Wires every
//              concrete collaborator into the orchestrator and serves
//              `POST /v1/score`, `GET /health`, `GET /metrics`.
// Purpose: `spec.md` §1's decision core, exposed over HTTP.
// Dependencies: axum, fraud-config, tokio, tower-http, tracing-subscriber
// ============================================================================

mod error;
mod metrics;
mod routes;
mod state;

use std::process::ExitCode;

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use fraud_config::Config;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::error::StartupError;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fraud-service failed to start: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration, wires collaborators, and serves HTTP until shutdown.
async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;
    init_tracing(&config.log_level);

    tracing::info!(bind_addr = %config.bind_addr, model_version = %config.model_version, "starting fraud-service");

    let state = state::build(&config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|source| StartupError::Bind { addr: config.bind_addr.clone(), source })?;

    tracing::info!(bind_addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| StartupError::Bind { addr: config.bind_addr.clone(), source })?;

    Ok(())
}

/// Assembles the axum [`Router`] over `state`.
fn build_router(state: state::AppState) -> Router {
    Router::new()
        .route("/v1/score", post(routes::score))
        .route("/health", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initializes the global `tracing` subscriber from `log_level`.
///
/// Falls back to the `RUST_LOG` environment variable, then to `log_level`,
/// matching the precedence operators expect from `tracing-subscriber`.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).json().init();
}

/// Resolves once `SIGINT` or (on Unix) `SIGTERM` is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[allow(clippy::expect_used, reason = "Failure to install the Ctrl+C handler is a startup-time platform error, not a recoverable condition.")]
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[allow(clippy::expect_used, reason = "Failure to install the SIGTERM handler is a startup-time platform error, not a recoverable condition.")]
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received, draining in-flight requests");
}
