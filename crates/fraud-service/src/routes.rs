// crates/fraud-service/src/routes.rs
// ============================================================================
// Module: HTTP handlers
// Description: `POST /v1/score`, `GET /health`, `GET /metrics`.
// Purpose: Translate HTTP requests into orchestrator calls and map their
//          results onto the wire shapes `spec.md` §6 defines.
// Dependencies: axum, fraud-core, fraud-orchestrator
// ============================================================================

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use fraud_core::model::TransactionEvent;
use fraud_core::model::ValidationError;
use fraud_orchestrator::error::OrchestratorError;
use fraud_orchestrator::health::DependencyState;
use fraud_orchestrator::health::HealthReport;
use fraud_orchestrator::health::HealthStatus;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::state::AppState;

/// `/v1/score`'s label value in the `fraud_requests_total` counter.
const SCORE_ENDPOINT: &str = "/v1/score";
/// `/health`'s label value in the `fraud_requests_total` counter.
const HEALTH_ENDPOINT: &str = "/health";
/// `/metrics`'s label value in the `fraud_requests_total` counter.
const METRICS_ENDPOINT: &str = "/metrics";

/// `POST /v1/score` response-body-shaped error.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Human-readable error message.
    error: String,
}

impl ErrorBody {
    /// Wraps `message` for a JSON error response.
    fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

/// Scores one transaction (`spec.md` §6, `POST /v1/score`).
///
/// Validates the decoded [`TransactionEvent`] before handing it to the
/// orchestrator (`spec.md` §3: malformed JSON should still parse into a
/// structured `400`, not a deserialization failure).
pub async fn score(State(state): State<AppState>, Json(event): Json<TransactionEvent>) -> Response {
    if let Err(err) = event.validate() {
        state.metrics.record_request(SCORE_ENDPOINT, "POST", StatusCode::BAD_REQUEST.as_u16());
        return (StatusCode::BAD_REQUEST, Json(ErrorBody::new(validation_message(&err)))).into_response();
    }

    let (status, response) = match state.orchestrator.score(&event).await {
        Ok(response) => {
            state.metrics.record_decision(response.decision, response.score, response.latency_ms);
            (StatusCode::OK, Json(response).into_response())
        }
        Err(OrchestratorError::ReplayPending { decision_id }) => (
            StatusCode::CONFLICT,
            Json(ErrorBody::new(format!("decision {decision_id} is still being recorded; retry shortly"))).into_response(),
        ),
        Err(err @ OrchestratorError::ReplayLookupFailed { .. }) => {
            tracing::error!(error = %err, "replay lookup failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorBody::new(err.to_string())).into_response())
        }
    };

    state.metrics.record_request(SCORE_ENDPOINT, "POST", status.as_u16());
    (status, response).into_response()
}

/// Renders a [`ValidationError`] as a wire-facing message.
fn validation_message(err: &ValidationError) -> String {
    err.to_string()
}

/// The `GET /health` wire shape (`spec.md` §6): the orchestrator's
/// dependency rollup plus the deployment-level fields it has no opinion on.
#[derive(Debug, Serialize)]
struct HealthBody {
    /// Overall rollup across every dependency.
    status: HealthStatus,
    /// Fixed service name.
    service: &'static str,
    /// `CARGO_PKG_VERSION` of this binary.
    version: &'static str,
    /// RFC 3339 timestamp of this health check.
    timestamp: String,
    /// Per-dependency detail, keyed by collaborator name. [`DependencyState`]
    /// already serializes to the `"healthy"`/`"disabled"`/`"unhealthy: …"`
    /// strings `spec.md` §6 shows.
    dependencies: BTreeMap<String, DependencyState>,
}

impl HealthBody {
    /// Wraps an orchestrator [`HealthReport`] with service identity and a
    /// capture-time timestamp.
    fn from_report(report: HealthReport) -> Self {
        let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::new());
        Self {
            status: report.status,
            service: "fraud-service",
            version: env!("CARGO_PKG_VERSION"),
            timestamp,
            dependencies: report.dependencies,
        }
    }
}

/// Reports dependency health (`spec.md` §6).
///
/// `degraded` still returns `200` — a non-critical dependency is down but
/// scoring proceeds. `unhealthy` returns `503` so load balancers and
/// orchestration platforms route around an instance that cannot score at
/// all (`spec.md` §6: "`unhealthy` if scoring cannot proceed").
pub async fn health(State(state): State<AppState>) -> Response {
    let report = state.orchestrator.health().await;
    let status_code = match report.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    state.metrics.record_request(HEALTH_ENDPOINT, "GET", status_code.as_u16());
    (status_code, Json(HealthBody::from_report(report))).into_response()
}

/// Exposes every registered metric in the Prometheus text exposition format.
pub async fn metrics(State(state): State<AppState>) -> Response {
    let response = match state.metrics.encode() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };
    state.metrics.record_request(METRICS_ENDPOINT, "GET", response.status().as_u16());
    response
}
