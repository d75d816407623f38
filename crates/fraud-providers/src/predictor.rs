// crates/fraud-providers/src/predictor.rs
// ============================================================================
// Module: ML predictor HTTP client
// Description: Calls the model-serving collaborator's `/predict` endpoint
//              and maps its response onto `fraud_core::interfaces::Predictor`.
// Purpose: Give the orchestrator a `Predictor` it can race under a deadline
//          without knowing it's talking to HTTP underneath.
// Dependencies: reqwest, fraud_core, serde, tracing
// ============================================================================

//! ## Overview
//! Request/response shape grounded on `call_model_serving` in the original
//! Python decision engine's `app/orchestrator.py`: `POST {base}/predict` with
//! `{transaction_id, features}`, response `{score, top_features,
//! model_version, prediction_time_ms}`. `features` here is a flattened view
//! of the transaction plus velocity counters, mirroring what the Python
//! orchestrator assembled before calling out.

use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use fraud_core::interfaces::Predictor;
use fraud_core::interfaces::PredictorError;
use fraud_core::interfaces::PredictorOutcome;
use fraud_core::model::TransactionEvent;
use serde::Deserialize;
use serde::Serialize;

use crate::http::HttpClientError;
use crate::http::HttpProviderConfig;
use crate::http::build_http_client;
use crate::http::read_response_limited;

/// Outbound request body for `POST {base}/predict`.
#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    transaction_id: &'a str,
    tenant_id: &'a str,
    amount: f64,
    currency: &'a str,
    merchant_id: &'a str,
    merchant_category: &'a str,
    merchant_country: &'a str,
    card_type: &'a str,
    channel: Option<&'a str>,
}

/// Inbound response body from the model-serving collaborator.
#[derive(Debug, Deserialize)]
struct PredictResponse {
    score: f64,
    #[serde(default)]
    top_features: Vec<String>,
    model_version: String,
    #[serde(default)]
    prediction_time_ms: u64,
}

/// HTTP-backed [`Predictor`] calling the model-serving collaborator
/// (`spec.md` §6 "Downstream HTTP to ML").
pub struct HttpPredictor {
    client: reqwest::Client,
    config: HttpProviderConfig,
}

impl HttpPredictor {
    /// Builds a client against `config`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError`] if `config.base_url` is invalid or the
    /// underlying `reqwest::Client` fails to build.
    pub fn new(config: HttpProviderConfig) -> Result<Self, HttpClientError> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    fn predict_url(&self) -> String {
        format!("{}/predict", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    async fn predict(&self, event: &TransactionEvent) -> Result<PredictorOutcome, PredictorError> {
        let started = Instant::now();
        let request = PredictRequest {
            transaction_id: &event.event_id,
            tenant_id: &event.tenant_id,
            amount: event.amount,
            currency: &event.currency,
            merchant_id: &event.merchant.id,
            merchant_category: &event.merchant.mcc,
            merchant_country: &event.merchant.country,
            card_type: match event.card.card_type {
                fraud_core::model::CardType::Physical => "physical",
                fraud_core::model::CardType::Virtual => "virtual",
            },
            channel: event.context.channel.map(|channel| match channel {
                fraud_core::model::Channel::App => "app",
                fraud_core::model::Channel::Web => "web",
                fraud_core::model::Channel::Pos => "pos",
                fraud_core::model::Channel::Atm => "atm",
            }),
        };

        let response = self
            .client
            .post(self.predict_url())
            .json(&request)
            .send()
            .await
            .map_err(|err| classify_transport_error(&err, self.config.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(PredictorError::Failed(format!("model serving returned {status}")));
        }

        let body = read_response_limited(response, self.config.max_response_bytes)
            .await
            .map_err(|err| PredictorError::Failed(err.to_string()))?;
        let parsed: PredictResponse =
            serde_json::from_slice(&body).map_err(|err| PredictorError::Failed(err.to_string()))?;

        tracing::debug!(
            transaction_id = %event.event_id,
            score = parsed.score,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model prediction complete"
        );

        Ok(PredictorOutcome {
            score: parsed.score,
            top_features: parsed.top_features,
            model_version: parsed.model_version,
            prediction_time_ms: parsed.prediction_time_ms,
        })
    }
}

/// Maps a `reqwest::Error` onto [`PredictorError`], distinguishing a client-
/// side timeout from other transport failures so the orchestrator can
/// attribute latency correctly (`spec.md` §4.1 step 4 "independent
/// deadlines").
fn classify_transport_error(err: &reqwest::Error, timeout: Duration) -> PredictorError {
    if err.is_timeout() {
        PredictorError::Timeout(timeout)
    } else {
        PredictorError::Failed(err.to_string())
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

    #[test]
    fn predict_url_strips_trailing_slash() {
        let config = HttpProviderConfig::in_cluster("http://model-serving:8080/", Duration::from_millis(30));
        let predictor = HttpPredictor::new(config).expect("client builds");
        assert_eq!(predictor.predict_url(), "http://model-serving:8080/predict");
    }
}
