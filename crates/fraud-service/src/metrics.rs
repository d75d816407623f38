// crates/fraud-service/src/metrics.rs
// ============================================================================
// Module: Prometheus metrics
// Description: Request counters, a decision counter, a score histogram, and
//              a latency histogram exposed at `GET /metrics`, registered
//              against one private `Registry`.
// Purpose: Give operators endpoint/status breakdowns, decision-type
//          breakdowns, score distribution, and latency percentiles without
//          coupling the HTTP layer to a global/static registry.
// Dependencies: prometheus, fraud-core
// ============================================================================

use fraud_core::model::DecisionType;
use prometheus::Encoder;
use prometheus::Histogram;
use prometheus::HistogramOpts;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;

/// Latency histogram buckets, in milliseconds, shaped around the service's
/// sub-100ms total budget (`spec.md` §1).
const LATENCY_BUCKETS_MS: &[f64] = &[5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 150.0, 250.0, 500.0, 1000.0];

/// ML risk-score histogram buckets (`spec.md` §6: "score histogram with
/// buckets `[0.0, 0.1, …, 1.0]`").
const SCORE_BUCKETS: &[f64] = &[0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Request-scoped metrics for every handler.
pub struct Metrics {
    /// Backing registry, gathered by the `/metrics` handler.
    registry: Registry,
    /// Every request, labeled by endpoint, HTTP method, and response status
    /// (`spec.md` §6: "request counter by endpoint/method/status").
    requests_total: IntCounterVec,
    /// Scored requests, labeled by terminal decision.
    decisions_total: IntCounterVec,
    /// ML risk score distribution of scored requests that returned one.
    score_distribution: Histogram,
    /// End-to-end scoring latency, in milliseconds.
    score_latency_ms: Histogram,
}

impl Metrics {
    /// Builds and registers every metric against a fresh [`Registry`].
    ///
    /// # Panics
    ///
    /// Panics if a metric cannot be registered, which only happens on a
    /// duplicate name within this same registry — a programmer error, not a
    /// runtime condition.
    #[must_use]
    #[allow(clippy::expect_used, reason = "Metric registration failing here means two metrics share a name; that's a startup bug, not a runtime condition to recover from.")]
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("fraud_requests_total", "Requests by endpoint, HTTP method, and response status."),
            &["endpoint", "method", "status"],
        )
        .expect("requests_total metric is well-formed");
        registry.register(Box::new(requests_total.clone())).expect("requests_total registers");

        let decisions_total = IntCounterVec::new(
            Opts::new("fraud_decisions_total", "Scored requests by terminal decision."),
            &["decision"],
        )
        .expect("decisions_total metric is well-formed");
        registry.register(Box::new(decisions_total.clone())).expect("decisions_total registers");

        let score_distribution = Histogram::with_opts(
            HistogramOpts::new("fraud_score_distribution", "ML risk score distribution of scored requests.")
                .buckets(SCORE_BUCKETS.to_vec()),
        )
        .expect("score_distribution metric is well-formed");
        registry.register(Box::new(score_distribution.clone())).expect("score_distribution registers");

        let score_latency_ms = Histogram::with_opts(
            HistogramOpts::new("fraud_score_latency_ms", "End-to-end POST /v1/score latency, in milliseconds.")
                .buckets(LATENCY_BUCKETS_MS.to_vec()),
        )
        .expect("score_latency_ms metric is well-formed");
        registry.register(Box::new(score_latency_ms.clone())).expect("score_latency_ms registers");

        Self { registry, requests_total, decisions_total, score_distribution, score_latency_ms }
    }

    /// Records one handled HTTP request (`spec.md` §6).
    pub fn record_request(&self, endpoint: &str, method: &str, status: u16) {
        self.requests_total.with_label_values(&[endpoint, method, &status.to_string()]).inc();
    }

    /// Records one completed scoring request: its terminal decision, the ML
    /// score it carried (if the predictor call succeeded), and its latency.
    pub fn record_decision(&self, decision: DecisionType, score: Option<f64>, latency_ms: u64) {
        self.decisions_total.with_label_values(&[decision_label(decision)]).inc();
        if let Some(score) = score {
            self.score_distribution.observe(score);
        }
        #[allow(clippy::cast_precision_loss, reason = "Millisecond latencies fit comfortably in an f64 mantissa.")]
        let latency = latency_ms as f64;
        self.score_latency_ms.observe(latency);
    }

    /// Renders every registered metric in the Prometheus text exposition
    /// format.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the underlying buffer write fails, which
    /// does not happen for an in-memory `Vec<u8>` target in practice.
    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(buffer)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// The label value a [`DecisionType`] is reported under.
const fn decision_label(decision: DecisionType) -> &'static str {
    match decision {
        DecisionType::Allow => "allow",
        DecisionType::Challenge => "challenge",
        DecisionType::Deny => "deny",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn recorded_decisions_are_reflected_in_the_encoded_output() {
        let metrics = Metrics::new();
        metrics.record_decision(DecisionType::Deny, Some(0.95), 42);
        let encoded = String::from_utf8(metrics.encode().expect("metrics encode")).expect("utf8 output");
        assert!(encoded.contains("fraud_decisions_total"));
        assert!(encoded.contains("decision=\"deny\""));
        assert!(encoded.contains("fraud_score_distribution"));
    }

    #[test]
    fn missing_score_is_not_observed_in_the_score_distribution() {
        let metrics = Metrics::new();
        metrics.record_decision(DecisionType::Challenge, None, 42);
        let encoded = String::from_utf8(metrics.encode().expect("metrics encode")).expect("utf8 output");
        assert!(encoded.contains("fraud_score_distribution_count 0"));
    }

    #[test]
    fn recorded_requests_are_reflected_in_the_encoded_output() {
        let metrics = Metrics::new();
        metrics.record_request("/v1/score", "POST", 200);
        let encoded = String::from_utf8(metrics.encode().expect("metrics encode")).expect("utf8 output");
        assert!(encoded.contains("fraud_requests_total"));
        assert!(encoded.contains("endpoint=\"/v1/score\""));
        assert!(encoded.contains("method=\"POST\""));
        assert!(encoded.contains("status=\"200\""));
    }

    #[test]
    fn fresh_metrics_encode_without_error() {
        let metrics = Metrics::new();
        assert!(metrics.encode().is_ok());
    }
}
