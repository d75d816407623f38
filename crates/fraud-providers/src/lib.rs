// crates/fraud-providers/src/lib.rs
// ============================================================================
// Crate: fraud-providers
// Description: SSRF-hardened async HTTP client to the ML model-serving
//              collaborator, implementing `fraud_core::interfaces::Predictor`.
// Purpose: Keep network I/O and its defensive posture (timeouts, response
//          size caps, scheme checks) out of the orchestrator's control flow.
// Dependencies: fraud-core, reqwest
// ============================================================================

//! Async HTTP collaborator clients for the fraud decision service.
//!
//! The Rules boundary (`spec.md` §4.3) is served in-process by
//! `fraud-rules`, not over HTTP, so this crate's sole production
//! implementation is [`predictor::HttpPredictor`] against the ML
//! model-serving collaborator named by `MODEL_SERVING_URL`.

pub mod http;
pub mod predictor;

pub use http::HttpClientError;
pub use http::HttpProviderConfig;
pub use predictor::HttpPredictor;
