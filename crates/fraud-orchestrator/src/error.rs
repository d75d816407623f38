// crates/fraud-orchestrator/src/error.rs
// ============================================================================
// Module: Orchestrator error
// Description: The narrow set of failures that cannot be degraded away and
//              must surface to the caller instead of producing a decision.
// Purpose: Keep `Orchestrator::score`'s happy/degraded paths infallible-in-
//          practice; every other collaborator failure is absorbed and
//          logged per `spec.md` §7's "structured results, not exceptions"
//          propagation policy.
// Dependencies: fraud-core, thiserror
// ============================================================================

use fraud_core::interfaces::AuditStoreError;
use thiserror::Error;

/// Failures `Orchestrator::score` cannot degrade around.
///
/// Every other dependency failure (idempotency store, velocity tracker,
/// predictor, rule engine, publisher) has a documented fail-open or
/// fail-static behaviour and never reaches this type. Only the audit
/// store's replay path can leave the orchestrator with no safe decision to
/// return: the idempotency store says a decision for this fingerprint
/// already exists, but the decision itself cannot be produced.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The idempotency store reports an existing decision for this
    /// fingerprint, but the audit store could not be reached to retrieve it.
    #[error("replay lookup for decision {decision_id} failed: {source}")]
    ReplayLookupFailed {
        /// The previously assigned decision identifier.
        decision_id: String,
        /// The underlying audit store failure.
        #[source]
        source: AuditStoreError,
    },
    /// The idempotency store reports an existing decision for this
    /// fingerprint, but it has not yet been persisted (a narrow race between
    /// one request's `check_and_set` and its own decision write).
    #[error("decision {decision_id} is still being recorded; retry shortly")]
    ReplayPending {
        /// The previously assigned decision identifier.
        decision_id: String,
    },
}
