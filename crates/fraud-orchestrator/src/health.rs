// crates/fraud-orchestrator/src/health.rs
// ============================================================================
// Module: Dependency health aggregation
// Description: Concurrently polls every injected collaborator's readiness
//              and rolls the results up into one report for `GET /health`.
// Purpose: Give operators one place to see which collaborator is degraded
//          without inferring it from scoring latency or error logs.
// Dependencies: fraud-core
// ============================================================================

use std::collections::BTreeMap;

/// Overall health rollup (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Every dependency reported ready (or is intentionally disabled).
    Healthy,
    /// A non-critical dependency is unreachable; scoring can still proceed.
    Degraded,
    /// A critical dependency is unreachable; scoring cannot proceed.
    Unhealthy,
}

/// One dependency's readiness result, rendered the way `spec.md` §6 shows
/// the `dependencies` map: `"healthy"`, `"disabled"`, or
/// `"unhealthy: <reason>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyState {
    /// The dependency reported ready.
    Healthy,
    /// The dependency is intentionally not wired (e.g. Kafka publishing
    /// turned off by configuration).
    Disabled,
    /// The dependency's readiness probe failed, carrying its error text.
    Unhealthy(String),
}

impl DependencyState {
    /// Builds a state from a readiness probe's result.
    pub fn from_result<E: std::fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::Healthy,
            Err(err) => Self::Unhealthy(err.to_string()),
        }
    }

    /// Whether this dependency blocks the `Healthy`/`Degraded` rollup, i.e.
    /// is neither ready nor intentionally disabled.
    #[must_use]
    pub const fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl serde::Serialize for DependencyState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Healthy => serializer.serialize_str("healthy"),
            Self::Disabled => serializer.serialize_str("disabled"),
            Self::Unhealthy(reason) => serializer.serialize_str(&format!("unhealthy: {reason}")),
        }
    }
}

/// One named collaborator's place in the health rollup: its probed state,
/// and whether its failure should be treated as `Degraded` (scoring still
/// proceeds, just with reduced protection or observability) or `Unhealthy`
/// (scoring cannot proceed at all).
struct Dependency {
    /// The collaborator's display name in the `dependencies` map.
    name: &'static str,
    /// Its probed readiness state.
    state: DependencyState,
    /// `true` if this collaborator's failure should escalate the overall
    /// rollup to `Unhealthy` rather than merely `Degraded`.
    critical: bool,
}

/// The `dependencies` portion of `GET /health`'s payload, plus the derived
/// overall [`HealthStatus`] (`spec.md` §6). `service`/`version`/`timestamp`
/// are deployment-level concerns the orchestrator has no opinion on; those
/// are layered on by the HTTP binary.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct HealthReport {
    /// Overall rollup across every dependency.
    pub status: HealthStatus,
    /// Per-dependency detail, keyed by collaborator name.
    pub dependencies: BTreeMap<String, DependencyState>,
}

impl HealthReport {
    /// Builds a report from the orchestrator's five probed collaborators.
    ///
    /// Only the audit store is treated as critical: every other
    /// collaborator degrades in place per `spec.md` §7/§9 (idempotency and
    /// velocity fail open, the rule cache fail-statics, the publisher is
    /// fire-and-forget), so their unavailability never stops `score` from
    /// returning a decision. Without durable storage, however, the service
    /// cannot honor its WORM audit contract at all, so that one failure
    /// escalates the rollup to `Unhealthy`.
    #[must_use]
    pub fn from_dependencies(
        idempotency: DependencyState,
        velocity: DependencyState,
        rules: DependencyState,
        audit: DependencyState,
        publisher: DependencyState,
    ) -> Self {
        let entries = [
            Dependency { name: "idempotency_store", state: idempotency, critical: false },
            Dependency { name: "velocity_tracker", state: velocity, critical: false },
            Dependency { name: "rule_engine", state: rules, critical: false },
            Dependency { name: "audit_store", state: audit, critical: true },
            Dependency { name: "publisher", state: publisher, critical: false },
        ];

        let mut any_critical_unhealthy = false;
        let mut any_unhealthy = false;
        let mut dependencies = BTreeMap::new();
        for dep in entries {
            if dep.state.is_unhealthy() {
                any_unhealthy = true;
                any_critical_unhealthy |= dep.critical;
            }
            dependencies.insert(dep.name.to_owned(), dep.state);
        }

        let status = if any_critical_unhealthy {
            HealthStatus::Unhealthy
        } else if any_unhealthy {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self { status, dependencies }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn all_healthy_dependencies_roll_up_to_healthy() {
        let report = HealthReport::from_dependencies(
            DependencyState::Healthy,
            DependencyState::Healthy,
            DependencyState::Healthy,
            DependencyState::Healthy,
            DependencyState::Disabled,
        );
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.dependencies["publisher"], DependencyState::Disabled);
    }

    #[test]
    fn unhealthy_non_critical_dependency_degrades_the_rollup() {
        let report = HealthReport::from_dependencies(
            DependencyState::Unhealthy("connection refused".to_owned()),
            DependencyState::Healthy,
            DependencyState::Healthy,
            DependencyState::Healthy,
            DependencyState::Healthy,
        );
        assert_eq!(report.status, HealthStatus::Degraded);
    }

    #[test]
    fn unhealthy_audit_store_is_unhealthy_overall() {
        let report = HealthReport::from_dependencies(
            DependencyState::Healthy,
            DependencyState::Healthy,
            DependencyState::Healthy,
            DependencyState::Unhealthy("pool exhausted".to_owned()),
            DependencyState::Healthy,
        );
        assert_eq!(report.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn dependency_state_serializes_to_spec_shaped_strings() {
        assert_eq!(serde_json::to_string(&DependencyState::Healthy).unwrap(), "\"healthy\"");
        assert_eq!(serde_json::to_string(&DependencyState::Disabled).unwrap(), "\"disabled\"");
        assert_eq!(
            serde_json::to_string(&DependencyState::Unhealthy("boom".to_owned())).unwrap(),
            "\"unhealthy: boom\""
        );
    }
}
