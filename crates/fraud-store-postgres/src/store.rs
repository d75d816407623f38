// crates/fraud-store-postgres/src/store.rs
// ============================================================================
// Module: Postgres audit store
// Description: `AuditStore` implementation over `sqlx::PgPool`, plus the
//              SCA challenge completion/lookup pair supplemented from
//              `original_source/.../sca.py`.
// Purpose: Persist events, decisions, the WORM audit log, and SCA challenges
//          the way `spec.md` section 4.6 and section FULL-4.8.1 require.
// Dependencies: sqlx, fraud-core, fraud-config, time
// ============================================================================

//! ## Overview
//! Ported from the original Python decision engine's `app/storage.py`
//! (`store_event`/`store_decision`/`get_decision`/`store_audit_log`) and
//! `app/audit.py` (HMAC signing), plus `app/sca.py`'s
//! `complete_sca_challenge`/`get_sca_challenge`. `event_hash` and
//! `sign_audit_entry` both come from [`fraud_core::hashing`] rather than
//! being reimplemented here.

use async_trait::async_trait;
use fraud_config::PostgresConfig;
use fraud_core::hashing::event_hash;
use fraud_core::hashing::sign_audit_entry;
use fraud_core::hashing::AuditSignaturePayload;
use fraud_core::interfaces::AuditStore;
use fraud_core::interfaces::AuditStoreError;
use fraud_core::model::Decision;
use fraud_core::model::DecisionType;
use fraud_core::model::SCAChallenge;
use fraud_core::model::SCAStatus;
use fraud_core::model::Thresholds;
use fraud_core::model::TransactionEvent;
use fraud_core::sca::SCALevel;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::map_sqlx_error;
use crate::MIGRATOR;

/// Postgres-backed [`AuditStore`].
pub struct PostgresAuditStore {
    /// Connection pool.
    pool: PgPool,
    /// HMAC secret used to sign every audit log entry this store writes.
    hmac_secret: String,
}

impl PostgresAuditStore {
    /// Builds a store from `config`, eagerly establishing the connection
    /// pool (min/max sizes per `config`).
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError::Unavailable`] if the pool cannot connect.
    pub async fn connect(config: &PostgresConfig, hmac_secret: impl Into<String>) -> Result<Self, AuditStoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .connect(&config.connection_url())
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self { pool, hmac_secret: hmac_secret.into() })
    }

    /// Runs the embedded schema migrations, including the WORM trigger on
    /// `audit_logs`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError::Unavailable`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), AuditStoreError> {
        MIGRATOR.run(&self.pool).await.map_err(|err| AuditStoreError::Unavailable(err.to_string()))
    }

    /// Marks `challenge_id` as completed with `status`, stamping
    /// `completed_at`.
    ///
    /// Out of scope for the orchestrator's hot path (`spec.md` section 1:
    /// "Authentication challenge UX ... out of scope"), but kept here as the
    /// storage half of that collaborator per `SPEC_FULL.md` FULL-4.8.1.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError::Unavailable`] if the row does not exist or
    /// the store cannot be reached.
    pub async fn complete_challenge(
        &self,
        challenge_id: i64,
        status: SCAStatus,
    ) -> Result<SCAChallenge, AuditStoreError> {
        let now = OffsetDateTime::now_utc();
        let row = sqlx::query_as::<_, ChallengeRow>(
            "UPDATE sca_challenges SET status = $1, completed_at = $2 WHERE challenge_id = $3 \
             RETURNING challenge_id, user_id, transaction_id, risk_score, challenge_type, status, created_at, completed_at",
        )
        .bind(sca_status_str(status))
        .bind(now)
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.ok_or_else(|| AuditStoreError::Unavailable(format!("no sca_challenge with id {challenge_id}")))?
            .into_challenge()
    }

    /// Looks up a SCA challenge by id.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError::Unavailable`] if the store cannot be
    /// reached.
    pub async fn get_challenge(&self, challenge_id: i64) -> Result<Option<SCAChallenge>, AuditStoreError> {
        let row = sqlx::query_as::<_, ChallengeRow>(
            "SELECT challenge_id, user_id, transaction_id, risk_score, challenge_type, status, created_at, completed_at \
             FROM sca_challenges WHERE challenge_id = $1",
        )
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.map(ChallengeRow::into_challenge).transpose()
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn store_event(&self, event: &TransactionEvent) -> Result<(), AuditStoreError> {
        let now = OffsetDateTime::now_utc();
        let hash = event_hash(&event.event_id, &event.tenant_id, now, event)
            .map_err(|err| AuditStoreError::Unavailable(err.to_string()))?;
        let payload = serde_json::to_value(event).map_err(|err| AuditStoreError::Unavailable(err.to_string()))?;

        sqlx::query(
            "INSERT INTO events (event_id, tenant_id, hash, payload, created_at) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(&event.event_id)
        .bind(&event.tenant_id)
        .bind(&hash)
        .bind(&payload)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn store_decision(&self, decision: &Decision) -> Result<(), AuditStoreError> {
        let thresholds =
            serde_json::to_value(decision.thresholds).map_err(|err| AuditStoreError::Unavailable(err.to_string()))?;
        let latency_ms = i64::try_from(decision.latency_ms).unwrap_or(i64::MAX);

        sqlx::query(
            "INSERT INTO decisions \
             (decision_id, event_id, tenant_id, decision, score, reasons, rule_hits, latency_ms, model_version, \
              thresholds, requires_2fa, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(&decision.decision_id)
        .bind(&decision.event_id)
        .bind(&decision.tenant_id)
        .bind(decision.decision.to_string())
        .bind(decision.score)
        .bind(&decision.reasons)
        .bind(&decision.rule_hits)
        .bind(latency_ms)
        .bind(&decision.model_version)
        .bind(thresholds)
        .bind(decision.requires_2fa)
        .bind(decision.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_decision(&self, decision_id: &str) -> Result<Option<Decision>, AuditStoreError> {
        let row = sqlx::query_as::<_, DecisionRow>(
            "SELECT decision_id, event_id, tenant_id, decision, score, reasons, rule_hits, latency_ms, \
             model_version, thresholds, requires_2fa, created_at FROM decisions WHERE decision_id = $1",
        )
        .bind(decision_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.map(DecisionRow::into_decision).transpose()
    }

    async fn store_audit_log(
        &self,
        actor: &str,
        action: &str,
        entity: &str,
        entity_id: &str,
        details: Option<serde_json::Value>,
        ip_address: Option<&str>,
    ) -> Result<(), AuditStoreError> {
        let now = OffsetDateTime::now_utc();
        let timestamp =
            now.format(&Rfc3339).map_err(|err| AuditStoreError::Unavailable(err.to_string()))?;
        let details = details.unwrap_or_else(|| serde_json::json!({}));
        let payload = AuditSignaturePayload { actor, action, entity, entity_id, timestamp, details: details.clone(), ip_address };
        let signature =
            sign_audit_entry(&self.hmac_secret, &payload).map_err(|err| AuditStoreError::Unavailable(err.to_string()))?;

        sqlx::query(
            "INSERT INTO audit_logs (actor, action, entity, entity_id, before_state, after_state, ts, signature) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(actor)
        .bind(action)
        .bind(entity)
        .bind(entity_id)
        .bind(Option::<serde_json::Value>::None)
        .bind(&details)
        .bind(now)
        .bind(signature)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn create_sca_challenge(
        &self,
        user_id: &str,
        transaction_id: &str,
        risk_score: f64,
        challenge_type: SCALevel,
    ) -> Result<SCAChallenge, AuditStoreError> {
        let now = OffsetDateTime::now_utc();
        let row = sqlx::query_as::<_, ChallengeRow>(
            "INSERT INTO sca_challenges (user_id, transaction_id, risk_score, challenge_type, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING challenge_id, user_id, transaction_id, risk_score, challenge_type, status, created_at, completed_at",
        )
        .bind(user_id)
        .bind(transaction_id)
        .bind(risk_score)
        .bind(challenge_type.as_str())
        .bind(sca_status_str(SCAStatus::Pending))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.into_challenge()
    }

    async fn readiness(&self) -> Result<(), AuditStoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

/// Raw row shape returned by the `decisions` queries above.
#[derive(sqlx::FromRow)]
struct DecisionRow {
    /// See [`Decision::decision_id`].
    decision_id: String,
    /// See [`Decision::event_id`].
    event_id: String,
    /// See [`Decision::tenant_id`].
    tenant_id: String,
    /// Wire name of the terminal outcome (`"ALLOW"`/`"CHALLENGE"`/`"DENY"`).
    decision: String,
    /// See [`Decision::score`].
    score: Option<f64>,
    /// See [`Decision::reasons`].
    reasons: Vec<String>,
    /// See [`Decision::rule_hits`].
    rule_hits: Vec<String>,
    /// See [`Decision::latency_ms`].
    latency_ms: i64,
    /// See [`Decision::model_version`].
    model_version: String,
    /// See [`Decision::thresholds`], as the raw JSON column value.
    thresholds: serde_json::Value,
    /// See [`Decision::requires_2fa`].
    requires_2fa: bool,
    /// See [`Decision::created_at`].
    created_at: OffsetDateTime,
}

impl DecisionRow {
    /// Converts this row into the domain [`Decision`] type.
    fn into_decision(self) -> Result<Decision, AuditStoreError> {
        Ok(Decision {
            decision_id: self.decision_id,
            event_id: self.event_id,
            tenant_id: self.tenant_id,
            decision: parse_decision_type(&self.decision)?,
            score: self.score,
            reasons: self.reasons,
            rule_hits: self.rule_hits,
            latency_ms: u64::try_from(self.latency_ms).unwrap_or(0),
            model_version: self.model_version,
            thresholds: serde_json::from_value::<Thresholds>(self.thresholds)
                .map_err(|err| AuditStoreError::Unavailable(err.to_string()))?,
            created_at: self.created_at,
            requires_2fa: self.requires_2fa,
        })
    }
}

/// Raw row shape returned by the `sca_challenges` queries above.
#[derive(sqlx::FromRow)]
struct ChallengeRow {
    /// See [`SCAChallenge::challenge_id`].
    challenge_id: i64,
    /// See [`SCAChallenge::user_id`].
    user_id: String,
    /// See [`SCAChallenge::transaction_id`].
    transaction_id: String,
    /// See [`SCAChallenge::risk_score`].
    risk_score: f64,
    /// Wire name of the required step-up method.
    challenge_type: String,
    /// Wire name of the lifecycle state.
    status: String,
    /// See [`SCAChallenge::created_at`].
    created_at: OffsetDateTime,
    /// See [`SCAChallenge::completed_at`].
    completed_at: Option<OffsetDateTime>,
}

impl ChallengeRow {
    /// Converts this row into the domain [`SCAChallenge`] type.
    fn into_challenge(self) -> Result<SCAChallenge, AuditStoreError> {
        Ok(SCAChallenge {
            challenge_id: self.challenge_id,
            user_id: self.user_id,
            transaction_id: self.transaction_id,
            risk_score: self.risk_score,
            challenge_type: parse_sca_level(&self.challenge_type)?,
            status: parse_sca_status(&self.status)?,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

/// Parses a stored `decision` column value back into a [`DecisionType`].
fn parse_decision_type(value: &str) -> Result<DecisionType, AuditStoreError> {
    match value {
        "ALLOW" => Ok(DecisionType::Allow),
        "CHALLENGE" => Ok(DecisionType::Challenge),
        "DENY" => Ok(DecisionType::Deny),
        other => Err(AuditStoreError::Unavailable(format!("unrecognised decision value '{other}'"))),
    }
}

/// Parses a stored `challenge_type` column value back into a [`SCALevel`].
fn parse_sca_level(value: &str) -> Result<SCALevel, AuditStoreError> {
    match value {
        "NONE" => Ok(SCALevel::None),
        "OTP_SMS" => Ok(SCALevel::OtpSms),
        "OTP_EMAIL" => Ok(SCALevel::OtpEmail),
        "BIOMETRIC" => Ok(SCALevel::Biometric),
        "PUSH_NOTIFICATION" => Ok(SCALevel::PushNotification),
        "HARDWARE_TOKEN" => Ok(SCALevel::HardwareToken),
        other => Err(AuditStoreError::Unavailable(format!("unrecognised challenge_type value '{other}'"))),
    }
}

/// The wire name a [`SCAStatus`] is stored under.
const fn sca_status_str(status: SCAStatus) -> &'static str {
    match status {
        SCAStatus::Pending => "PENDING",
        SCAStatus::Completed => "COMPLETED",
        SCAStatus::Failed => "FAILED",
        SCAStatus::Expired => "EXPIRED",
        SCAStatus::Bypassed => "BYPASSED",
    }
}

/// Parses a stored `status` column value back into a [`SCAStatus`].
fn parse_sca_status(value: &str) -> Result<SCAStatus, AuditStoreError> {
    match value {
        "PENDING" => Ok(SCAStatus::Pending),
        "COMPLETED" => Ok(SCAStatus::Completed),
        "FAILED" => Ok(SCAStatus::Failed),
        "EXPIRED" => Ok(SCAStatus::Expired),
        "BYPASSED" => Ok(SCAStatus::Bypassed),
        other => Err(AuditStoreError::Unavailable(format!("unrecognised status value '{other}'"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn decision_type_round_trips_through_its_wire_name() {
        for decision in [DecisionType::Allow, DecisionType::Challenge, DecisionType::Deny] {
            let parsed = parse_decision_type(&decision.to_string()).unwrap();
            assert_eq!(parsed, decision);
        }
    }

    #[test]
    fn sca_status_round_trips_through_its_wire_name() {
        for status in
            [SCAStatus::Pending, SCAStatus::Completed, SCAStatus::Failed, SCAStatus::Expired, SCAStatus::Bypassed]
        {
            let parsed = parse_sca_status(sca_status_str(status)).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn sca_level_round_trips_through_its_wire_name() {
        for level in [
            SCALevel::None,
            SCALevel::OtpSms,
            SCALevel::OtpEmail,
            SCALevel::Biometric,
            SCALevel::PushNotification,
            SCALevel::HardwareToken,
        ] {
            let parsed = parse_sca_level(level.as_str()).unwrap();
            assert_eq!(parsed, level);
        }
    }

    #[test]
    fn unrecognised_decision_value_is_rejected() {
        assert!(parse_decision_type("NOT_A_DECISION").is_err());
    }
}
