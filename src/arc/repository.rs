use super::momentum::{analyze_message_momentum, apply_delta, momentum_effects, MomentumEffects, SESSION_END_DELTA};
use super::phase::{transition, Phase};
use crate::error::{DbError, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Narrative Gravity arc state for a single session, persisted in
/// `narrative_arcs` (§4.5). Lazily materializes a RISING/0.5 row the
/// first time a session is touched, mirroring the relationship
/// module's "stranger/0" lazy-materialization pattern.
pub struct ArcRepository {
    pool: Arc<SqlitePool>,
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl ArcRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn row_to_state(row: &sqlx::sqlite::SqliteRow) -> std::result::Result<(Phase, f64, Option<DateTime<Utc>>), sqlx::Error> {
        let phase: String = row.try_get("phase")?;
        let momentum: f64 = row.try_get("momentum")?;
        let apex_reached_at: Option<String> = row.try_get("apex_reached_at")?;
        Ok((Phase::parse(&phase), momentum, apex_reached_at.map(|s| parse_rfc3339(&s))))
    }

    async fn get_or_create(&self, session_id: &str) -> Result<(Phase, f64, Option<DateTime<Utc>>)> {
        sqlx::query(
            "INSERT INTO narrative_arcs (session_id, phase, momentum, apex_reached_at, updated_at)
             VALUES (?1, 'rising', 0.5, NULL, ?2)
             ON CONFLICT(session_id) DO NOTHING",
        )
        .bind(session_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;

        let row = sqlx::query("SELECT phase, momentum, apex_reached_at FROM narrative_arcs WHERE session_id = ?1")
            .bind(session_id)
            .fetch_one(&*self.pool)
            .await
            .map_err(DbError::from)?;

        Self::row_to_state(&row).map_err(|e| DbError::from(e).into())
    }

    async fn save(&self, session_id: &str, phase: Phase, momentum: f64, apex_reached_at: Option<DateTime<Utc>>) -> Result<()> {
        sqlx::query(
            "UPDATE narrative_arcs SET phase = ?1, momentum = ?2, apex_reached_at = ?3, updated_at = ?4 WHERE session_id = ?5",
        )
        .bind(phase.as_str())
        .bind(momentum)
        .bind(apex_reached_at.map(|dt| dt.to_rfc3339()))
        .bind(Utc::now().to_rfc3339())
        .bind(session_id)
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    /// Advance the arc by one user message: compute the momentum delta,
    /// apply it, run the hysteresis transition, persist, and return the
    /// resulting layer effects (§4.5).
    pub async fn advance(&self, session_id: &str, message: &str) -> Result<(Phase, f64, MomentumEffects)> {
        let (phase, momentum, apex_reached_at) = self.get_or_create(session_id).await?;

        let delta = analyze_message_momentum(message, phase);
        let new_momentum = apply_delta(momentum, delta);
        let (new_phase, new_apex_reached_at) = transition(phase, new_momentum, apex_reached_at, Utc::now());

        self.save(session_id, new_phase, new_momentum, new_apex_reached_at).await?;

        let effects = momentum_effects(new_phase, new_momentum);
        Ok((new_phase, new_momentum, effects))
    }

    /// Apply the session-end `-1.0` momentum delta, driving the arc
    /// toward IMPACT (§4.5).
    pub async fn complete_session(&self, session_id: &str) -> Result<()> {
        let (phase, momentum, apex_reached_at) = self.get_or_create(session_id).await?;
        let new_momentum = apply_delta(momentum, SESSION_END_DELTA);
        let (new_phase, new_apex_reached_at) = transition(phase, new_momentum, apex_reached_at, Utc::now());
        self.save(session_id, new_phase, new_momentum, new_apex_reached_at).await
    }

    pub async fn current(&self, session_id: &str) -> Result<(Phase, f64)> {
        let (phase, momentum, _) = self.get_or_create(session_id).await?;
        Ok((phase, momentum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;

    async fn pool() -> Arc<SqlitePool> {
        let pool = Arc::new(SqlitePool::connect("sqlite::memory:").await.unwrap());
        init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn new_session_lazily_materializes_rising_half() {
        let repo = ArcRepository::new(pool().await);
        let (phase, momentum) = repo.current("s1").await.unwrap();
        assert_eq!(phase, Phase::Rising);
        assert_eq!(momentum, 0.5);
    }

    #[tokio::test]
    async fn advance_persists_new_phase_and_momentum() {
        let repo = ArcRepository::new(pool().await);
        let (phase, momentum, _) = repo
            .advance("s1", "Why do you reconcile the meaning of existence and truth?")
            .await
            .unwrap();
        assert!(momentum > 0.5);
        let (stored_phase, stored_momentum) = repo.current("s1").await.unwrap();
        assert_eq!(phase, stored_phase);
        assert_eq!(momentum, stored_momentum);
    }

    #[tokio::test]
    async fn session_completion_drives_toward_impact() {
        let repo = ArcRepository::new(pool().await);
        repo.advance("s1", "hi").await.unwrap();
        repo.complete_session("s1").await.unwrap();
        let (phase, momentum) = repo.current("s1").await.unwrap();
        assert_eq!(phase, Phase::Impact);
        assert_eq!(momentum, 0.0);
    }
}
