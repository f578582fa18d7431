use super::model::classify_gap;
use super::reflection::reflection_for;
use crate::error::{DbError, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

pub struct TemporalRepository {
    pool: Arc<SqlitePool>,
}

impl TemporalRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Read the persona's temporal state without mutating it. Returns
    /// `None` if the persona has never been invoked before — the "no
    /// prior" case that makes the temporal layer `null` (§8 Scenario A).
    pub async fn peek(&self, persona_id: &str) -> Result<Option<(DateTime<Utc>, i64, Option<String>)>> {
        let row = sqlx::query(
            "SELECT last_active, invocation_count, last_topic FROM persona_temporal_state WHERE persona_id = ?1",
        )
        .bind(persona_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(DbError::from)?;

        let Some(row) = row else { return Ok(None) };
        let last_active: Option<String> = row.try_get("last_active").map_err(DbError::from)?;
        let Some(last_active) = last_active else { return Ok(None) };

        let invocation_count: i64 = row.try_get("invocation_count").map_err(DbError::from)?;
        let last_topic: Option<String> = row.try_get("last_topic").map_err(DbError::from)?;
        let last_active = DateTime::parse_from_rfc3339(&last_active)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Some((last_active, invocation_count, last_topic)))
    }

    /// Compute the reflection line for the current invocation against
    /// the persona's stored state, without mutating it.
    pub async fn reflection_for_invocation(&self, persona_id: &str) -> Result<Option<String>> {
        let Some((last_active, _, last_topic)) = self.peek(persona_id).await? else {
            return Ok(None);
        };

        let elapsed = Utc::now() - last_active;
        let Some(gap) = classify_gap(elapsed) else {
            return Ok(None);
        };

        Ok(reflection_for(gap, last_topic.as_deref(), Utc::now().timestamp() as u64))
    }

    /// Touch the persona's temporal state: bump `invocation_count`,
    /// stamp `last_active`, and optionally update `last_topic`. Also
    /// appends a best-effort `temporal_events` row recording the gap
    /// class observed at this touch, for audit/analytics.
    pub async fn touch(&self, persona_id: &str, user_id: &str, last_topic: Option<&str>) -> Result<()> {
        let previous = self.peek(persona_id).await?;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO persona_temporal_state (persona_id, last_active, invocation_count, last_topic)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT(persona_id) DO UPDATE SET
                last_active = excluded.last_active,
                invocation_count = persona_temporal_state.invocation_count + 1,
                last_topic = COALESCE(excluded.last_topic, persona_temporal_state.last_topic)",
        )
        .bind(persona_id)
        .bind(now.to_rfc3339())
        .bind(last_topic)
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;

        if let Some((last_active, _, stored_topic)) = previous {
            let elapsed = now - last_active;
            if let Some(gap) = classify_gap(elapsed) {
                let reflection = reflection_for(gap, stored_topic.as_deref(), now.timestamp() as u64);
                sqlx::query(
                    "INSERT INTO temporal_events (id, persona_id, user_id, gap_class, reflection, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .bind(Uuid::new_v4().to_string())
                .bind(persona_id)
                .bind(user_id)
                .bind(gap.as_str())
                .bind(reflection)
                .bind(now.to_rfc3339())
                .execute(&*self.pool)
                .await
                .map_err(DbError::from)?;
            }
        }

        Ok(())
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
    async fn first_invocation_has_no_reflection() {
        let repo = TemporalRepository::new(pool().await);
        assert!(repo.reflection_for_invocation("p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn touch_increments_invocation_count() {
        let repo = TemporalRepository::new(pool().await);
        repo.touch("p1", "u1", Some("freedom")).await.unwrap();
        repo.touch("p1", "u1", None).await.unwrap();
        let (_, count, topic) = repo.peek("p1").await.unwrap().unwrap();
        assert_eq!(count, 2);
        assert_eq!(topic.as_deref(), Some("freedom"));
    }
}
