use super::model::{Relationship, TrustLevel};
use crate::error::{DbError, Result};
use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

const MAX_MEMORABLE_EXCHANGES: usize = 20;

pub struct RelationshipRepository {
    pool: Arc<SqlitePool>,
}

impl RelationshipRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn row_to_relationship(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<Relationship> {
        let prefs_json: Option<String> = row.try_get("user_preferences")?;
        let exchanges_json: Option<String> = row.try_get("memorable_exchanges")?;
        Ok(Relationship {
            user_id: row.try_get("user_id")?,
            persona_id: row.try_get("persona_id")?,
            familiarity_score: row.try_get("familiarity_score")?,
            trust_level: TrustLevel::parse(&row.try_get::<String, _>("trust_level")?),
            interaction_count: row.try_get("interaction_count")?,
            user_summary: row.try_get("user_summary")?,
            user_preferences: prefs_json
                .and_then(|s| serde_json::from_str::<Value>(&s).ok()),
            memorable_exchanges: exchanges_json
                .and_then(|s| serde_json::from_str::<Vec<String>>(&s).ok())
                .unwrap_or_default(),
        })
    }

    /// Lazily materialize on first lookup with a "stranger/0" default (§3).
    pub async fn get_or_create(&self, user_id: &str, persona_id: &str) -> Result<Relationship> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO relationships
                (user_id, persona_id, familiarity_score, trust_level, interaction_count, created_at, updated_at)
             VALUES (?1, ?2, 0.0, 'stranger', 0, ?3, ?3)
             ON CONFLICT(user_id, persona_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(persona_id)
        .bind(&now)
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;

        self.find(user_id, persona_id)
            .await?
            .ok_or_else(|| crate::error::WeaveError::Database(DbError::Query(
                "relationship upsert vanished".into(),
            )))
    }

    pub async fn find(&self, user_id: &str, persona_id: &str) -> Result<Option<Relationship>> {
        let row = sqlx::query("SELECT * FROM relationships WHERE user_id = ?1 AND persona_id = ?2")
            .bind(user_id)
            .bind(persona_id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(DbError::from)?;
        match row {
            Some(r) => Ok(Some(
                Self::row_to_relationship(&r).map_err(crate::error::WeaveError::Other)?,
            )),
            None => Ok(None),
        }
    }

    /// Persist a familiarity update produced at session completion (§4.4).
    /// Increments `interaction_count` by exactly 1 (§8 invariant 5).
    pub async fn apply_familiarity_update(
        &self,
        user_id: &str,
        persona_id: &str,
        new_familiarity: f64,
        new_trust_level: TrustLevel,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE relationships
             SET familiarity_score = ?1, trust_level = ?2,
                 interaction_count = interaction_count + 1, updated_at = ?3
             WHERE user_id = ?4 AND persona_id = ?5",
        )
        .bind(new_familiarity)
        .bind(new_trust_level.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .bind(persona_id)
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    pub async fn append_memorable_exchange(
        &self,
        user_id: &str,
        persona_id: &str,
        exchange: &str,
    ) -> Result<()> {
        let mut relationship = self.get_or_create(user_id, persona_id).await?;
        relationship.memorable_exchanges.push(exchange.to_string());
        if relationship.memorable_exchanges.len() > MAX_MEMORABLE_EXCHANGES {
            let overflow = relationship.memorable_exchanges.len() - MAX_MEMORABLE_EXCHANGES;
            relationship.memorable_exchanges.drain(0..overflow);
        }

        sqlx::query("UPDATE relationships SET memorable_exchanges = ?1, updated_at = ?2 WHERE user_id = ?3 AND persona_id = ?4")
            .bind(serde_json::to_string(&relationship.memorable_exchanges).unwrap_or_default())
            .bind(Utc::now().to_rfc3339())
            .bind(user_id)
            .bind(persona_id)
            .execute(&*self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    pub async fn set_user_summary_and_preferences(
        &self,
        user_id: &str,
        persona_id: &str,
        summary: Option<&str>,
        preferences: Option<&Value>,
    ) -> Result<()> {
        self.get_or_create(user_id, persona_id).await?;
        sqlx::query(
            "UPDATE relationships SET user_summary = ?1, user_preferences = ?2, updated_at = ?3
             WHERE user_id = ?4 AND persona_id = ?5",
        )
        .bind(summary)
        .bind(preferences.map(std::string::ToString::to_string))
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .bind(persona_id)
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;

    async fn fresh_pool() -> Arc<SqlitePool> {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        init_schema(&pool).await.unwrap();
        Arc::new(pool)
    }

    #[tokio::test]
    async fn get_or_create_lazily_materializes_stranger_zero() {
        let pool = fresh_pool().await;
        let repo = RelationshipRepository::new(pool);
        let rel = repo.get_or_create("u1", "p1").await.unwrap();
        assert_eq!(rel.trust_level, TrustLevel::Stranger);
        assert_eq!(rel.interaction_count, 0);
    }

    #[tokio::test]
    async fn apply_familiarity_update_increments_interaction_count_once() {
        let pool = fresh_pool().await;
        let repo = RelationshipRepository::new(pool);
        repo.get_or_create("u1", "p1").await.unwrap();
        repo.apply_familiarity_update("u1", "p1", 0.05, TrustLevel::Stranger)
            .await
            .unwrap();
        let rel = repo.find("u1", "p1").await.unwrap().unwrap();
        assert_eq!(rel.interaction_count, 1);
        assert!((rel.familiarity_score - 0.05).abs() < 1e-9);
    }

    #[tokio::test]
    async fn memorable_exchanges_bounded() {
        let pool = fresh_pool().await;
        let repo = RelationshipRepository::new(pool);
        for i in 0..25 {
            repo.append_memorable_exchange("u1", "p1", &format!("exchange {i}"))
                .await
                .unwrap();
        }
        let rel = repo.find("u1", "p1").await.unwrap().unwrap();
        assert_eq!(rel.memorable_exchanges.len(), 20);
        assert_eq!(rel.memorable_exchanges[0], "exchange 5");
    }
}
