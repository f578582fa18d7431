use super::compiler::FALLBACK_SETTING;
use crate::error::{DbError, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// The singleton ambient-scene row (§3, §6: `setting_state`). Holds whatever
/// the external setting-preserver last extracted, or the fallback prompt
/// before anything has ever been written.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingState {
    pub current_scene: String,
    pub mood: Option<String>,
    pub extracted_from: Option<String>,
    pub updated_at: DateTime<Utc>,
}

pub struct SettingRepository {
    pool: Arc<SqlitePool>,
}

impl SettingRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    async fn ensure_row(&self) -> Result<()> {
        sqlx::query(
            "INSERT INTO setting_state (id, current_scene, mood, extracted_from, updated_at)
             VALUES (1, ?1, NULL, NULL, ?2)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(FALLBACK_SETTING)
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    pub async fn current(&self) -> Result<SettingState> {
        self.ensure_row().await?;
        let row = sqlx::query("SELECT current_scene, mood, extracted_from, updated_at FROM setting_state WHERE id = 1")
            .fetch_one(&*self.pool)
            .await
            .map_err(DbError::from)?;

        let updated_at: String = row.try_get("updated_at").map_err(DbError::from)?;
        Ok(SettingState {
            current_scene: row.try_get("current_scene").map_err(DbError::from)?,
            mood: row.try_get("mood").map_err(DbError::from)?,
            extracted_from: row.try_get("extracted_from").map_err(DbError::from)?,
            updated_at: DateTime::parse_from_rfc3339(&updated_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    /// Persist a freshly extracted scene (§6: setting-preference LLM output
    /// lands here; the extraction itself is external and out of scope).
    pub async fn update(&self, current_scene: &str, mood: Option<&str>, extracted_from: Option<&str>) -> Result<()> {
        self.ensure_row().await?;
        sqlx::query(
            "UPDATE setting_state SET current_scene = ?1, mood = ?2, extracted_from = ?3, updated_at = ?4 WHERE id = 1",
        )
        .bind(current_scene)
        .bind(mood)
        .bind(extracted_from)
        .bind(Utc::now().to_rfc3339())
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

    async fn pool() -> Arc<SqlitePool> {
        let pool = Arc::new(SqlitePool::connect("sqlite::memory:").await.unwrap());
        init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn lazily_materializes_fallback_scene() {
        let repo = SettingRepository::new(pool().await);
        let state = repo.current().await.unwrap();
        assert_eq!(state.current_scene, FALLBACK_SETTING);
        assert!(state.mood.is_none());
    }

    #[tokio::test]
    async fn update_persists_new_scene() {
        let repo = SettingRepository::new(pool().await);
        repo.update("The jukebox skips the same verse.", Some("restless"), Some("user_message"))
            .await
            .unwrap();
        let state = repo.current().await.unwrap();
        assert_eq!(state.current_scene, "The jukebox skips the same verse.");
        assert_eq!(state.mood.as_deref(), Some("restless"));
    }
}
