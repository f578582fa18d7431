use super::model::{CounterforceAdjustment, LearnedTraits, Persona};
use crate::error::{DbError, Result, WeaveError};
use crate::soul::markers::find_soul_file;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

const MAX_COUNTERFORCE_HISTORY: usize = 10;
const MAX_COUNTERFORCE_TOTAL: f64 = 0.5;
const MAX_COUNTERFORCE_PER_ADJUST: f64 = 0.1;

pub struct PersonaRepository {
    pool: Arc<SqlitePool>,
}

impl PersonaRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn row_to_persona(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<Persona> {
        let learned_traits_json: String = row.try_get("learned_traits")?;
        let learned_traits: LearnedTraits =
            serde_json::from_str(&learned_traits_json).unwrap_or_default();
        Ok(Persona {
            persona_id: row.try_get("persona_id")?,
            slug: row.try_get("slug")?,
            soul_path: PathBuf::from(row.try_get::<String, _>("soul_path")?),
            soul_content_hash: row.try_get("soul_content_hash")?,
            soul_version: row.try_get("soul_version")?,
            learned_traits,
        })
    }

    /// Fetch a persona by slug, registering it with a freshly computed soul
    /// hash the first time it's seen. This is the trust-on-first-use moment
    /// that establishes the "stored hash" §4.7 validates future reads
    /// against.
    pub async fn get_or_register(&self, slug: &str, personas_root: &Path) -> Result<Persona> {
        if let Some(existing) = self.find_by_slug(slug).await? {
            return Ok(existing);
        }

        let content = find_soul_file(personas_root, slug).await.unwrap_or_default();
        let hash = hex::encode(Sha256::digest(content.as_bytes()));
        let persona = Persona {
            persona_id: Uuid::new_v4().to_string(),
            slug: slug.to_string(),
            soul_path: personas_root.join(format!("{slug}.md")),
            soul_content_hash: hash,
            soul_version: 1,
            learned_traits: LearnedTraits::default(),
        };

        sqlx::query(
            "INSERT INTO personas (persona_id, slug, soul_path, soul_content_hash, soul_version, learned_traits, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(slug) DO NOTHING",
        )
        .bind(&persona.persona_id)
        .bind(&persona.slug)
        .bind(persona.soul_path.to_string_lossy().to_string())
        .bind(&persona.soul_content_hash)
        .bind(persona.soul_version)
        .bind(serde_json::to_string(&persona.learned_traits).unwrap_or_default())
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;

        // another task may have won the race; re-read canonically.
        self.find_by_slug(slug)
            .await?
            .ok_or_else(|| WeaveError::Database(DbError::Query("persona registration vanished".into())))
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Persona>> {
        let row = sqlx::query("SELECT * FROM personas WHERE slug = ?1")
            .bind(slug)
            .fetch_optional(&*self.pool)
            .await
            .map_err(DbError::from)?;

        match row {
            Some(r) => Ok(Some(
                Self::row_to_persona(&r).map_err(WeaveError::Other)?,
            )),
            None => Ok(None),
        }
    }

    /// Apply a counterforce-alignment learning event (§4.6): clamp the
    /// per-adjustment delta to ±0.1, clamp the running total to ±0.5, and
    /// keep only the 10 most recent history entries.
    pub async fn adjust_counterforce(
        &self,
        persona_id: &str,
        raw_delta: f64,
        reason: &str,
    ) -> Result<LearnedTraits> {
        let clamped_delta = raw_delta.clamp(-MAX_COUNTERFORCE_PER_ADJUST, MAX_COUNTERFORCE_PER_ADJUST);

        let row = sqlx::query("SELECT learned_traits FROM personas WHERE persona_id = ?1")
            .bind(persona_id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(DbError::from)?;
        let Some(row) = row else {
            return Err(WeaveError::Database(DbError::Query(format!(
                "persona {persona_id} not found"
            ))));
        };
        let current_json: String = row.try_get("learned_traits").map_err(|e| WeaveError::Other(e.into()))?;
        let mut traits: LearnedTraits = serde_json::from_str(&current_json).unwrap_or_default();

        traits.counterforce_delta =
            (traits.counterforce_delta + clamped_delta).clamp(-MAX_COUNTERFORCE_TOTAL, MAX_COUNTERFORCE_TOTAL);
        traits.counterforce_history.push(CounterforceAdjustment {
            delta: clamped_delta,
            reason: reason.to_string(),
            ts: Utc::now(),
        });
        if traits.counterforce_history.len() > MAX_COUNTERFORCE_HISTORY {
            let overflow = traits.counterforce_history.len() - MAX_COUNTERFORCE_HISTORY;
            traits.counterforce_history.drain(0..overflow);
        }

        sqlx::query("UPDATE personas SET learned_traits = ?1 WHERE persona_id = ?2")
            .bind(serde_json::to_string(&traits).unwrap_or_default())
            .bind(persona_id)
            .execute(&*self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(traits)
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
    async fn get_or_register_is_idempotent() {
        let pool = fresh_pool().await;
        let repo = PersonaRepository::new(pool);
        let dir = tempfile::tempdir().unwrap();

        let first = repo.get_or_register("hegel", dir.path()).await.unwrap();
        let second = repo.get_or_register("hegel", dir.path()).await.unwrap();
        assert_eq!(first.persona_id, second.persona_id);
    }

    #[tokio::test]
    async fn counterforce_clamps_per_adjust_and_total() {
        let pool = fresh_pool().await;
        let repo = PersonaRepository::new(pool);
        let dir = tempfile::tempdir().unwrap();
        let persona = repo.get_or_register("diogenes", dir.path()).await.unwrap();

        let traits = repo
            .adjust_counterforce(&persona.persona_id, 10.0, "overshoot")
            .await
            .unwrap();
        assert!((traits.counterforce_delta - 0.1).abs() < 1e-9);

        for _ in 0..20 {
            repo.adjust_counterforce(&persona.persona_id, 0.1, "repeat")
                .await
                .unwrap();
        }
        let final_row = repo.find_by_slug("diogenes").await.unwrap().unwrap();
        assert!(final_row.learned_traits.counterforce_delta <= 0.5);
        assert_eq!(final_row.learned_traits.counterforce_history.len(), 10);
    }
}
