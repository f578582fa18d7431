use crate::error::{DbError, Result};
use chrono::Utc;
use rand::Rng;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

const DECAY_PER_HOUR: f64 = 0.001;
const SESSION_INCREMENT: f64 = 0.02;
const VISIBLE_FLOOR: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyLabel {
    Stable,
    Unsettled,
    Decaying,
    Fragmenting,
    Dissolving,
}

impl EntropyLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            EntropyLabel::Stable => "stable",
            EntropyLabel::Unsettled => "unsettled",
            EntropyLabel::Decaying => "decaying",
            EntropyLabel::Fragmenting => "fragmenting",
            EntropyLabel::Dissolving => "dissolving",
        }
    }
}

/// Threshold classifier for entropy `level` (§3, §4.6): 0.3 / 0.5 / 0.7 / 0.9.
pub fn classify(level: f64) -> EntropyLabel {
    if level < 0.3 {
        EntropyLabel::Stable
    } else if level < 0.5 {
        EntropyLabel::Unsettled
    } else if level < 0.7 {
        EntropyLabel::Decaying
    } else if level < 0.9 {
        EntropyLabel::Fragmenting
    } else {
        EntropyLabel::Dissolving
    }
}

/// Real-time-decayed level given elapsed hours since the last update.
/// Entropy "decays upward" toward disorder — it is a drift, not a
/// recovery — so elapsed time only ever increases the level.
pub fn decayed_level(previous_level: f64, elapsed_hours: f64) -> f64 {
    (previous_level + elapsed_hours * DECAY_PER_HOUR).clamp(0.0, 1.0)
}

/// Entropy layer prose is suppressed below the visible floor (§4.6).
pub fn is_visible(level: f64) -> bool {
    level >= VISIBLE_FLOOR
}

pub struct EntropyRepository {
    pool: Arc<SqlitePool>,
}

impl EntropyRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    async fn ensure_row(&self) -> Result<()> {
        sqlx::query(
            "INSERT INTO entropy_state (id, level, state, updated_at) VALUES (1, 0.0, 'stable', ?1)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    /// Read the current level, applying real-time decay, and persist the
    /// recomputed value (§4.6: "decays upward... on each read").
    pub async fn read_and_decay(&self) -> Result<(f64, EntropyLabel)> {
        self.ensure_row().await?;

        let row = sqlx::query("SELECT level, updated_at FROM entropy_state WHERE id = 1")
            .fetch_one(&*self.pool)
            .await
            .map_err(DbError::from)?;

        let level: f64 = row.try_get("level").map_err(DbError::from)?;
        let updated_at: String = row.try_get("updated_at").map_err(DbError::from)?;
        let updated_at = chrono::DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let elapsed_hours = (Utc::now() - updated_at).num_seconds() as f64 / 3600.0;
        let new_level = decayed_level(level, elapsed_hours.max(0.0));
        let label = classify(new_level);

        sqlx::query("UPDATE entropy_state SET level = ?1, state = ?2, updated_at = ?3 WHERE id = 1")
            .bind(new_level)
            .bind(label.as_str())
            .bind(Utc::now().to_rfc3339())
            .execute(&*self.pool)
            .await
            .map_err(DbError::from)?;

        Ok((new_level, label))
    }

    /// Probabilistic per-session increment (§4.6): `+0.02` with
    /// probability `0.3 + level·0.4`.
    pub async fn maybe_increment_for_session(&self) -> Result<(f64, EntropyLabel)> {
        let (level, _) = self.read_and_decay().await?;
        let probability = 0.3 + level * 0.4;
        let roll: f64 = rand::rng().random();

        if roll >= probability {
            return Ok((level, classify(level)));
        }

        let new_level = (level + SESSION_INCREMENT).clamp(0.0, 1.0);
        let label = classify(new_level);
        sqlx::query("UPDATE entropy_state SET level = ?1, state = ?2, updated_at = ?3 WHERE id = 1")
            .bind(new_level)
            .bind(label.as_str())
            .bind(Utc::now().to_rfc3339())
            .execute(&*self.pool)
            .await
            .map_err(DbError::from)?;

        Ok((new_level, label))
    }

    /// Maintenance reset to a specified floor (§4.6).
    pub async fn reset_to_floor(&self, floor: f64) -> Result<()> {
        self.ensure_row().await?;
        let label = classify(floor);
        sqlx::query("UPDATE entropy_state SET level = ?1, state = ?2, updated_at = ?3 WHERE id = 1")
            .bind(floor.clamp(0.0, 1.0))
            .bind(label.as_str())
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

    #[test]
    fn classify_matches_thresholds() {
        assert_eq!(classify(0.0), EntropyLabel::Stable);
        assert_eq!(classify(0.29), EntropyLabel::Stable);
        assert_eq!(classify(0.3), EntropyLabel::Unsettled);
        assert_eq!(classify(0.5), EntropyLabel::Decaying);
        assert_eq!(classify(0.7), EntropyLabel::Fragmenting);
        assert_eq!(classify(0.9), EntropyLabel::Dissolving);
    }

    #[test]
    fn decay_only_increases_level() {
        assert!(decayed_level(0.2, 10.0) > 0.2);
        assert_eq!(decayed_level(0.2, 0.0), 0.2);
    }

    #[test]
    fn visibility_floor_is_0_2() {
        assert!(!is_visible(0.19));
        assert!(is_visible(0.2));
    }

    #[tokio::test]
    async fn read_and_decay_materializes_singleton_row() {
        let repo = EntropyRepository::new(pool().await);
        let (level, label) = repo.read_and_decay().await.unwrap();
        assert_eq!(level, 0.0);
        assert_eq!(label, EntropyLabel::Stable);
    }

    #[tokio::test]
    async fn reset_to_floor_overrides_level() {
        let repo = EntropyRepository::new(pool().await);
        repo.reset_to_floor(0.05).await.unwrap();
        let (level, _) = repo.read_and_decay().await.unwrap();
        assert!(level >= 0.05 && level < 0.1);
    }
}
