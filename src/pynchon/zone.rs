use super::data::{ZONE_EXTREME, ZONE_MODERATE, ZONE_STRONG, ZONE_SUBTLE};
use crate::error::{DbError, Result};
use chrono::Utc;
use rand::seq::SliceRandom;
use sqlx::SqlitePool;
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

use regex::Regex;

/// Zone-boundary trigger phrases and their weights (§4.6, worked example:
/// "reality_simulation" at weight 0.95).
static TRIGGERS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)reality[\s_-]?simulation").unwrap(), 0.95),
        (Regex::new(r"(?i)\bare we (in|inside) a simulation\b").unwrap(), 0.85),
        (Regex::new(r"(?i)\bthe zone\b").unwrap(), 0.7),
        (Regex::new(r"(?i)\bboundary between (worlds|realities)\b").unwrap(), 0.6),
        (Regex::new(r"(?i)\bbreak(ing)? the fourth wall\b").unwrap(), 0.4),
        (Regex::new(r"(?i)\bwhat lies beyond\b|\bother side\b").unwrap(), 0.3),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneBucket {
    Subtle,
    Moderate,
    Strong,
    Extreme,
}

impl ZoneBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            ZoneBucket::Subtle => "subtle",
            ZoneBucket::Moderate => "moderate",
            ZoneBucket::Strong => "strong",
            ZoneBucket::Extreme => "extreme",
        }
    }
}

/// Compute zone proximity for a query (§4.6): `max_weight · min(1 +
/// (matches − 1)·0.08, 1.4)`. Returns `None` if no trigger matched.
pub fn proximity(query: &str) -> Option<f64> {
    let mut max_weight = 0.0_f64;
    let mut matches = 0usize;

    for (pattern, weight) in TRIGGERS.iter() {
        if pattern.is_match(query) {
            matches += 1;
            if *weight > max_weight {
                max_weight = *weight;
            }
        }
    }

    if matches == 0 {
        return None;
    }

    let scaling = (1.0 + (matches as f64 - 1.0) * 0.08).min(1.4);
    Some(max_weight * scaling)
}

pub fn bucket_for(proximity: f64) -> Option<ZoneBucket> {
    if proximity >= 0.9 {
        Some(ZoneBucket::Extreme)
    } else if proximity >= 0.7 {
        Some(ZoneBucket::Strong)
    } else if proximity >= 0.5 {
        Some(ZoneBucket::Moderate)
    } else if proximity >= 0.3 {
        Some(ZoneBucket::Subtle)
    } else {
        None
    }
}

fn strings_for(bucket: ZoneBucket) -> &'static [&'static str] {
    match bucket {
        ZoneBucket::Subtle => ZONE_SUBTLE,
        ZoneBucket::Moderate => ZONE_MODERATE,
        ZoneBucket::Strong => ZONE_STRONG,
        ZoneBucket::Extreme => ZONE_EXTREME,
    }
}

/// Compute the zone layer prose for a query, or `None` below the subtle
/// threshold.
pub fn atmospheric_line(query: &str) -> Option<&'static str> {
    let p = proximity(query)?;
    let bucket = bucket_for(p)?;
    strings_for(bucket).choose(&mut rand::rng()).copied()
}

pub struct ZoneRepository {
    pool: Arc<SqlitePool>,
}

impl ZoneRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Persist an observation when `proximity > 0.3` (§4.6).
    pub async fn record_if_above_threshold(&self, session_id: &str, prox: f64, bucket: ZoneBucket) -> Result<()> {
        if prox <= 0.3 {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO zone_observations (id, session_id, proximity, bucket, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(session_id)
        .bind(prox)
        .bind(bucket.as_str())
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

    #[test]
    fn reality_simulation_alone_is_extreme() {
        let p = proximity("are we living in a reality_simulation?").unwrap();
        assert!((p - 0.95).abs() < 1e-9);
        assert_eq!(bucket_for(p), Some(ZoneBucket::Extreme));
    }

    #[test]
    fn no_trigger_returns_none() {
        assert!(proximity("what's the weather like").is_none());
    }

    #[test]
    fn multiple_matches_scale_proximity_up_to_cap() {
        let p = proximity("the zone and the boundary between worlds and what lies beyond").unwrap();
        assert!(p > 0.7);
    }

    #[tokio::test]
    async fn observation_persisted_only_above_threshold() {
        let pool = Arc::new(SqlitePool::connect("sqlite::memory:").await.unwrap());
        crate::db::schema::init_schema(&pool).await.unwrap();
        let repo = ZoneRepository::new(pool.clone());
        repo.record_if_above_threshold("s1", 0.2, ZoneBucket::Subtle).await.unwrap();
        repo.record_if_above_threshold("s1", 0.6, ZoneBucket::Moderate).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM zone_observations")
            .fetch_one(&*pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }
}
