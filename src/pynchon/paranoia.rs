use super::data::{THEY_AWAKENED, THEY_OBLIVIOUS, THEY_PARANOID, THEY_SUSPICIOUS, THEY_UNEASY};
use crate::error::{DbError, Result};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use sqlx::{Row, SqlitePool};
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

use regex::Regex;

const FLOOR: f64 = 0.05;
const DECAY_PER_HOUR: f64 = 0.02;
const SPIKE_THRESHOLD: f64 = 0.1;

/// They-awareness trigger phrases (§4.6) — surveillance, observation,
/// and "being watched" language.
static TRIGGERS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)\bthey'?re watching\b|\bwho'?s watching\b").unwrap(), 0.9),
        (Regex::new(r"(?i)\bsurveillance\b|\bbeing tracked\b|\bbeing monitored\b").unwrap(), 0.7),
        (Regex::new(r"(?i)\bthey know\b|\bthey are (coming|listening)\b").unwrap(), 0.6),
        (Regex::new(r"(?i)\bconspiracy\b|\bcover[\s-]?up\b").unwrap(), 0.4),
        (Regex::new(r"(?i)\bwho controls\b|\bhidden hand\b").unwrap(), 0.3),
    ]
});

/// Score a query against the they-awareness trigger family, returning
/// the highest matched weight or 0.0.
pub fn score(query: &str) -> f64 {
    TRIGGERS
        .iter()
        .filter(|(pattern, _)| pattern.is_match(query))
        .map(|(_, weight)| *weight)
        .fold(0.0, f64::max)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParanoiaLabel {
    Oblivious,
    Uneasy,
    Suspicious,
    Paranoid,
    Awakened,
}

impl ParanoiaLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            ParanoiaLabel::Oblivious => "oblivious",
            ParanoiaLabel::Uneasy => "uneasy",
            ParanoiaLabel::Suspicious => "suspicious",
            ParanoiaLabel::Paranoid => "paranoid",
            ParanoiaLabel::Awakened => "awakened",
        }
    }
}

/// Threshold classifier (§3): 0.2 / 0.4 / 0.6 / 0.8 / 0.95.
pub fn classify(awareness_level: f64) -> ParanoiaLabel {
    if awareness_level < 0.2 {
        ParanoiaLabel::Oblivious
    } else if awareness_level < 0.4 {
        ParanoiaLabel::Uneasy
    } else if awareness_level < 0.6 {
        ParanoiaLabel::Suspicious
    } else if awareness_level < 0.8 {
        ParanoiaLabel::Paranoid
    } else {
        ParanoiaLabel::Awakened
    }
}

fn strings_for(label: ParanoiaLabel) -> &'static [&'static str] {
    match label {
        ParanoiaLabel::Oblivious => THEY_OBLIVIOUS,
        ParanoiaLabel::Uneasy => THEY_UNEASY,
        ParanoiaLabel::Suspicious => THEY_SUSPICIOUS,
        ParanoiaLabel::Paranoid => THEY_PARANOID,
        ParanoiaLabel::Awakened => THEY_AWAKENED,
    }
}

/// They-awareness layer prose for the current classification, or `None`
/// at the oblivious floor where nothing is worth remarking on.
pub fn they_line(label: ParanoiaLabel) -> Option<&'static str> {
    if matches!(label, ParanoiaLabel::Oblivious) {
        return None;
    }
    strings_for(label).choose(&mut rand::rng()).copied()
}

pub struct ParanoiaRepository {
    pool: Arc<SqlitePool>,
}

impl ParanoiaRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    async fn ensure_row(&self) -> Result<()> {
        sqlx::query(
            "INSERT INTO paranoia_state (id, awareness_level, state, last_spike, spike_count, updated_at)
             VALUES (1, ?1, 'oblivious', NULL, 0, ?2)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(FLOOR)
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    /// Decay awareness by real elapsed time, down to the hard floor
    /// (§4.6: "They never fully stop watching").
    async fn decayed(&self) -> Result<(f64, i64, Option<DateTime<Utc>>, DateTime<Utc>)> {
        self.ensure_row().await?;
        let row = sqlx::query("SELECT awareness_level, spike_count, last_spike, updated_at FROM paranoia_state WHERE id = 1")
            .fetch_one(&*self.pool)
            .await
            .map_err(DbError::from)?;

        let level: f64 = row.try_get("awareness_level").map_err(DbError::from)?;
        let spike_count: i64 = row.try_get("spike_count").map_err(DbError::from)?;
        let last_spike: Option<String> = row.try_get("last_spike").map_err(DbError::from)?;
        let updated_at: String = row.try_get("updated_at").map_err(DbError::from)?;

        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        let elapsed_hours = (Utc::now() - updated_at).num_seconds() as f64 / 3600.0;
        let decayed = (level - elapsed_hours.max(0.0) * DECAY_PER_HOUR).max(FLOOR);

        Ok((
            decayed,
            spike_count,
            last_spike.and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc))),
            updated_at,
        ))
    }

    /// Apply a they-awareness increment from a scored query (§4.6):
    /// `awareness += score · 0.5`, with any delta `≥ 0.1` counted as a
    /// spike.
    pub async fn apply_score(&self, query_score: f64) -> Result<(f64, ParanoiaLabel, bool)> {
        let (decayed, mut spike_count, mut last_spike, _) = self.decayed().await?;
        let delta = query_score * 0.5;
        let new_level = (decayed + delta).clamp(FLOOR, 1.0);
        let is_spike = delta >= SPIKE_THRESHOLD;

        if is_spike {
            spike_count += 1;
            last_spike = Some(Utc::now());
        }

        let label = classify(new_level);
        sqlx::query(
            "UPDATE paranoia_state SET awareness_level = ?1, state = ?2, last_spike = ?3, spike_count = ?4, updated_at = ?5 WHERE id = 1",
        )
        .bind(new_level)
        .bind(label.as_str())
        .bind(last_spike.map(|dt| dt.to_rfc3339()))
        .bind(spike_count)
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;

        Ok((new_level, label, is_spike))
    }

    pub async fn current(&self) -> Result<(f64, ParanoiaLabel)> {
        let (level, ..) = self.decayed().await?;
        Ok((level, classify(level)))
    }

    /// Record a they-awareness observation for this session (§4.6's
    /// `they_observations` table), keyed to the triggering query.
    pub async fn record_observation(&self, session_id: &str, query_excerpt: &str, query_score: f64) -> Result<()> {
        sqlx::query(
            "INSERT INTO they_observations (id, session_id, query_excerpt, score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(session_id)
        .bind(query_excerpt.chars().take(200).collect::<String>())
        .bind(query_score)
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }
}
