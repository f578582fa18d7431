use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single counterforce-alignment learning event (§3, §4.6), bounded to the
/// 10 most recent entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CounterforceAdjustment {
    pub delta: f64,
    pub reason: String,
    pub ts: DateTime<Utc>,
}

/// The only mutable part of a [`Persona`] (§3: "Immutable in principle; only
/// `learned_traits` mutates").
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LearnedTraits {
    /// Cumulative counterforce-alignment learning, clamped to [-0.5, 0.5].
    pub counterforce_delta: f64,
    pub counterforce_history: Vec<CounterforceAdjustment>,
}

/// A persona's identity and soul-integrity bookkeeping (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Persona {
    pub persona_id: String,
    pub slug: String,
    pub soul_path: PathBuf,
    pub soul_content_hash: String,
    pub soul_version: i64,
    pub learned_traits: LearnedTraits,
}
