mod env_overrides;
mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime configuration for the context assembly pipeline.
///
/// Loaded once at startup via [`Config::load_or_init`]; cheap to clone and
/// safe to share across the concurrent layer-fetch tasks fanned out by the
/// orchestrator (§5 — shared resources are read-mostly).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection string for the relational store. The one required
    /// environment variable per §6; falls back to a local sqlite file so a
    /// fresh checkout still runs.
    pub database_url: String,

    /// Credential for the external embedding service. Absence downgrades
    /// memory retrieval to text search (§6, §8 Scenario F).
    pub embedding_api_key: Option<String>,

    /// Root directory containing `personas/<category>/<slug>.md` soul files.
    pub personas_root: PathBuf,

    /// Default `max_tokens` budget for `assemble_context` (§4.1).
    pub default_max_tokens: u32,

    /// Default `exchange_count` passed to `assemble_context`.
    pub default_exchange_count: u32,

    /// Reserved budget subtracted after summing non-memory layers (§4.1 Step 3).
    pub token_buffer: u32,

    /// Soul-integrity cache TTL in seconds (§4.7); overridable so tests don't
    /// need to sleep 60 seconds to observe a tamper.
    pub soul_cache_ttl_secs: u64,

    /// Probability of a preterite-surfacing draw per invocation (§4.2).
    pub preterite_surface_probability: f64,

    /// Entropy's real-time decay rate, per hour (§4.6).
    pub entropy_decay_per_hour: f64,

    /// They-awareness decay rate, per hour (§4.6).
    pub paranoia_decay_per_hour: f64,

    /// They-awareness floor — never fully stops watching (§3).
    pub paranoia_floor: f64,

    /// Open Question (b): whether `context_templates` rows are filtered by
    /// an `active` column. `false` means the column is treated as optional —
    /// absent is active.
    pub context_templates_active_column: bool,

    /// Memories-per-batch cap for storage inserts (§4.2, §5).
    pub memory_batch_cap: usize,

    pub pool_max_connections: u32,
    pub pool_idle_timeout_secs: u64,
    pub pool_connect_timeout_secs: u64,

    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://context-weave.db".to_string(),
            embedding_api_key: None,
            personas_root: PathBuf::from("personas"),
            default_max_tokens: 3000,
            default_exchange_count: 0,
            token_buffer: 150,
            soul_cache_ttl_secs: 60,
            preterite_surface_probability: 0.15,
            entropy_decay_per_hour: 0.001,
            paranoia_decay_per_hour: 0.02,
            paranoia_floor: 0.05,
            context_templates_active_column: false,
            memory_batch_cap: 13_000,
            pool_max_connections: 10,
            pool_idle_timeout_secs: 30,
            pool_connect_timeout_secs: 2,
            config_path: PathBuf::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.default_max_tokens, 3000);
        assert_eq!(cfg.token_buffer, 150);
        assert_eq!(cfg.soul_cache_ttl_secs, 60);
        assert!((cfg.preterite_surface_probability - 0.15).abs() < f64::EPSILON);
        assert_eq!(cfg.memory_batch_cap, 13_000);
        assert!((cfg.paranoia_floor - 0.05).abs() < f64::EPSILON);
    }
}
