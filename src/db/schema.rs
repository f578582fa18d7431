use crate::error::{DbError, Result, WeaveError};
use sqlx::SqlitePool;

/// Pragmas tuned for a single-writer, many-concurrent-reader workload — the
/// orchestrator fans out a dozen-plus read-mostly layer fetches per
/// invocation (§5).
const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA temp_store = MEMORY;
PRAGMA busy_timeout = 5000;
";

/// Persona identity and relationship/trust tables (§3).
const CREATE_PERSONA_TABLES: &str = "
CREATE TABLE IF NOT EXISTS personas (
    persona_id          TEXT PRIMARY KEY,
    slug                TEXT NOT NULL UNIQUE,
    soul_path           TEXT NOT NULL,
    soul_content_hash   TEXT NOT NULL,
    soul_version        INTEGER NOT NULL DEFAULT 1,
    learned_traits      TEXT NOT NULL DEFAULT '{}',
    created_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS relationships (
    user_id             TEXT NOT NULL,
    persona_id          TEXT NOT NULL,
    familiarity_score   REAL NOT NULL DEFAULT 0.0,
    trust_level         TEXT NOT NULL DEFAULT 'stranger',
    interaction_count   INTEGER NOT NULL DEFAULT 0,
    user_summary        TEXT,
    user_preferences    TEXT,
    memorable_exchanges TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    PRIMARY KEY(user_id, persona_id)
);
";

/// Memory subsystem tables (§3, §4.2).
const CREATE_MEMORY_TABLES: &str = "
CREATE TABLE IF NOT EXISTS memories (
    memory_id         TEXT PRIMARY KEY,
    persona_id        TEXT NOT NULL,
    user_id           TEXT NOT NULL,
    content           TEXT NOT NULL,
    memory_type       TEXT NOT NULL,
    importance_score  REAL NOT NULL,
    embedding         BLOB,
    created_at        TEXT NOT NULL,
    last_accessed     TEXT NOT NULL,
    access_count      INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_memories_persona_user
    ON memories(persona_id, user_id);
CREATE INDEX IF NOT EXISTS idx_memories_importance
    ON memories(persona_id, user_id, importance_score DESC);

CREATE TABLE IF NOT EXISTS preterite_memories (
    preterite_id       TEXT PRIMARY KEY,
    original_memory_id TEXT NOT NULL UNIQUE REFERENCES memories(memory_id),
    preterite_reason   TEXT NOT NULL,
    original_score     REAL NOT NULL,
    surface_count      INTEGER NOT NULL DEFAULT 0,
    last_surfaced      TEXT,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS persona_memories (
    memory_id        TEXT PRIMARY KEY,
    persona_id       TEXT NOT NULL,
    memory_type      TEXT NOT NULL,
    source_persona_id TEXT,
    importance_score REAL NOT NULL,
    content          TEXT NOT NULL,
    created_at       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_persona_memories_persona
    ON persona_memories(persona_id);

CREATE TABLE IF NOT EXISTS persona_opinions (
    persona_id       TEXT NOT NULL,
    topic            TEXT NOT NULL,
    stance           TEXT NOT NULL,
    confidence       REAL NOT NULL,
    expression_count INTEGER NOT NULL DEFAULT 0,
    last_expressed   TEXT,
    PRIMARY KEY(persona_id, topic)
);
";

/// Global singleton and per-session Pynchon-layer state (§3, §4.5, §4.6).
const CREATE_GLOBAL_STATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS entropy_state (
    id         INTEGER PRIMARY KEY CHECK (id = 1),
    level      REAL NOT NULL DEFAULT 0.0,
    state      TEXT NOT NULL DEFAULT 'stable',
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS paranoia_state (
    id              INTEGER PRIMARY KEY CHECK (id = 1),
    awareness_level REAL NOT NULL DEFAULT 0.05,
    state           TEXT NOT NULL DEFAULT 'oblivious',
    last_spike      TEXT,
    spike_count     INTEGER NOT NULL DEFAULT 0,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS narrative_arcs (
    session_id       TEXT PRIMARY KEY,
    phase            TEXT NOT NULL DEFAULT 'rising',
    momentum         REAL NOT NULL DEFAULT 0.5,
    apex_reached_at  TEXT,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS they_observations (
    id          TEXT PRIMARY KEY,
    session_id  TEXT NOT NULL,
    query_excerpt TEXT NOT NULL,
    score       REAL NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS zone_observations (
    id          TEXT PRIMARY KEY,
    session_id  TEXT NOT NULL,
    proximity   REAL NOT NULL,
    bucket      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS setting_state (
    id             INTEGER PRIMARY KEY CHECK (id = 1),
    current_scene  TEXT NOT NULL,
    mood           TEXT,
    extracted_from TEXT,
    updated_at     TEXT NOT NULL
);
";

/// Temporal awareness tables (§3, §4.6).
const CREATE_TEMPORAL_TABLES: &str = "
CREATE TABLE IF NOT EXISTS persona_temporal_state (
    persona_id       TEXT PRIMARY KEY,
    last_active      TEXT,
    invocation_count INTEGER NOT NULL DEFAULT 0,
    last_topic       TEXT
);

CREATE TABLE IF NOT EXISTS temporal_events (
    id          TEXT PRIMARY KEY,
    persona_id  TEXT NOT NULL,
    user_id     TEXT NOT NULL,
    gap_class   TEXT NOT NULL,
    reflection  TEXT,
    created_at  TEXT NOT NULL
);
";

/// Drift and operator-log tables (§4.3, §4.8).
const CREATE_DRIFT_AND_LOG_TABLES: &str = "
CREATE TABLE IF NOT EXISTS drift_alerts (
    id           TEXT PRIMARY KEY,
    persona_id   TEXT NOT NULL,
    session_id   TEXT,
    drift_score  REAL NOT NULL,
    severity     TEXT NOT NULL,
    warnings     TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS operator_logs (
    id           TEXT PRIMARY KEY,
    operation    TEXT NOT NULL,
    session_id   TEXT,
    persona_id   TEXT,
    user_id      TEXT,
    details      TEXT NOT NULL DEFAULT '{}',
    duration_ms  INTEGER NOT NULL,
    success      INTEGER NOT NULL,
    created_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_operator_logs_session
    ON operator_logs(session_id);
CREATE INDEX IF NOT EXISTS idx_operator_logs_operation
    ON operator_logs(operation);

CREATE TABLE IF NOT EXISTS context_templates (
    id          TEXT PRIMARY KEY,
    persona_id  TEXT NOT NULL,
    tag         TEXT NOT NULL,
    content     TEXT NOT NULL,
    active      INTEGER
);
";

/// Initialise the full schema on the given pool.
///
/// All statements use `IF NOT EXISTS` so the function is idempotent — called
/// both at first connect and after `ConnectionPool::recreate`.
pub(crate) async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(PRAGMAS)
        .execute(pool)
        .await
        .map_err(|e| WeaveError::Database(DbError::Migration(format!("pragmas: {e}"))))?;

    for (name, ddl) in [
        ("persona tables", CREATE_PERSONA_TABLES),
        ("memory tables", CREATE_MEMORY_TABLES),
        ("global state tables", CREATE_GLOBAL_STATE_TABLES),
        ("temporal tables", CREATE_TEMPORAL_TABLES),
        ("drift/log tables", CREATE_DRIFT_AND_LOG_TABLES),
    ] {
        sqlx::raw_sql(ddl)
            .execute(pool)
            .await
            .map_err(|e| WeaveError::Database(DbError::Migration(format!("{name}: {e}"))))?;
    }

    Ok(())
}
