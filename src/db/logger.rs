use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Operator-facing append-only log writer (§3, §4.8).
///
/// Every write is fire-and-forget: the caller never awaits success, and a
/// write failure is swallowed — logged via `tracing::warn!` only, never
/// propagated. This is the *operator* log, not user-visible output (Non-goal:
/// no user-visible infrastructure signals).
#[derive(Clone)]
pub struct OperatorLogger {
    pool: Arc<SqlitePool>,
}

#[derive(Debug, Clone, Default)]
pub struct LogOperation {
    pub operation: String,
    pub session_id: Option<String>,
    pub persona_id: Option<String>,
    pub user_id: Option<String>,
    pub details: Value,
    pub duration_ms: i64,
    pub success: bool,
}

impl OperatorLogger {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Spawn the insert as a detached task — `log_operation` itself never
    /// blocks the caller nor surfaces a `Result`.
    pub fn log(&self, entry: LogOperation) {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            if let Err(err) = Self::write(&pool, &entry).await {
                tracing::warn!(
                    operation = %entry.operation,
                    error = %err,
                    "operator log write failed"
                );
            }
        });
    }

    async fn write(pool: &SqlitePool, entry: &LogOperation) -> anyhow::Result<()> {
        let details = serde_json::to_string(&entry.details)?;
        sqlx::query(
            "INSERT INTO operator_logs
                (id, operation, session_id, persona_id, user_id, details, duration_ms, success, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&entry.operation)
        .bind(&entry.session_id)
        .bind(&entry.persona_id)
        .bind(&entry.user_id)
        .bind(details)
        .bind(entry.duration_ms)
        .bind(entry.success)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Whether a successful `session_complete` operation log already exists
    /// for this session — backs the idempotency check in §8.
    pub async fn session_already_completed(&self, session_id: &str) -> anyhow::Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM operator_logs
             WHERE operation = 'session_complete' AND session_id = ?1 AND success = 1
             LIMIT 1",
        )
        .bind(session_id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.is_some())
    }
}
