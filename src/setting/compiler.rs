use super::repository::SettingRepository;
use crate::error::{DbError, Result};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Minimal fallback prompt used when no real composition is possible
/// (§7: "a minimal, persona-agnostic fallback prompt").
pub const FALLBACK_SETTING: &str = "It is 2 AM at O Fim. The humidity is eternal. Chopp flows cold.";

/// Compile the setting layer for a persona: the ambient scene singleton,
/// followed by any persona-scoped `context_templates` rows (§4.1 Step 2.5,
/// §6). Whether `active = 0` rows are excluded is governed by the
/// `context_templates_active_column` config flag (Design Notes Open
/// Question (b)) — when `false`, the column is treated as advisory only
/// and every row is considered active.
pub async fn compile_setting(pool: &Arc<SqlitePool>, persona_id: &str, honor_active_column: bool) -> Result<String> {
    let repo = SettingRepository::new(Arc::clone(pool));
    let state = repo.current().await?;

    let query = if honor_active_column {
        "SELECT content FROM context_templates WHERE persona_id = ?1 AND (active = 1) ORDER BY id"
    } else {
        "SELECT content FROM context_templates WHERE persona_id = ?1 ORDER BY id"
    };

    let rows = sqlx::query(query)
        .bind(persona_id)
        .fetch_all(&**pool)
        .await
        .map_err(DbError::from)?;

    let mut parts = vec![state.current_scene];
    for row in &rows {
        let content: String = row.try_get("content").map_err(DbError::from)?;
        parts.push(content);
    }

    Ok(parts.join("\n"))
}
