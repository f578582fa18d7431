use super::analyzer::{DriftAnalysis, Severity};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

impl Severity {
    fn as_str(self) -> &'static str {
        match self {
            Severity::Stable => "stable",
            Severity::Minor => "minor",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Insert a drift-alert row on WARNING/CRITICAL, fire-and-forget (§4.3).
pub fn record_alert_if_needed(
    pool: &Arc<SqlitePool>,
    persona_id: &str,
    session_id: Option<&str>,
    analysis: &DriftAnalysis,
) {
    if !matches!(analysis.severity, Severity::Warning | Severity::Critical) {
        return;
    }

    let pool = Arc::clone(pool);
    let persona_id = persona_id.to_string();
    let session_id = session_id.map(String::from);
    let score = analysis.score;
    let severity = analysis.severity.as_str();
    let warnings = serde_json::to_string(&analysis.warnings).unwrap_or_else(|_| "[]".to_string());

    tokio::spawn(async move {
        let result = sqlx::query(
            "INSERT INTO drift_alerts (id, persona_id, session_id, drift_score, severity, warnings, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&persona_id)
        .bind(&session_id)
        .bind(score)
        .bind(severity)
        .bind(&warnings)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&*pool)
        .await;

        if let Err(err) = result {
            tracing::warn!(persona_id = %persona_id, error = %err, "drift alert write failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;

    fn analysis(severity: Severity) -> DriftAnalysis {
        DriftAnalysis {
            score: 0.5,
            severity,
            warnings: vec!["warning drift detected".to_string()],
            forbidden_hits: Vec::new(),
            missing_vocabulary: Vec::new(),
            pattern_violations: Vec::new(),
        }
    }

    #[tokio::test]
    async fn warning_severity_inserts_alert_row() {
        let pool = Arc::new(SqlitePool::connect("sqlite::memory:").await.unwrap());
        init_schema(&pool).await.unwrap();
        record_alert_if_needed(&pool, "p1", Some("s1"), &analysis(Severity::Warning));

        for _ in 0..20 {
            let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM drift_alerts")
                .fetch_one(&*pool)
                .await
                .unwrap();
            if count.0 == 1 {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("drift alert was never written");
    }

    #[tokio::test]
    async fn stable_severity_never_inserts() {
        let pool = Arc::new(SqlitePool::connect("sqlite::memory:").await.unwrap());
        init_schema(&pool).await.unwrap();
        record_alert_if_needed(&pool, "p1", None, &analysis(Severity::Stable));
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM drift_alerts")
            .fetch_one(&*pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }
}
