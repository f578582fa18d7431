use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One transcript turn passed into [`super::complete_session`] (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: String,
    pub content: String,
}

/// The full end-of-session payload (§6 `complete_session`). `persona_id`
/// is the persona slug — the same identifier `assemble_context` takes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCompleteRequest {
    pub session_id: String,
    pub user_id: String,
    pub persona_id: String,
    pub persona_name: String,
    pub messages: Vec<SessionMessage>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// The post-commit relationship snapshot returned to the caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelationshipSummary {
    pub familiarity_score: f64,
    pub trust_level: String,
    pub interaction_count: i64,
}

/// Result shape of `complete_session` (§6, §8 Scenario D idempotency law).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionCompleteResult {
    pub relationship: Option<RelationshipSummary>,
    pub memories_stored: usize,
    pub memories_consigned_to_preterite: usize,
    pub settings_extracted: bool,
    pub session_quality: f64,
    pub entropy_state: Option<String>,
    pub arc_phase: Option<String>,
    pub skipped: Option<String>,
    pub error: Option<String>,
}

impl SessionCompleteResult {
    /// Idempotency short-circuit (§7, §8): a prior successful
    /// `session_complete` operator-log entry already exists for this
    /// session id.
    pub fn skipped() -> Self {
        Self {
            skipped: Some("already_completed".to_string()),
            ..Self::default()
        }
    }

    /// Transaction-failure taxonomy (§7): `relationship:null,
    /// memories_stored:0` alongside the error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_result_carries_the_fixed_tag() {
        let result = SessionCompleteResult::skipped();
        assert_eq!(result.skipped.as_deref(), Some("already_completed"));
        assert_eq!(result.memories_stored, 0);
    }

    #[test]
    fn error_result_has_null_relationship_and_zero_memories() {
        let result = SessionCompleteResult::error("transaction failed: disk full");
        assert!(result.relationship.is_none());
        assert_eq!(result.memories_stored, 0);
        assert!(result.error.unwrap().contains("disk full"));
    }
}
