use super::model::{RelationshipSummary, SessionCompleteRequest, SessionCompleteResult};
use crate::arc::ArcRepository;
use crate::config::Config;
use crate::db::logger::{LogOperation, OperatorLogger};
use crate::db::pool::ConnectionPool;
use crate::error::DbError;
use crate::memory::embeddings::{try_embed, EmbeddingProvider};
use crate::memory::model::MemoryType;
use crate::memory::preterite;
use crate::memory::{extract_candidates, ElectionStatus, MemoryCandidate, MemoryRepository};
use crate::pynchon::EntropyRepository;
use crate::relationship::quality::{has_follow_ups, topic_depth};
use crate::relationship::tracker::{engagement, update_familiarity};
use crate::setting::{SettingPreferenceExtractor, SettingRepository};
use crate::temporal::TemporalRepository;
use chrono::Utc;
use serde_json::json;
use sqlx::Row;
use std::sync::Arc;
use uuid::Uuid;

/// The resources a `complete_session` call needs (§4.8, §5 — mirrors
/// [`crate::assembly::orchestrator::AssemblyContext`]'s bundling pattern).
pub struct SessionContext {
    pub connection_pool: Arc<ConnectionPool>,
    pub config: Config,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub setting_extractor: Arc<dyn SettingPreferenceExtractor>,
}

/// Idempotent, multi-subsystem commit at session end (§4, §6, §8).
///
/// Open Question resolved (documented in DESIGN.md): two passages disagree
/// on exactly which updates belong inside the single atomic transaction.
/// This implementation treats the two state mutations that carry hard
/// invariants (bounded `familiarity_delta`/`interaction_count`; memory
/// content/importance bounds) as the literal atomic unit, and treats
/// arc/entropy — whose own contract describes them as advisory
/// last-writer-wins upserts, not canonical state — plus temporal touch,
/// preterite election, and setting extraction as best-effort steps applied
/// after commit.
pub async fn complete_session(
    ctx: &SessionContext,
    req: SessionCompleteRequest,
) -> SessionCompleteResult {
    let pool = ctx.connection_pool.pool();
    let logger = OperatorLogger::new(Arc::clone(&pool));

    if matches!(logger.session_already_completed(&req.session_id).await, Ok(true)) {
        return SessionCompleteResult::skipped();
    }

    let started_at = std::time::Instant::now();
    let user_messages: Vec<String> = req
        .messages
        .iter()
        .filter(|m| m.role == "user")
        .map(|m| m.content.clone())
        .collect();
    let all_messages: Vec<String> = req.messages.iter().map(|m| m.content.clone()).collect();
    let duration_min = (req.ended_at - req.started_at).num_seconds() as f64 / 60.0;

    let candidates = extract_candidates(&user_messages, &all_messages, duration_min);
    let mut embedded_candidates: Vec<(MemoryCandidate, Option<Vec<f32>>)> =
        Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let embedding = try_embed(ctx.embedder.as_ref(), &candidate.summary).await;
        embedded_candidates.push((candidate.clone(), embedding));
    }

    let persona_id = req.persona_id.clone();
    let user_id = req.user_id.clone();
    let batch_cap = ctx.config.memory_batch_cap;
    let user_messages_for_tx = user_messages.clone();

    let atomic: crate::error::Result<(f64, String, i64, usize)> = ctx
        .connection_pool
        .with_transaction(move |tx| {
            Box::pin(async move {
                let now = Utc::now();

                sqlx::query(
                    "INSERT INTO relationships
                        (user_id, persona_id, familiarity_score, trust_level, interaction_count, created_at, updated_at)
                     VALUES (?1, ?2, 0.0, 'stranger', 0, ?3, ?3)
                     ON CONFLICT(user_id, persona_id) DO NOTHING",
                )
                .bind(&user_id)
                .bind(&persona_id)
                .bind(now.to_rfc3339())
                .execute(&mut **tx)
                .await
                .map_err(DbError::from)?;

                let row = sqlx::query(
                    "SELECT familiarity_score FROM relationships WHERE user_id = ?1 AND persona_id = ?2",
                )
                .bind(&user_id)
                .bind(&persona_id)
                .fetch_one(&mut **tx)
                .await
                .map_err(DbError::from)?;
                let old_familiarity: f64 = row.try_get("familiarity_score").map_err(DbError::from)?;

                let update = update_familiarity(old_familiarity, &user_messages_for_tx, duration_min, None);

                sqlx::query(
                    "UPDATE relationships
                     SET familiarity_score = ?1, trust_level = ?2,
                         interaction_count = interaction_count + 1, updated_at = ?3
                     WHERE user_id = ?4 AND persona_id = ?5",
                )
                .bind(update.new_familiarity)
                .bind(update.new_trust_level.as_str())
                .bind(now.to_rfc3339())
                .bind(&user_id)
                .bind(&persona_id)
                .execute(&mut **tx)
                .await
                .map_err(DbError::from)?;

                let count_row = sqlx::query(
                    "SELECT interaction_count FROM relationships WHERE user_id = ?1 AND persona_id = ?2",
                )
                .bind(&user_id)
                .bind(&persona_id)
                .fetch_one(&mut **tx)
                .await
                .map_err(DbError::from)?;
                let interaction_count: i64 =
                    count_row.try_get("interaction_count").map_err(DbError::from)?;

                let cap = crate::memory::storage::effective_batch_cap(batch_cap);
                let mut stored = 0usize;
                for (candidate, embedding) in embedded_candidates.into_iter().take(cap) {
                    let memory_id = Uuid::new_v4().to_string();
                    let embedding_bytes = embedding.as_deref().map(vec_to_bytes);

                    sqlx::query(
                        "INSERT INTO memories
                            (memory_id, persona_id, user_id, content, memory_type, importance_score,
                             embedding, created_at, last_accessed, access_count)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, 0)",
                    )
                    .bind(&memory_id)
                    .bind(&persona_id)
                    .bind(&user_id)
                    .bind(&candidate.summary)
                    .bind(MemoryType::Interaction.as_str())
                    .bind(candidate.importance.clamp(0.0, 1.0))
                    .bind(embedding_bytes)
                    .bind(now.to_rfc3339())
                    .execute(&mut **tx)
                    .await
                    .map_err(DbError::from)?;

                    stored += 1;
                }

                Ok((
                    update.new_familiarity,
                    update.new_trust_level.as_str().to_string(),
                    interaction_count,
                    stored,
                ))
            })
        })
        .await;

    let (new_familiarity, new_trust_level, interaction_count, memories_stored) = match atomic {
        Ok(outcome) => outcome,
        Err(err) => {
            let message = err.to_string();
            logger.log(LogOperation {
                operation: "session_complete".into(),
                session_id: Some(req.session_id.clone()),
                persona_id: Some(req.persona_id.clone()),
                user_id: Some(req.user_id.clone()),
                details: json!({ "error": message }),
                duration_ms: started_at.elapsed().as_millis() as i64,
                success: false,
            });
            return SessionCompleteResult::error(format!("transaction failed: {message}"));
        }
    };

    // Best-effort steps: arc, entropy, temporal, preterite election, setting
    // extraction. None of these roll back the already-committed core.
    let arc_repo = ArcRepository::new(Arc::clone(&pool));
    let arc_phase = match arc_repo.complete_session(&req.session_id).await {
        Ok(()) => arc_repo
            .current(&req.session_id)
            .await
            .ok()
            .map(|(phase, _)| phase.as_str().to_string()),
        Err(_) => None,
    };

    let entropy_repo = EntropyRepository::new(Arc::clone(&pool));
    let entropy_state = entropy_repo
        .maybe_increment_for_session()
        .await
        .ok()
        .map(|(_, label)| label.as_str().to_string());

    let temporal_repo = TemporalRepository::new(Arc::clone(&pool));
    let last_topic = user_messages.last().map(String::as_str);
    let _ = temporal_repo
        .touch(&req.persona_id, &req.user_id, last_topic)
        .await;

    let memory_repo = MemoryRepository::new(Arc::clone(&pool), Arc::clone(&ctx.embedder));
    let _ = memory_repo.elect_all(&req.persona_id, &req.user_id).await;

    let memories_consigned_to_preterite = candidates
        .iter()
        .filter(|candidate| {
            let score = preterite::election_score(&candidate.summary, candidate.importance, 0.0, 0);
            matches!(
                preterite::classify(score, &candidate.summary, candidate.importance, 0, 0.0),
                ElectionStatus::Preterite(_)
            )
        })
        .count();

    let settings_extracted = match ctx.setting_extractor.extract(&all_messages).await {
        Ok(Some((scene, mood))) => {
            let setting_repo = SettingRepository::new(Arc::clone(&pool));
            setting_repo
                .update(&scene, mood.as_deref(), Some("session_complete"))
                .await
                .is_ok()
        }
        _ => false,
    };

    let follow_ups = has_follow_ups(&user_messages);
    let depth = topic_depth(&user_messages);
    let eng = engagement(user_messages.len(), duration_min, follow_ups, depth);
    let session_quality = (eng / 2.0).clamp(0.0, 1.0);

    logger.log(LogOperation {
        operation: "session_complete".into(),
        session_id: Some(req.session_id.clone()),
        persona_id: Some(req.persona_id.clone()),
        user_id: Some(req.user_id.clone()),
        details: json!({
            "memories_stored": memories_stored,
            "memories_consigned_to_preterite": memories_consigned_to_preterite,
            "settings_extracted": settings_extracted,
        }),
        duration_ms: started_at.elapsed().as_millis() as i64,
        success: true,
    });

    SessionCompleteResult {
        relationship: Some(RelationshipSummary {
            familiarity_score: new_familiarity,
            trust_level: new_trust_level,
            interaction_count,
        }),
        memories_stored,
        memories_consigned_to_preterite,
        settings_extracted,
        session_quality,
        entropy_state,
        arc_phase,
        skipped: None,
        error: None,
    }
}

fn vec_to_bytes(v: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(v.len() * 4);
    for &f in v {
        bytes.extend_from_slice(&f.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::embeddings::NoopEmbedding;
    use crate::session::model::SessionMessage;
    use crate::setting::NoopSettingExtractor;
    use chrono::Duration as ChronoDuration;

    async fn test_ctx() -> SessionContext {
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            ..Config::default()
        };
        let pool = ConnectionPool::connect(&config).await.unwrap();
        SessionContext {
            connection_pool: Arc::new(pool),
            config,
            embedder: Arc::new(NoopEmbedding),
            setting_extractor: Arc::new(NoopSettingExtractor),
        }
    }

    fn request(session_id: &str) -> SessionCompleteRequest {
        let ended_at = Utc::now();
        let started_at = ended_at - ChronoDuration::minutes(6);
        SessionCompleteRequest {
            session_id: session_id.to_string(),
            user_id: "u1".to_string(),
            persona_id: "hegel".to_string(),
            persona_name: "Hegel".to_string(),
            messages: (0..12)
                .map(|i| SessionMessage {
                    role: if i % 2 == 0 { "user" } else { "assistant" }.to_string(),
                    content: if i % 6 == 0 {
                        "Why does this matter, and what is the nature of it?".to_string()
                    } else {
                        "ok".to_string()
                    },
                })
                .collect(),
            started_at,
            ended_at,
        }
    }

    async fn wait_for_completion(ctx: &SessionContext, session_id: &str) {
        let logger = OperatorLogger::new(ctx.connection_pool.pool());
        for _ in 0..50 {
            if logger.session_already_completed(session_id).await.unwrap_or(false) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn scenario_d_first_call_moves_familiarity_and_second_call_is_idempotent() {
        let ctx = test_ctx().await;
        let first = complete_session(&ctx, request("s2")).await;
        assert!(first.error.is_none());
        assert!(first.skipped.is_none());
        let relationship = first.relationship.unwrap();
        assert!(relationship.familiarity_score > 0.0);
        assert!(relationship.familiarity_score < 0.2);
        assert_eq!(relationship.interaction_count, 1);

        wait_for_completion(&ctx, "s2").await;

        let second = complete_session(&ctx, request("s2")).await;
        assert_eq!(second.skipped.as_deref(), Some("already_completed"));
    }

    #[tokio::test]
    async fn familiarity_delta_bounded_and_interaction_count_increments_by_one() {
        let ctx = test_ctx().await;
        let result = complete_session(&ctx, request("s3")).await;
        let relationship = result.relationship.unwrap();
        assert!(relationship.familiarity_score <= 0.05);
        assert_eq!(relationship.interaction_count, 1);
    }

    #[tokio::test]
    async fn arc_is_driven_to_impact_at_session_end() {
        let ctx = test_ctx().await;
        let result = complete_session(&ctx, request("s4")).await;
        assert_eq!(result.arc_phase.as_deref(), Some("impact"));
    }

    #[tokio::test]
    async fn memories_are_stored_for_a_personal_disclosure_session() {
        let ctx = test_ctx().await;
        let mut req = request("s5");
        req.messages = vec![SessionMessage {
            role: "user".to_string(),
            content: "I am always thinking about why things matter to me.".to_string(),
        }];
        let result = complete_session(&ctx, req).await;
        assert!(result.memories_stored > 0);
    }
}
