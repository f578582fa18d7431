use super::embeddings::{cosine_distance, try_embed, EmbeddingProvider};
use super::model::{
    ElectionStatus, Memory, MemoryType, PersonaMemory, PersonaMemoryType, PersonaOpinion,
    PreteriteMemory, PreteriteReason, RetrievalStrategy,
};
use super::preterite;
use super::storage::{effective_batch_cap, MIN_CONTENT_CHARS_FOR_EMBEDDING};
use crate::error::{DbError, Result, WeaveError};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

fn vec_to_bytes(v: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(v.len() * 4);
    for &f in v {
        bytes.extend_from_slice(&f.to_le_bytes());
    }
    bytes
}

fn bytes_to_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap_or([0; 4])))
        .collect()
}

pub struct NewMemory {
    pub content: String,
    pub memory_type: MemoryType,
    pub importance_score: f64,
}

pub struct MemoryRepository {
    pool: Arc<SqlitePool>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl MemoryRepository {
    pub fn new(pool: Arc<SqlitePool>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { pool, embedder }
    }

    fn parse_rfc3339(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_memory(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<Memory> {
        let embedding_blob: Option<Vec<u8>> = row.try_get("embedding")?;
        Ok(Memory {
            memory_id: row.try_get("memory_id")?,
            persona_id: row.try_get("persona_id")?,
            user_id: row.try_get("user_id")?,
            content: row.try_get("content")?,
            memory_type: MemoryType::parse(&row.try_get::<String, _>("memory_type")?),
            importance_score: row.try_get("importance_score")?,
            embedding: embedding_blob.map(|b| bytes_to_vec(&b)),
            created_at: Self::parse_rfc3339(&row.try_get::<String, _>("created_at")?),
            last_accessed: Self::parse_rfc3339(&row.try_get::<String, _>("last_accessed")?),
            access_count: row.try_get("access_count")?,
        })
    }

    /// Batch insert, parameterized, truncated to the effective cap
    /// (§4.2 Storage, §5).
    pub async fn store_batch(
        &self,
        persona_id: &str,
        user_id: &str,
        memories: Vec<NewMemory>,
        config_cap: usize,
    ) -> Result<Vec<String>> {
        let cap = effective_batch_cap(config_cap);
        let mut ids = Vec::new();
        let now = Utc::now();

        for new_memory in memories.into_iter().take(cap) {
            let memory_id = Uuid::new_v4().to_string();
            let embedding = if new_memory.content.trim().chars().count()
                >= MIN_CONTENT_CHARS_FOR_EMBEDDING
            {
                try_embed(self.embedder.as_ref(), &new_memory.content).await
            } else {
                None
            };

            sqlx::query(
                "INSERT INTO memories
                    (memory_id, persona_id, user_id, content, memory_type, importance_score,
                     embedding, created_at, last_accessed, access_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, 0)",
            )
            .bind(&memory_id)
            .bind(persona_id)
            .bind(user_id)
            .bind(&new_memory.content)
            .bind(new_memory.memory_type.as_str())
            .bind(new_memory.importance_score.clamp(0.0, 1.0))
            .bind(embedding.as_deref().map(vec_to_bytes))
            .bind(now.to_rfc3339())
            .execute(&*self.pool)
            .await
            .map_err(DbError::from)?;

            ids.push(memory_id);
        }

        Ok(ids)
    }

    /// Hybrid retrieval with fallback to importance+recency (§4.2 Retrieval).
    pub async fn retrieve(
        &self,
        persona_id: &str,
        user_id: &str,
        query: &str,
    ) -> Result<(Vec<Memory>, RetrievalStrategy)> {
        let query_embedding = if query.trim().chars().count() >= MIN_CONTENT_CHARS_FOR_EMBEDDING {
            try_embed(self.embedder.as_ref(), query).await
        } else {
            None
        };

        if let Some(q_embedding) = query_embedding {
            let rows = sqlx::query("SELECT * FROM memories WHERE persona_id = ?1 AND user_id = ?2 AND embedding IS NOT NULL")
                .bind(persona_id)
                .bind(user_id)
                .fetch_all(&*self.pool)
                .await
                .map_err(DbError::from)?;

            let mut scored: Vec<(f64, Memory)> = Vec::new();
            for row in &rows {
                let memory = Self::row_to_memory(row).map_err(WeaveError::Other)?;
                if let Some(embedding) = &memory.embedding {
                    let distance = cosine_distance(&q_embedding, embedding);
                    let score = 0.6 * (1.0 - distance) + 0.4 * memory.importance_score;
                    scored.push((score, memory));
                }
            }

            if !scored.is_empty() {
                scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
                scored.truncate(10);
                return Ok((
                    scored.into_iter().map(|(_, m)| m).collect(),
                    RetrievalStrategy::Hybrid,
                ));
            }

            let fallback = self.importance_and_recency(persona_id, user_id).await?;
            return Ok((fallback, RetrievalStrategy::HybridFallbackToImportance));
        }

        let fallback = self.importance_and_recency(persona_id, user_id).await?;
        Ok((fallback, RetrievalStrategy::ImportanceAndRecency))
    }

    async fn importance_and_recency(&self, persona_id: &str, user_id: &str) -> Result<Vec<Memory>> {
        let rows = sqlx::query(
            "SELECT * FROM memories WHERE persona_id = ?1 AND user_id = ?2
             ORDER BY importance_score DESC, created_at DESC LIMIT 10",
        )
        .bind(persona_id)
        .bind(user_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(DbError::from)?;

        rows.iter()
            .map(|r| Self::row_to_memory(r).map_err(WeaveError::Other))
            .collect()
    }

    /// Run preterite election against every stored memory for the pair and
    /// upsert the classification (§4.2 Preterite election).
    pub async fn elect_all(&self, persona_id: &str, user_id: &str) -> Result<()> {
        let memories = self.importance_and_recency(persona_id, user_id).await?;
        let now = Utc::now();

        for memory in memories {
            let age_days = (now - memory.created_at).num_seconds() as f64 / 86_400.0;
            let score = preterite::election_score(
                &memory.content,
                memory.importance_score,
                age_days,
                memory.access_count,
            );
            let status = preterite::classify(
                score,
                &memory.content,
                memory.importance_score,
                memory.access_count,
                age_days,
            );

            if let ElectionStatus::Preterite(reason) = status {
                self.upsert_preterite(&memory.memory_id, reason, score).await?;
            }
        }
        Ok(())
    }

    async fn upsert_preterite(&self, memory_id: &str, reason: PreteriteReason, score: f64) -> Result<()> {
        sqlx::query(
            "INSERT INTO preterite_memories
                (preterite_id, original_memory_id, preterite_reason, original_score, surface_count, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)
             ON CONFLICT(original_memory_id) DO UPDATE SET
                preterite_reason = excluded.preterite_reason,
                original_score = excluded.original_score",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(memory_id)
        .bind(reason.as_str())
        .bind(score)
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    fn row_to_preterite(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<(PreteriteMemory, String)> {
        let content: String = row.try_get("content")?;
        Ok((
            PreteriteMemory {
                preterite_id: row.try_get("preterite_id")?,
                original_memory_id: row.try_get("original_memory_id")?,
                preterite_reason: PreteriteReason::parse(&row.try_get::<String, _>("preterite_reason")?),
                original_score: row.try_get("original_score")?,
                surface_count: row.try_get("surface_count")?,
                last_surfaced: row
                    .try_get::<Option<String>, _>("last_surfaced")?
                    .map(|s| Self::parse_rfc3339(&s)),
                created_at: Self::parse_rfc3339(&row.try_get::<String, _>("created_at")?),
            },
            content,
        ))
    }

    /// Surface up to 2 random preterite rows for the pair, applying the
    /// corruption transform (§4.2 Surfacing). Callers gate this behind the
    /// fixed 0.15 probability draw.
    pub async fn surface(&self, persona_id: &str, user_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT pm.*, m.content FROM preterite_memories pm
             JOIN memories m ON m.memory_id = pm.original_memory_id
             WHERE m.persona_id = ?1 AND m.user_id = ?2
             ORDER BY RANDOM() LIMIT 2",
        )
        .bind(persona_id)
        .bind(user_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(DbError::from)?;

        let mut surfaced = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let (preterite, content) = Self::row_to_preterite(row).map_err(WeaveError::Other)?;
            let corrupted = preterite::corrupt_content(&content);
            surfaced.push(preterite::frame_surfaced(&corrupted, i));

            let preterite_id = preterite.preterite_id.clone();
            let pool = Arc::clone(&self.pool);
            tokio::spawn(async move {
                let _ = sqlx::query(
                    "UPDATE preterite_memories SET surface_count = surface_count + 1, last_surfaced = ?1 WHERE preterite_id = ?2",
                )
                .bind(Utc::now().to_rfc3339())
                .bind(preterite_id)
                .execute(&*pool)
                .await;
            });
        }

        Ok(surfaced)
    }

    /// §3 Persona Memory — persona-independent facts/opinions/insights a
    /// persona has accumulated, read by the orchestrator's "persona memories"
    /// layer (§4.1 Step 2.7).
    pub async fn list_persona_memories(&self, persona_id: &str) -> Result<Vec<PersonaMemory>> {
        let rows = sqlx::query(
            "SELECT * FROM persona_memories WHERE persona_id = ?1 ORDER BY importance_score DESC LIMIT 10",
        )
        .bind(persona_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(DbError::from)?;

        rows.iter()
            .map(|row| {
                Ok(PersonaMemory {
                    memory_id: row.try_get("memory_id")?,
                    persona_id: row.try_get("persona_id")?,
                    memory_type: PersonaMemoryType::parse(&row.try_get::<String, _>("memory_type")?),
                    source_persona_id: row.try_get("source_persona_id")?,
                    importance_score: row.try_get("importance_score")?,
                    content: row.try_get("content")?,
                    created_at: Self::parse_rfc3339(&row.try_get::<String, _>("created_at")?),
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(WeaveError::Other)
    }

    pub async fn add_persona_memory(&self, memory: PersonaMemory) -> Result<()> {
        sqlx::query(
            "INSERT INTO persona_memories
                (memory_id, persona_id, memory_type, source_persona_id, importance_score, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&memory.memory_id)
        .bind(&memory.persona_id)
        .bind(memory.memory_type.as_str())
        .bind(&memory.source_persona_id)
        .bind(memory.importance_score.clamp(0.0, 1.0))
        .bind(&memory.content)
        .bind(memory.created_at.to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    /// §3 Persona Opinion — unique `(persona, topic)`, upsert semantics.
    pub async fn upsert_opinion(&self, persona_id: &str, topic: &str, stance: &str, confidence: f64) -> Result<()> {
        sqlx::query(
            "INSERT INTO persona_opinions (persona_id, topic, stance, confidence, expression_count, last_expressed)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)
             ON CONFLICT(persona_id, topic) DO UPDATE SET
                stance = excluded.stance,
                confidence = excluded.confidence,
                expression_count = persona_opinions.expression_count + 1,
                last_expressed = excluded.last_expressed",
        )
        .bind(persona_id)
        .bind(topic)
        .bind(stance)
        .bind(confidence.clamp(0.0, 1.0))
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }

    pub async fn list_opinions(&self, persona_id: &str) -> Result<Vec<PersonaOpinion>> {
        let rows = sqlx::query("SELECT * FROM persona_opinions WHERE persona_id = ?1")
            .bind(persona_id)
            .fetch_all(&*self.pool)
            .await
            .map_err(DbError::from)?;

        rows.iter()
            .map(|row| {
                Ok(PersonaOpinion {
                    persona_id: row.try_get("persona_id")?,
                    topic: row.try_get("topic")?,
                    stance: row.try_get("stance")?,
                    confidence: row.try_get("confidence")?,
                    expression_count: row.try_get("expression_count")?,
                    last_expressed: row
                        .try_get::<Option<String>, _>("last_expressed")?
                        .map(|s| Self::parse_rfc3339(&s)),
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(WeaveError::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use crate::memory::embeddings::NoopEmbedding;

    async fn fresh_repo() -> MemoryRepository {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        init_schema(&pool).await.unwrap();
        MemoryRepository::new(Arc::new(pool), Arc::new(NoopEmbedding))
    }

    #[tokio::test]
    async fn store_then_retrieve_falls_back_to_importance_and_recency() {
        let repo = fresh_repo().await;
        repo.store_batch(
            "p1",
            "u1",
            vec![NewMemory {
                content: "a memory about something that matters".into(),
                memory_type: MemoryType::Interaction,
                importance_score: 0.8,
            }],
            13_000,
        )
        .await
        .unwrap();

        let (memories, strategy) = repo.retrieve("p1", "u1", "something").await.unwrap();
        assert_eq!(strategy, RetrievalStrategy::ImportanceAndRecency);
        assert_eq!(memories.len(), 1);
    }

    #[tokio::test]
    async fn batch_respects_cap() {
        let repo = fresh_repo().await;
        let memories: Vec<NewMemory> = (0..10)
            .map(|i| NewMemory {
                content: format!("memory number {i}"),
                memory_type: MemoryType::Insight,
                importance_score: 0.5,
            })
            .collect();
        let ids = repo.store_batch("p1", "u1", memories, 3).await.unwrap();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn election_inserts_preterite_row_for_low_signal_memory() {
        let repo = fresh_repo().await;
        repo.store_batch(
            "p1",
            "u1",
            vec![NewMemory {
                content: "ok".into(),
                memory_type: MemoryType::Interaction,
                importance_score: 0.05,
            }],
            13_000,
        )
        .await
        .unwrap();

        repo.elect_all("p1", "u1").await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM preterite_memories")
            .fetch_one(&*repo.pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }
}
