use super::components::{AssembledComponents, AssembledContext, AssemblyMetadata};
use super::orchestrator::AssemblyContext;
use super::safe_fetch::safe_fetch;
use crate::memory::MemoryRepository;
use crate::persona;
use crate::pynchon;
use crate::relationship::RelationshipRepository;
use chrono::Utc;
use std::sync::{Arc, LazyLock};

/// Council-frame templates keyed by narrative phase (§4.5, §4.1 council
/// variant). The fallback entry covers any phase label not recognized by
/// the caller (forward-compatible with future arc phases).
static FRAME_TEMPLATES: LazyLock<Vec<(&'static str, &'static str)>> = LazyLock::new(|| {
    vec![
        ("rising", "You are gathered at O Fim with {others} as the night is still finding its shape. The subject on the table: \"{topic}\""),
        ("apex", "You are gathered at O Fim with {others}, and this is the moment the conversation turns on. The subject on the table: \"{topic}\""),
        ("falling", "You are gathered at O Fim with {others}, the energy of the evening already starting to drain. The subject on the table: \"{topic}\""),
        ("impact", "You are gathered at O Fim with {others}, and whatever was going to happen here already has. The subject on the table: \"{topic}\""),
        ("stranger", "You are gathered at O Fim with {others}, most of you still taking each other's measure. The subject on the table: \"{topic}\""),
        ("familiar", "You are gathered at O Fim with {others}, old company by now. The subject on the table: \"{topic}\""),
        ("entropic", "You are gathered at O Fim with {others}, and the room itself feels unreliable tonight. The subject on the table: \"{topic}\""),
    ]
});

const FALLBACK_TEMPLATE: &str = "You are gathered at O Fim with {others} to discuss: \"{topic}\" Phase: {phase}.";

fn frame_for(phase: &str) -> &'static str {
    FRAME_TEMPLATES
        .iter()
        .find(|(key, _)| *key == phase)
        .map(|(_, template)| *template)
        .unwrap_or(FALLBACK_TEMPLATE)
}

/// Build the shared opening frame for a multi-persona council session
/// (§4.1 council variant). `slugs` is every participating persona, in
/// invocation order; `phase` names the narrative phase driving tone.
/// `persona_relations` is its own layer in the council's composition order
/// (§4.1), so this text stays frame-only rather than folding relations in.
fn council_frame_text(slugs: &[String], topic: &str, phase: &str) -> String {
    let template = frame_for(phase);
    let others = slugs.join(", ");
    template
        .replace("{others}", &others)
        .replace("{topic}", topic)
        .replace("{phase}", phase)
}

fn persona_relations_among_text(slugs: &[String]) -> Option<String> {
    let relations = persona::relations_among(slugs);
    if relations.is_empty() {
        None
    } else {
        Some(
            relations
                .into_iter()
                .map(|(a, b, descriptor)| format!("{a} and {b}: {descriptor}"))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

fn compose(layers: &[Option<&str>]) -> String {
    let mut out = String::new();
    for layer in layers.iter().flatten() {
        if layer.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(layer);
    }
    out
}

/// Assemble the council variant of the context prompt (§4.1 council
/// variant, §6): same safe-fetch discipline as [`super::orchestrator::assemble_context`],
/// a different fixed layer order, and no token-budget truncation (councils
/// are smaller). `slugs` is every participating persona, in invocation
/// order; the user-relationship note is built against `slugs[0]` — the
/// council's host persona — since the layer is singular per spec but a
/// council has many participants.
pub async fn assemble_council_context(
    ctx: &AssemblyContext,
    slugs: &[String],
    topic: &str,
    phase: &str,
    session_id: &str,
    user_id: Option<&str>,
) -> AssembledContext {
    let log_persona = slugs.first().map(String::as_str).unwrap_or("council");

    let council_frame = Some(council_frame_text(slugs, topic, phase));

    let entropy_repo = pynchon::EntropyRepository::new(Arc::clone(&ctx.pool));
    let entropy_state = safe_fetch(
        "entropy",
        &ctx.logger,
        log_persona,
        session_id,
        entropy_repo.read_and_decay(),
    )
    .await;

    let ambient_text = entropy_state
        .as_ref()
        .and_then(|(level, _)| pynchon::ambient_line(Utc::now(), *level));
    let entropy_text = entropy_state.as_ref().and_then(|(level, label)| {
        if pynchon::entropy::is_visible(*level) {
            Some(format!("The world feels {}.", label.as_str()))
        } else {
            None
        }
    });

    let persona_relations_text = persona_relations_among_text(slugs);

    let memory_repo = MemoryRepository::new(Arc::clone(&ctx.pool), Arc::clone(&ctx.embedder));
    let mut persona_memory_lines = Vec::new();
    for slug in slugs {
        let fetched = safe_fetch(
            "persona_memories",
            &ctx.logger,
            slug,
            session_id,
            memory_repo.list_persona_memories(slug),
        )
        .await;
        if let Some(memories) = fetched {
            persona_memory_lines.extend(memories.into_iter().map(|m| m.content));
        }
    }
    let persona_memories_text = if persona_memory_lines.is_empty() {
        None
    } else {
        Some(persona_memory_lines.join("\n"))
    };

    let relationship_text = if let Some(user_id) = user_id {
        let relationship_repo = RelationshipRepository::new(Arc::clone(&ctx.pool));
        let relationship = safe_fetch(
            "relationship",
            &ctx.logger,
            log_persona,
            session_id,
            relationship_repo.get_or_create(user_id, log_persona),
        )
        .await;
        relationship.map(|r| {
            format!(
                "You know this gathering's host as {}.",
                r.trust_level.user_ref()
            )
        })
    } else {
        None
    };

    let zone_text = if let Some(proximity) = pynchon::zone_proximity(topic) {
        if let Some(bucket) = pynchon::zone::bucket_for(proximity) {
            let zone_repo = pynchon::zone::ZoneRepository::new(Arc::clone(&ctx.pool));
            let _ = safe_fetch(
                "zone",
                &ctx.logger,
                log_persona,
                session_id,
                zone_repo.record_if_above_threshold(session_id, proximity, bucket),
            )
            .await;
        }
        pynchon::zone_line(topic).map(str::to_string)
    } else {
        None
    };

    let components = AssembledComponents {
        council_frame,
        ambient: ambient_text,
        persona_relations: persona_relations_text,
        persona_memories: persona_memories_text,
        relationship: relationship_text,
        entropy: entropy_text,
        zone: zone_text,
        ..AssembledComponents::default()
    };

    let prompt = compose(&[
        components.council_frame.as_deref(),
        components.ambient.as_deref(),
        components.persona_relations.as_deref(),
        components.persona_memories.as_deref(),
        components.relationship.as_deref(),
        components.entropy.as_deref(),
        components.zone.as_deref(),
    ]);

    let total_tokens = ((prompt.chars().count() as f64) / 4.0).ceil() as u32;
    let mut metadata = AssemblyMetadata {
        total_tokens,
        truncated: false,
        ..AssemblyMetadata::default()
    };
    metadata.populate_has_flags(&components);

    AssembledContext {
        prompt,
        components,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::logger::OperatorLogger;
    use crate::db::schema::init_schema;
    use crate::memory::embeddings::NoopEmbedding;
    use crate::soul::{MarkerCache, SoulValidator};
    use sqlx::SqlitePool;
    use std::time::Duration;

    async fn test_ctx() -> AssemblyContext {
        let pool = Arc::new(SqlitePool::connect("sqlite::memory:").await.unwrap());
        init_schema(&pool).await.unwrap();
        let logger = OperatorLogger::new(Arc::clone(&pool));
        AssemblyContext {
            pool,
            config: Config::default(),
            personas_root: std::path::PathBuf::from("personas"),
            marker_cache: Arc::new(MarkerCache::new()),
            soul_validator: Arc::new(SoulValidator::new(Duration::from_secs(60))),
            embedder: Arc::new(NoopEmbedding),
            logger,
        }
    }

    #[tokio::test]
    async fn unknown_phase_falls_back_to_generic_template() {
        let ctx = test_ctx().await;
        let slugs = vec!["hegel".to_string(), "diogenes".to_string()];
        let assembled = assemble_council_context(&ctx, &slugs, "being", "unheard-of-phase", "s1", None).await;
        assert!(assembled.components.council_frame.unwrap().contains("Phase: unheard-of-phase"));
    }

    #[tokio::test]
    async fn known_phase_uses_its_own_template() {
        let ctx = test_ctx().await;
        let slugs = vec!["hegel".to_string(), "diogenes".to_string()];
        let assembled = assemble_council_context(&ctx, &slugs, "being", "apex", "s2", None).await;
        let frame = assembled.components.council_frame.unwrap();
        assert!(frame.contains("this moment the conversation turns on"));
        assert!(frame.contains("hegel, diogenes"));
    }

    #[tokio::test]
    async fn topic_is_interpolated() {
        let ctx = test_ctx().await;
        let slugs = vec!["hegel".to_string()];
        let assembled = assemble_council_context(&ctx, &slugs, "the nature of freedom", "rising", "s3", None).await;
        assert!(assembled.components.council_frame.unwrap().contains("the nature of freedom"));
    }

    #[tokio::test]
    async fn no_user_id_skips_relationship_note() {
        let ctx = test_ctx().await;
        let slugs = vec!["hegel".to_string()];
        let assembled = assemble_council_context(&ctx, &slugs, "being", "rising", "s4", None).await;
        assert!(assembled.components.relationship.is_none());
        assert!(!assembled.metadata.has_relationship);
    }

    #[tokio::test]
    async fn user_id_present_produces_relationship_note() {
        let ctx = test_ctx().await;
        let slugs = vec!["hegel".to_string()];
        let assembled = assemble_council_context(&ctx, &slugs, "being", "rising", "s5", Some("u1")).await;
        assert!(assembled.components.relationship.is_some());
        assert!(assembled.metadata.has_relationship);
    }

    #[tokio::test]
    async fn persona_relations_layer_is_filtered_to_participants() {
        let ctx = test_ctx().await;
        let slugs = vec!["slothrop".to_string(), "pirate-prentice".to_string()];
        let assembled = assemble_council_context(&ctx, &slugs, "paranoia", "rising", "s7", None).await;
        let relations = assembled.components.persona_relations.unwrap();
        assert!(relations.contains("old co-conspirators"));
    }

    #[tokio::test]
    async fn result_shape_matches_assemble_context() {
        let ctx = test_ctx().await;
        let slugs = vec!["hegel".to_string()];
        let assembled = assemble_council_context(&ctx, &slugs, "being", "rising", "s6", None).await;
        assert!(!assembled.prompt.is_empty());
        assert!(assembled.metadata.has_council_frame);
        assert!(!assembled.metadata.truncated);
    }
}
