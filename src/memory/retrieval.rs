use super::model::Memory;
use std::collections::HashSet;

fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn keyword_overlap_score(content: &str, query_tokens: &HashSet<String>) -> usize {
    let content_tokens = tokenize(content);
    query_tokens.intersection(&content_tokens).count()
}

/// §4.2: always include the single highest-importance ("anchor"); fill the
/// next two slots with the two most recent untaken memories; fill the
/// remainder by keyword-overlap score, ties broken by importance.
pub fn select_for_context<'a>(mems: &'a [Memory], query: &str, max: usize) -> Vec<&'a Memory> {
    if mems.is_empty() || max == 0 {
        return Vec::new();
    }

    let mut taken: HashSet<&str> = HashSet::new();
    let mut selected: Vec<&Memory> = Vec::new();

    if let Some(anchor) = mems
        .iter()
        .max_by(|a, b| a.importance_score.partial_cmp(&b.importance_score).unwrap())
    {
        selected.push(anchor);
        taken.insert(anchor.memory_id.as_str());
    }

    let mut by_recency: Vec<&Memory> = mems
        .iter()
        .filter(|m| !taken.contains(m.memory_id.as_str()))
        .collect();
    by_recency.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    for m in by_recency.into_iter() {
        if selected.len() >= max || selected.len() >= 3 {
            break;
        }
        selected.push(m);
        taken.insert(m.memory_id.as_str());
    }

    let query_tokens = tokenize(query);
    let mut remainder: Vec<&Memory> = mems
        .iter()
        .filter(|m| !taken.contains(m.memory_id.as_str()))
        .collect();
    remainder.sort_by(|a, b| {
        let score_a = keyword_overlap_score(&a.content, &query_tokens);
        let score_b = keyword_overlap_score(&b.content, &query_tokens);
        score_b
            .cmp(&score_a)
            .then_with(|| b.importance_score.partial_cmp(&a.importance_score).unwrap())
    });
    for m in remainder {
        if selected.len() >= max {
            break;
        }
        selected.push(m);
    }

    selected.truncate(max);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::model::MemoryType;
    use chrono::{Duration, Utc};

    fn mem(id: &str, content: &str, importance: f64, age_secs: i64) -> Memory {
        Memory {
            memory_id: id.into(),
            persona_id: "p1".into(),
            user_id: "u1".into(),
            content: content.into(),
            memory_type: MemoryType::Interaction,
            importance_score: importance,
            embedding: None,
            created_at: Utc::now() - Duration::seconds(age_secs),
            last_accessed: Utc::now(),
            access_count: 0,
        }
    }

    #[test]
    fn anchor_is_highest_importance() {
        let mems = vec![mem("a", "alpha", 0.2, 100), mem("b", "beta", 0.9, 200), mem("c", "gamma", 0.4, 5)];
        let selected = select_for_context(&mems, "nothing matches", 3);
        assert_eq!(selected[0].memory_id, "b");
    }

    #[test]
    fn recent_fills_next_two_slots() {
        let mems = vec![
            mem("old", "one", 0.1, 10_000),
            mem("anchor", "two", 0.99, 9_999),
            mem("recent1", "three", 0.05, 5),
            mem("recent2", "four", 0.05, 10),
        ];
        let selected = select_for_context(&mems, "irrelevant", 4);
        assert_eq!(selected[0].memory_id, "anchor");
        assert!(selected[1].memory_id == "recent1" || selected[1].memory_id == "recent2");
    }

    #[test]
    fn keyword_overlap_fills_remainder() {
        let mems = vec![
            mem("anchor", "baseline content", 0.99, 1_000_000),
            mem("r1", "recent a", 0.1, 1),
            mem("r2", "recent b", 0.1, 2),
            mem("r3", "recent c", 0.1, 3),
            mem("kw", "hegel dialectic sublation", 0.2, 500_000),
        ];
        let selected = select_for_context(&mems, "hegel dialectic", 5);
        assert!(selected.iter().any(|m| m.memory_id == "kw"));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(select_for_context(&[], "q", 5).is_empty());
    }
}
