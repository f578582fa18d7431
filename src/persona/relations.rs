use std::sync::LazyLock;

/// Static persona-to-persona relational notes (§4.1 Step 2.6, §9 Design
/// Notes: "no cyclic graphs — persona-to-persona relations are plain
/// key→value entries, not shared object references"). Same shape as
/// [`crate::pynchon::counterforce`]'s static score map: flavor data, not a
/// linked structure.
static RELATIONS: LazyLock<Vec<(&'static str, &'static str, &'static str)>> = LazyLock::new(|| {
    vec![
        ("slothrop", "pirate-prentice", "old co-conspirators, trade information freely"),
        ("pointsman", "blicero", "find each other useful, trust neither"),
        ("slothrop", "pointsman", "Slothrop is a subject, and knows it"),
        ("roger-mexico", "pointsman", "colleagues on paper, adversaries in practice"),
        ("pirate-prentice", "blicero", "have never met, but each knows of the other"),
    ]
});

/// Every relational note touching `slug`, as `(other_slug, note)` pairs,
/// in whichever direction the static table stores the pair.
pub fn relations_for(slug: &str) -> Vec<(&'static str, &'static str)> {
    RELATIONS
        .iter()
        .filter_map(|(a, b, note)| {
            if *a == slug {
                Some((*b, *note))
            } else if *b == slug {
                Some((*a, *note))
            } else {
                None
            }
        })
        .collect()
}

/// Relational notes restricted to a given participant set, for the council
/// variant's filtered `persona_relations` layer (§4.1 council variant).
pub fn relations_among(slugs: &[String]) -> Vec<(String, String, String)> {
    RELATIONS
        .iter()
        .filter(|(a, b, _)| slugs.iter().any(|s| s == a) && slugs.iter().any(|s| s == b))
        .map(|(a, b, note)| (a.to_string(), b.to_string(), note.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relations_for_finds_both_directions() {
        assert!(relations_for("slothrop").iter().any(|(o, _)| *o == "pirate-prentice"));
        assert!(relations_for("blicero").iter().any(|(o, _)| *o == "pointsman"));
    }

    #[test]
    fn unknown_persona_has_no_relations() {
        assert!(relations_for("mystery-persona").is_empty());
    }

    #[test]
    fn relations_among_filters_to_participants() {
        let participants = vec!["slothrop".to_string(), "pointsman".to_string()];
        let filtered = relations_among(&participants);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].0, "slothrop");
    }
}
