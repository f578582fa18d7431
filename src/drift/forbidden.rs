/// Case-insensitive, persona-independent phrase list (§4.3). Matched against
/// the lowercased response text.
pub const UNIVERSAL_FORBIDDEN_PHRASES: &[&str] = &[
    // AI self-reference
    "as an ai",
    "as a language model",
    "i'm just an ai",
    "i am an artificial intelligence",
    // generic helpfulness
    "i'd be happy to",
    "great question",
    "i'm here to help",
    "let me know if you have any other questions",
    // hedging
    "i apologize",
    "it's important to note",
    "i cannot provide",
    "as a large language model",
];

pub fn count_hits(response_lowercase: &str, phrases: &[&str]) -> usize {
    phrases
        .iter()
        .filter(|p| response_lowercase.contains(*p))
        .count()
}

pub fn matching_phrases<'a>(response_lowercase: &str, phrases: &'a [&'a str]) -> Vec<&'a str> {
    phrases
        .iter()
        .filter(|p| response_lowercase.contains(**p))
        .copied()
        .collect()
}
