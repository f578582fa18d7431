use super::model::{ElectionStatus, PreteriteReason};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

static PERSONAL_PRONOUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(i|me|my|mine|myself|you|your|yours)\b").unwrap());

/// Five emotional-intensity categories, 0.07 each, capped at 0.35 (§4.2).
static EMOTION_CATEGORIES: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\b(happy|joy|delighted|glad|thrilled)\b").unwrap(),
        Regex::new(r"(?i)\b(sad|grief|sorrow|heartbroken|mourn)\b").unwrap(),
        Regex::new(r"(?i)\b(afraid|fear|scared|anxious|dread)\b").unwrap(),
        Regex::new(r"(?i)\b(angry|furious|rage|resent|frustrated)\b").unwrap(),
        Regex::new(r"(?i)\b(wonder|awe|amazed|astonish|marvel)\b").unwrap(),
    ]
});

const FROM_WHAT_WAS_PASSED_OVER_TEMPLATES: [&str; 5] = [
    "From what was passed over: {body}",
    "Something the record almost discarded: {body}",
    "A fragment the ledger nearly forgot: {body}",
    "From the margin of what did not matter: {body}",
    "Out of the preterite dark, this surfaces: {body}",
];

/// `election_score ∈ [0,1]` as the sum of five weighted contributions
/// (§4.2 Preterite election).
pub fn election_score(
    content: &str,
    importance_score: f64,
    age_days: f64,
    access_count: i64,
) -> f64 {
    let word_count = content.split_whitespace().count();

    let emotional = EMOTION_CATEGORIES
        .iter()
        .filter(|re| re.is_match(content))
        .count() as f64
        * 0.07;
    let emotional = emotional.min(0.35);

    let pronoun_hits = PERSONAL_PRONOUN.find_iter(content).count();
    let references = (pronoun_hits as f64 * 0.03).min(0.25);

    let recency = if age_days < 1.0 {
        0.20
    } else if age_days < 7.0 {
        0.15
    } else if age_days < 30.0 {
        0.10
    } else if age_days < 90.0 {
        0.05
    } else {
        0.0
    };

    let length = if word_count >= 20 {
        0.10
    } else if word_count >= 10 {
        0.05
    } else {
        0.0
    };

    let importance_echo = 0.10 * importance_score.clamp(0.0, 1.0);

    let _ = access_count;
    (emotional + references + recency + length + importance_echo).clamp(0.0, 1.0)
}

/// Classify an election score into elect / borderline / preterite, choosing
/// a reason in the fixed enumeration order specified by §4.2.
pub fn classify(
    score: f64,
    content: &str,
    importance_score: f64,
    access_count: i64,
    age_days: f64,
) -> ElectionStatus {
    if score >= 0.7 {
        return ElectionStatus::Elect;
    }
    if score >= 0.4 {
        return ElectionStatus::Borderline;
    }

    let word_count = content.split_whitespace().count();
    let reason = if word_count < 5 {
        PreteriteReason::TooOrdinary
    } else if !PERSONAL_PRONOUN.is_match(content) {
        PreteriteReason::NoWitness
    } else if score < 0.1 {
        PreteriteReason::DeemedInsignificant
    } else if access_count == 0 && age_days > 30.0 {
        PreteriteReason::EntropyClaimed
    } else if importance_score < 0.3 {
        PreteriteReason::Overshadowed
    } else {
        PreteriteReason::PatternMismatch
    };
    ElectionStatus::Preterite(reason)
}

const UNCERTAINTY_MARKERS: [&str; 4] = ["perhaps", "or was it", "maybe", "if memory serves"];

/// Corruption transform applied at surfacing time (§4.2 Surfacing):
/// ellipsis prefix/suffix, per-word redaction/substitution chances, an
/// occasional adjacent-word swap, and a 15-word cap.
pub fn corrupt_content(content: &str) -> String {
    let mut rng = rand::rng();
    let mut words: Vec<String> = content.split_whitespace().map(String::from).collect();

    for word in &mut words {
        let roll: f64 = rng.random();
        if roll < 0.30 {
            *word = "[...]".to_string();
        } else if roll < 0.45 {
            let marker = UNCERTAINTY_MARKERS.choose(&mut rng).unwrap();
            *word = (*marker).to_string();
        }
    }

    if words.len() >= 2 && rng.random_bool(0.2) {
        let i = rng.random_range(0..words.len() - 1);
        words.swap(i, i + 1);
    }

    let truncated = if words.len() > 15 {
        let mut head: Vec<String> = words.into_iter().take(15).collect();
        head.push("…the memory corrupts at the edges…".to_string());
        head
    } else {
        words
    };

    format!("…{}…", truncated.join(" "))
}

pub fn frame_surfaced(corrupted_body: &str, template_index: usize) -> String {
    let template = FROM_WHAT_WAS_PASSED_OVER_TEMPLATES
        [template_index % FROM_WHAT_WAS_PASSED_OVER_TEMPLATES.len()];
    template.replace("{body}", corrupted_body)
}
