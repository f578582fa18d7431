use regex::Regex;
use std::sync::LazyLock;

static PERSONAL_DISCLOSURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(i am|i'm|i feel|i've been|my name is|i live|i grew up)\b").unwrap()
});
static DEPTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(why|how|meaning|philosophy|nature of|believe)\b").unwrap());
static TOPIC_SIGNIFICANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(always|never|important|matters|really care|passionate)\b").unwrap());
static PREFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bi (like|love|prefer|enjoy|hate|dislike) ([a-z0-9 ,']{2,40})").unwrap()
});
static FACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bi (work as|am a|'m a|study|studied) ([a-z0-9 ,']{2,40})").unwrap()
});

const TOP_K_PER_SESSION: usize = 5;
const MIN_ESTIMATED_IMPORTANCE: f64 = 0.3;
const SUMMARY_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryCandidate {
    pub source_message: String,
    pub importance: f64,
    pub summary: String,
}

struct PatternMatch {
    personal: bool,
    depth: bool,
    topic: bool,
    preference_subject: Option<String>,
    fact_subject: Option<String>,
}

fn scan_patterns(message: &str) -> PatternMatch {
    PatternMatch {
        personal: PERSONAL_DISCLOSURE.is_match(message),
        depth: DEPTH.is_match(message),
        topic: TOPIC_SIGNIFICANCE.is_match(message),
        preference_subject: PREFERENCE
            .captures(message)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str().trim().to_string()),
        fact_subject: FACT
            .captures(message)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str().trim().to_string()),
    }
}

fn pattern_count(m: &PatternMatch) -> usize {
    [
        m.personal,
        m.depth,
        m.topic,
        m.preference_subject.is_some(),
        m.fact_subject.is_some(),
    ]
    .iter()
    .filter(|x| **x)
    .count()
}

/// `0.4·personal + 0.3·depth + 0.3·topic_significance + 0.2·(session>5min)`,
/// clipped to 1.0 (§4.2 Extraction).
fn weighted_importance(m: &PatternMatch, session_duration_min: f64) -> f64 {
    let mut total = 0.0;
    if m.personal {
        total += 0.4;
    }
    if m.depth {
        total += 0.3;
    }
    if m.topic {
        total += 0.3;
    }
    if session_duration_min > 5.0 {
        total += 0.2;
    }
    total.min(1.0)
}

fn summarize_exchange(messages: &[&str], m: &PatternMatch) -> String {
    if let Some(subject) = &m.fact_subject {
        return truncate_prose(&format!("works as {subject}"));
    }
    if let Some(subject) = &m.preference_subject {
        return truncate_prose(&format!("interested in {subject}"));
    }
    let joined = messages.join(" ");
    truncate_prose(&format!("mentioned: {joined}"))
}

fn truncate_prose(s: &str) -> String {
    if s.chars().count() <= SUMMARY_MAX_CHARS {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(SUMMARY_MAX_CHARS.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}

/// Scan only user messages for five pattern classes and build candidates
/// (§4.2 Extraction). `user_messages` is the full user-turn list in order;
/// `all_messages` is the interleaved user+assistant transcript used to build
/// each candidate's summarized exchange (the user message plus up to two
/// subsequent messages).
pub fn extract_candidates(
    user_messages: &[String],
    all_messages: &[String],
    session_duration_min: f64,
) -> Vec<MemoryCandidate> {
    let mut candidates = Vec::new();

    for user_msg in user_messages {
        let pm = scan_patterns(user_msg);
        let count = pattern_count(&pm);
        let estimated_importance = count as f64 * 0.2;
        if estimated_importance < MIN_ESTIMATED_IMPORTANCE {
            continue;
        }

        let importance = weighted_importance(&pm, session_duration_min);
        let start = all_messages
            .iter()
            .position(|m| m == user_msg)
            .unwrap_or(0);
        let window: Vec<&str> = all_messages[start..]
            .iter()
            .take(3)
            .map(String::as_str)
            .collect();
        let summary = summarize_exchange(&window, &pm);

        candidates.push(MemoryCandidate {
            source_message: user_msg.clone(),
            importance,
            summary,
        });
    }

    candidates.sort_by(|a, b| b.importance.partial_cmp(&a.importance).unwrap());
    candidates.truncate(TOP_K_PER_SESSION);
    candidates
}
