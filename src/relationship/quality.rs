use regex::Regex;
use std::sync::LazyLock;

static FOLLOW_UP_LEAD_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(but|and|so|also|what about|how about|could you|can you explain)")
        .unwrap()
});
static DOUBLE_QUESTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?.*\?").unwrap());
static FOLLOW_UP_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(tell me more|go on|continue|elaborate)\b").unwrap()
});
static DEEP_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(why|how|what if|suppose|consider|meaning|nature of)\b").unwrap()
});

/// Any *non-first* user message matches one of six follow-up signals (§4.4).
pub fn has_follow_ups(user_messages: &[String]) -> bool {
    user_messages
        .iter()
        .skip(1)
        .any(|msg| {
            let trimmed = msg.trim();
            FOLLOW_UP_LEAD_IN.is_match(trimmed)
                || DOUBLE_QUESTION.is_match(trimmed)
                || FOLLOW_UP_PHRASE.is_match(trimmed)
        })
}

/// `min(avg_user_msg_length/200, 1) + 0.3*has_deep_question`, clamped to 1
/// (§4.4).
pub fn topic_depth(user_messages: &[String]) -> f64 {
    if user_messages.is_empty() {
        return 0.0;
    }
    let avg_len = user_messages.iter().map(|m| m.chars().count()).sum::<usize>() as f64
        / user_messages.len() as f64;
    let has_deep_question = user_messages.iter().any(|m| DEEP_QUESTION.is_match(m));
    let depth = (avg_len / 200.0).min(1.0) + if has_deep_question { 0.3 } else { 0.0 };
    depth.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_up_detected_in_non_first_message() {
        let msgs = vec!["Tell me about Hegel.".to_string(), "But what about Kant?".to_string()];
        assert!(has_follow_ups(&msgs));
    }

    #[test]
    fn first_message_follow_up_pattern_does_not_count() {
        let msgs = vec!["But what is being?".to_string()];
        assert!(!has_follow_ups(&msgs));
    }

    #[test]
    fn double_question_counts_as_follow_up() {
        let msgs = vec!["Hi".to_string(), "Is that true? Really?".to_string()];
        assert!(has_follow_ups(&msgs));
    }

    #[test]
    fn topic_depth_rewards_deep_questions() {
        let shallow = vec!["hi".to_string()];
        let deep = vec!["Why does being precede essence, and what is the nature of becoming?".to_string()];
        assert!(topic_depth(&deep) > topic_depth(&shallow));
        assert!(topic_depth(&deep) <= 1.0);
    }

    #[test]
    fn empty_messages_yield_zero_depth() {
        assert_eq!(topic_depth(&[]), 0.0);
    }
}
