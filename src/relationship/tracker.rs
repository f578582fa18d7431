use super::model::TrustLevel;
use super::quality::{has_follow_ups, topic_depth};

/// Result of [`update_familiarity`] — the pure computation behind the
/// session-end relationship update (§4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct FamiliarityUpdate {
    pub new_familiarity: f64,
    pub new_trust_level: TrustLevel,
    pub trust_level_changed: bool,
    pub effective_delta: f64,
}

/// `engagement = clamp( min(msg_count*0.1, 1) + min(duration_min*0.2, 1) +
/// (follow_ups ? 0.5 : 0) + min(topic_depth*0.3, 0.9), 0.5, 2.0 )` (§4.4).
pub fn engagement(msg_count: usize, duration_min: f64, follow_ups: bool, topic_depth: f64) -> f64 {
    let raw = (msg_count as f64 * 0.1).min(1.0)
        + (duration_min * 0.2).min(1.0)
        + if follow_ups { 0.5 } else { 0.0 }
        + (topic_depth * 0.3).min(0.9);
    raw.clamp(0.5, 2.0)
}

/// `effective_delta = min(0.02 * engagement, 0.05)` (§4.4).
pub fn effective_delta(engagement: f64) -> f64 {
    (0.02 * engagement).min(0.05)
}

/// Full familiarity update from raw session signals (§4.4, §8 invariant 5:
/// `familiarity_delta in [0, 0.05]`).
pub fn update_familiarity(
    old_familiarity: f64,
    user_messages: &[String],
    duration_min: f64,
    topic_depth_override: Option<f64>,
) -> FamiliarityUpdate {
    let follow_ups = has_follow_ups(user_messages);
    let depth = topic_depth_override.unwrap_or_else(|| topic_depth(user_messages));
    let eng = engagement(user_messages.len(), duration_min, follow_ups, depth);
    let delta = effective_delta(eng);

    let new_familiarity = (old_familiarity + delta).clamp(0.0, 1.0);
    let old_trust = TrustLevel::classify(old_familiarity);
    let new_trust = TrustLevel::classify(new_familiarity);

    FamiliarityUpdate {
        new_familiarity,
        new_trust_level: new_trust,
        trust_level_changed: old_trust != new_trust,
        effective_delta: delta,
    }
}
