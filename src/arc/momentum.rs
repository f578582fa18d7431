use super::phase::Phase;
use std::sync::LazyLock;

use regex::Regex;

const BASE_DECAY: f64 = -0.02;
const IMPACT_DELTA_CAP: f64 = 0.05;
pub const SESSION_END_DELTA: f64 = -1.0;

static DEEP_QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bwhy do (you|i)\b|\bwhat does it mean\b|\bhow do you reconcile\b").unwrap());
static PHILOSOPHICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmeaning of\b|\bexistence\b|\btruth\b|\bmorality\b|\bconsciousness\b").unwrap());
static EMOTIONAL_ENGAGEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bi feel\b|\bthis matters to me\b|\bi'?m moved\b|\bthat resonates\b").unwrap());
static FOLLOW_UP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bbut what about\b|\bcan you say more\b|\bgoing further\b|\bbuilding on that\b").unwrap());

static SURFACE_QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(what'?s|who is|when did|where is)\b").unwrap());
static FATIGUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bi'?m tired\b|\bthis is a lot\b|\bcan we stop\b|\blet'?s wrap up\b").unwrap());
static REPETITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\byou (already )?said that\b|\bas i mentioned\b|\bagain\b").unwrap());
static DISENGAGEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bok(ay)?\.?$|\bsure\.?$|\bwhatever\b|\bfine\.?$").unwrap());
static TOPIC_EXHAUSTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blet'?s change the subject\b|\banyway\b|\bmoving on\b").unwrap());

/// Per-phase layer modifiers, scaled by momentum (§4.5). Distinct from
/// `phase::PhaseEffects` in that it is the shape other layers consume
/// directly after a momentum update.
pub struct MomentumEffects {
    pub entropy_modifier: f64,
    pub preterite_chance_multiplier: f64,
    pub insight_bonus: f64,
}

/// Analyze a single user message and return the momentum delta (§4.5).
/// Each booster/drain category counts at most once per message. At
/// IMPACT the result is capped at `+0.05` regardless of how many
/// boosters fired.
pub fn analyze_message_momentum(message: &str, phase: Phase) -> f64 {
    let mut delta = BASE_DECAY;

    if DEEP_QUESTION.is_match(message) {
        delta += 0.08;
    }
    if PHILOSOPHICAL.is_match(message) {
        delta += 0.06;
    }
    if EMOTIONAL_ENGAGEMENT.is_match(message) {
        delta += 0.05;
    }
    if FOLLOW_UP.is_match(message) {
        delta += 0.04;
    }

    if SURFACE_QUESTION.is_match(message) {
        delta -= 0.03;
    }
    if FATIGUE.is_match(message) {
        delta -= 0.08;
    }
    if REPETITION.is_match(message) {
        delta -= 0.05;
    }
    if DISENGAGEMENT.is_match(message) {
        delta -= 0.06;
    }
    if TOPIC_EXHAUSTION.is_match(message) {
        delta -= 0.10;
    }

    if phase == Phase::Impact && delta > IMPACT_DELTA_CAP {
        delta = IMPACT_DELTA_CAP;
    }

    delta
}

/// Apply a delta to the current momentum, clamped to `[0, 1]`.
pub fn apply_delta(current_momentum: f64, delta: f64) -> f64 {
    (current_momentum + delta).clamp(0.0, 1.0)
}

pub fn momentum_effects(phase: Phase, momentum: f64) -> MomentumEffects {
    let effects = super::phase::phase_effects(phase, momentum);
    MomentumEffects {
        entropy_modifier: effects.entropy_modifier,
        preterite_chance_multiplier: effects.preterite_chance_multiplier,
        insight_bonus: effects.insight_bonus,
    }
}
