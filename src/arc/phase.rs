use chrono::{DateTime, Utc};

/// Session narrative phase (§3, §4.5). `Impact` is terminal except by
/// explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Rising,
    Apex,
    Falling,
    Impact,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Rising => "rising",
            Phase::Apex => "apex",
            Phase::Falling => "falling",
            Phase::Impact => "impact",
        }
    }

    pub fn parse(s: &str) -> Phase {
        match s {
            "apex" => Phase::Apex,
            "falling" => Phase::Falling,
            "impact" => Phase::Impact,
            _ => Phase::Rising,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArcState {
    pub phase: Phase,
    pub momentum: f64,
    pub apex_reached_at: Option<DateTime<Utc>>,
}

impl ArcState {
    pub fn new_session() -> Self {
        Self {
            phase: Phase::Rising,
            momentum: 0.5,
            apex_reached_at: None,
        }
    }
}

/// Hysteresis transition table (§4.5). `now` is only consulted to stamp
/// `apex_reached_at` the first time APEX is entered; it is monotone
/// thereafter regardless of later phase re-entry.
pub fn transition(current: Phase, momentum: f64, apex_reached_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> (Phase, Option<DateTime<Utc>>) {
    let next = match current {
        Phase::Apex => {
            if momentum < 0.5 {
                Phase::Falling
            } else {
                Phase::Apex
            }
        }
        Phase::Falling => {
            if momentum >= 0.8 {
                Phase::Apex
            } else if momentum < 0.2 {
                Phase::Impact
            } else {
                Phase::Falling
            }
        }
        Phase::Impact => Phase::Impact,
        Phase::Rising => {
            if momentum >= 0.8 {
                Phase::Apex
            } else if momentum < 0.2 {
                Phase::Impact
            } else if momentum < 0.5 {
                Phase::Falling
            } else {
                Phase::Rising
            }
        }
    };

    let apex_reached_at = if next == Phase::Apex && apex_reached_at.is_none() {
        Some(now)
    } else {
        apex_reached_at
    };

    (next, apex_reached_at)
}

/// Per-phase layer modifiers consumed by the Pynchon layers (§4.5).
pub struct PhaseEffects {
    pub entropy_modifier: f64,
    pub preterite_chance_multiplier: f64,
    pub insight_bonus: f64,
}

pub fn phase_effects(phase: Phase, momentum: f64) -> PhaseEffects {
    let (entropy_modifier, base_preterite_multiplier, base_insight_bonus) = match phase {
        Phase::Rising => (0.0, 1.0, 0.0),
        Phase::Apex => (0.1, 0.8, 0.2),
        Phase::Falling => (0.05, 1.1, 0.1),
        Phase::Impact => (0.2, 1.3, 0.3),
    };

    PhaseEffects {
        entropy_modifier,
        preterite_chance_multiplier: base_preterite_multiplier * (1.0 + (1.0 - momentum) * 0.5),
        insight_bonus: base_insight_bonus * momentum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn apex_drops_to_falling_below_half_momentum() {
        let (next, _) = transition(Phase::Apex, 0.49, None, Utc::now());
        assert_eq!(next, Phase::Falling);
    }

    #[test]
    fn apex_holds_at_or_above_half_momentum() {
        let (next, _) = transition(Phase::Apex, 0.5, None, Utc::now());
        assert_eq!(next, Phase::Apex);
    }

    #[test]
    fn falling_rises_to_apex_at_0_8() {
        let (next, _) = transition(Phase::Falling, 0.8, None, Utc::now());
        assert_eq!(next, Phase::Apex);
    }

    #[test]
    fn falling_drops_to_impact_below_0_2() {
        let (next, _) = transition(Phase::Falling, 0.19, None, Utc::now());
        assert_eq!(next, Phase::Impact);
    }

    #[test]
    fn impact_is_terminal() {
        let (next, _) = transition(Phase::Impact, 0.99, None, Utc::now());
        assert_eq!(next, Phase::Impact);
    }

    #[test]
    fn apex_reached_at_is_monotone() {
        let first_time = Utc::now();
        let (phase, reached_at) = transition(Phase::Rising, 0.9, None, first_time);
        assert_eq!(phase, Phase::Apex);
        assert_eq!(reached_at, Some(first_time));

        let later_time = first_time + Duration::hours(1);
        let (_, reached_at_2) = transition(Phase::Apex, 0.9, reached_at, later_time);
        assert_eq!(reached_at_2, Some(first_time));
    }

    #[test]
    fn rising_transitions_match_thresholds() {
        assert_eq!(transition(Phase::Rising, 0.9, None, Utc::now()).0, Phase::Apex);
        assert_eq!(transition(Phase::Rising, 0.1, None, Utc::now()).0, Phase::Impact);
        assert_eq!(transition(Phase::Rising, 0.3, None, Utc::now()).0, Phase::Falling);
        assert_eq!(transition(Phase::Rising, 0.6, None, Utc::now()).0, Phase::Rising);
    }

    #[test]
    fn phase_effects_scale_preterite_by_inverse_momentum() {
        let low_momentum = phase_effects(Phase::Rising, 0.2);
        let high_momentum = phase_effects(Phase::Rising, 0.9);
        assert!(low_momentum.preterite_chance_multiplier > high_momentum.preterite_chance_multiplier);
    }
}
