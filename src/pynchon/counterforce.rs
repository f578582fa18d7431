use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Counterforce,
    Collaborator,
    Neutral,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Counterforce => "counterforce",
            Alignment::Collaborator => "collaborator",
            Alignment::Neutral => "neutral",
        }
    }
}

/// Static per-persona counterforce score/style map (§4.6). Personas not
/// listed default to a neutral static score of `0.0`.
static STATIC_SCORES: LazyLock<HashMap<&'static str, (f64, &'static str)>> = LazyLock::new(|| {
    HashMap::from([
        ("slothrop", (0.7, "paranoid evasion of the System")),
        ("pirate-prentice", (0.6, "improvisational resistance")),
        ("pointsman", (-0.6, "behaviorist control apparatus")),
        ("blicero", (-0.4, "entropy-worshipping authority")),
        ("roger-mexico", (0.2, "statistical skepticism")),
    ])
});

/// Effective counterforce score (§4.6): `clamp(static + learned_delta,
/// -1, 1)`.
pub fn effective_score(persona_slug: &str, learned_delta: f64) -> f64 {
    let (static_score, _) = STATIC_SCORES.get(persona_slug).copied().unwrap_or((0.0, "undetermined"));
    (static_score + learned_delta).clamp(-1.0, 1.0)
}

pub fn style_for(persona_slug: &str) -> &'static str {
    STATIC_SCORES.get(persona_slug).map(|(_, style)| *style).unwrap_or("undetermined")
}

/// Classify an effective score (§4.6): `> 0.5` counterforce, `< -0.3`
/// collaborator, else neutral.
pub fn classify(effective: f64) -> Alignment {
    if effective > 0.5 {
        Alignment::Counterforce
    } else if effective < -0.3 {
        Alignment::Collaborator
    } else {
        Alignment::Neutral
    }
}
