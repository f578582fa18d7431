use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discrete trust-level classification of a [`Relationship`]'s
/// `familiarity_score` (§3, §4.4). Always the canonical classification of
/// the current score — never set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    Stranger,
    Acquaintance,
    Familiar,
    Confidant,
}

impl TrustLevel {
    /// Thresholds 0.0 / 0.2 / 0.5 / 0.8 (§3).
    pub fn classify(familiarity_score: f64) -> TrustLevel {
        if familiarity_score >= 0.8 {
            TrustLevel::Confidant
        } else if familiarity_score >= 0.5 {
            TrustLevel::Familiar
        } else if familiarity_score >= 0.2 {
            TrustLevel::Acquaintance
        } else {
            TrustLevel::Stranger
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrustLevel::Stranger => "stranger",
            TrustLevel::Acquaintance => "acquaintance",
            TrustLevel::Familiar => "familiar",
            TrustLevel::Confidant => "confidant",
        }
    }

    pub fn parse(s: &str) -> TrustLevel {
        match s {
            "acquaintance" => TrustLevel::Acquaintance,
            "familiar" => TrustLevel::Familiar,
            "confidant" => TrustLevel::Confidant,
            _ => TrustLevel::Stranger,
        }
    }

    /// `{user_ref}` placeholder resolution for memory framing (§4.2).
    pub fn user_ref(self) -> &'static str {
        match self {
            TrustLevel::Stranger => "a visitor",
            TrustLevel::Acquaintance => "your acquaintance",
            TrustLevel::Familiar => "your friend",
            TrustLevel::Confidant => "your trusted companion",
        }
    }
}

/// Primary key `(user_id, persona_id)` (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    pub user_id: String,
    pub persona_id: String,
    pub familiarity_score: f64,
    pub trust_level: TrustLevel,
    pub interaction_count: i64,
    pub user_summary: Option<String>,
    pub user_preferences: Option<Value>,
    pub memorable_exchanges: Vec<String>,
}

impl Relationship {
    pub fn new_stranger(user_id: &str, persona_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            persona_id: persona_id.to_string(),
            familiarity_score: 0.0,
            trust_level: TrustLevel::Stranger,
            interaction_count: 0,
            user_summary: None,
            user_preferences: None,
            memorable_exchanges: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_matches_thresholds() {
        assert_eq!(TrustLevel::classify(0.0), TrustLevel::Stranger);
        assert_eq!(TrustLevel::classify(0.19), TrustLevel::Stranger);
        assert_eq!(TrustLevel::classify(0.2), TrustLevel::Acquaintance);
        assert_eq!(TrustLevel::classify(0.49), TrustLevel::Acquaintance);
        assert_eq!(TrustLevel::classify(0.5), TrustLevel::Familiar);
        assert_eq!(TrustLevel::classify(0.79), TrustLevel::Familiar);
        assert_eq!(TrustLevel::classify(0.8), TrustLevel::Confidant);
        assert_eq!(TrustLevel::classify(1.0), TrustLevel::Confidant);
    }

    #[test]
    fn new_stranger_defaults() {
        let rel = Relationship::new_stranger("u1", "p1");
        assert_eq!(rel.trust_level, TrustLevel::Stranger);
        assert_eq!(rel.interaction_count, 0);
        assert!((rel.familiarity_score - 0.0).abs() < f64::EPSILON);
    }
}
