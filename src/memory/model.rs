use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// §3 Memory — persona+user-scoped entity. Importance never exceeds 1.0;
/// embeddings, when present, are exactly 1536 dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Interaction,
    Learning,
    Insight,
}

impl MemoryType {
    pub fn as_str(self) -> &'static str {
        match self {
            MemoryType::Interaction => "interaction",
            MemoryType::Learning => "learning",
            MemoryType::Insight => "insight",
        }
    }

    pub fn parse(s: &str) -> MemoryType {
        match s {
            "learning" => MemoryType::Learning,
            "insight" => MemoryType::Insight,
            _ => MemoryType::Interaction,
        }
    }

    /// Keyed template lookup also needs the `relationship`/`general` cases
    /// (§4.2 Framing) which have no corresponding stored variant.
    pub fn framing_key(self) -> &'static str {
        self.as_str()
    }
}

pub const EMBEDDING_DIMENSIONS: usize = 1536;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub memory_id: String,
    pub persona_id: String,
    pub user_id: String,
    pub content: String,
    pub memory_type: MemoryType,
    pub importance_score: f64,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: i64,
}

/// §3 fixed reason enumeration for memories passed over by election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreteriteReason {
    DeemedInsignificant,
    Overshadowed,
    EntropyClaimed,
    TooOrdinary,
    NoWitness,
    PatternMismatch,
}

impl PreteriteReason {
    pub fn as_str(self) -> &'static str {
        match self {
            PreteriteReason::DeemedInsignificant => "deemed_insignificant",
            PreteriteReason::Overshadowed => "overshadowed",
            PreteriteReason::EntropyClaimed => "entropy_claimed",
            PreteriteReason::TooOrdinary => "too_ordinary",
            PreteriteReason::NoWitness => "no_witness",
            PreteriteReason::PatternMismatch => "pattern_mismatch",
        }
    }

    pub fn parse(s: &str) -> PreteriteReason {
        match s {
            "overshadowed" => PreteriteReason::Overshadowed,
            "entropy_claimed" => PreteriteReason::EntropyClaimed,
            "too_ordinary" => PreteriteReason::TooOrdinary,
            "no_witness" => PreteriteReason::NoWitness,
            "pattern_mismatch" => PreteriteReason::PatternMismatch,
            _ => PreteriteReason::DeemedInsignificant,
        }
    }
}

/// Election classification for a stored memory (§4.2, GLOSSARY: Preterite/Elect).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionStatus {
    Elect,
    Borderline,
    Preterite(PreteriteReason),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreteriteMemory {
    pub preterite_id: String,
    pub original_memory_id: String,
    pub preterite_reason: PreteriteReason,
    pub original_score: f64,
    pub surface_count: i64,
    pub last_surfaced: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// §3 Persona Memory — persona-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaMemoryType {
    Opinion,
    Fact,
    Interaction,
    Insight,
    Learned,
}

impl PersonaMemoryType {
    pub fn as_str(self) -> &'static str {
        match self {
            PersonaMemoryType::Opinion => "opinion",
            PersonaMemoryType::Fact => "fact",
            PersonaMemoryType::Interaction => "interaction",
            PersonaMemoryType::Insight => "insight",
            PersonaMemoryType::Learned => "learned",
        }
    }

    pub fn parse(s: &str) -> PersonaMemoryType {
        match s {
            "fact" => PersonaMemoryType::Fact,
            "interaction" => PersonaMemoryType::Interaction,
            "insight" => PersonaMemoryType::Insight,
            "learned" => PersonaMemoryType::Learned,
            _ => PersonaMemoryType::Opinion,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaMemory {
    pub memory_id: String,
    pub persona_id: String,
    pub memory_type: PersonaMemoryType,
    pub source_persona_id: Option<String>,
    pub importance_score: f64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// §3 Persona Opinion — unique `(persona, topic)`, upsert semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaOpinion {
    pub persona_id: String,
    pub topic: String,
    pub stance: String,
    pub confidence: f64,
    pub expression_count: i64,
    pub last_expressed: Option<DateTime<Utc>>,
}

/// Which retrieval strategy actually produced a result (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStrategy {
    Hybrid,
    HybridFallbackToImportance,
    ImportanceAndRecency,
}

impl RetrievalStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            RetrievalStrategy::Hybrid => "hybrid",
            RetrievalStrategy::HybridFallbackToImportance => "hybrid_fallback_to_importance",
            RetrievalStrategy::ImportanceAndRecency => "importance_and_recency",
        }
    }
}
