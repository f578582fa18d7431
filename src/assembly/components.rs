use serde::Serialize;

/// Knobs accepted by [`crate::assembly::assemble_context`] (§4.1). Callers
/// typically start from [`AssembleOptions::from_config`] and override only
/// what the invocation needs.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub max_tokens: u32,
    pub include_setting: bool,
    pub include_pynchon: bool,
    pub exchange_count: u32,
}

impl AssembleOptions {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            max_tokens: config.default_max_tokens,
            include_setting: true,
            include_pynchon: true,
            exchange_count: config.default_exchange_count,
        }
    }
}

/// Every layer the orchestrator attempted, each independently nullable
/// (§4.1 Step 2: a failed safe-fetch degrades only its own slot).
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssembledComponents {
    /// Council-variant opening frame (§4.1 council variant, §6). Unused by
    /// `assemble_context`; populated only by `assemble_council_context`.
    pub council_frame: Option<String>,
    pub setting: Option<String>,
    pub ambient: Option<String>,
    pub temporal: Option<String>,
    pub relationship: Option<String>,
    pub persona_relations: Option<String>,
    pub memories: Option<String>,
    pub persona_memories: Option<String>,
    pub preterite: Option<String>,
    pub entropy: Option<String>,
    pub drift_correction: Option<String>,
    pub zone: Option<String>,
    pub they: Option<String>,
    pub counterforce: Option<String>,
    pub narrative: Option<String>,
    pub bleed: Option<String>,
}

/// The has-X flags and budget accounting emitted alongside the assembled
/// prompt (§4.1 Step 5).
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssemblyMetadata {
    pub soul_integrity_failure: bool,
    pub fallback_used: bool,
    pub truncated: bool,
    pub total_tokens: u32,
    pub budget_remaining: i64,
    pub has_council_frame: bool,
    pub has_setting: bool,
    pub has_ambient: bool,
    pub has_temporal: bool,
    pub has_relationship: bool,
    pub has_persona_relations: bool,
    pub has_memories: bool,
    pub has_persona_memories: bool,
    pub has_preterite: bool,
    pub has_entropy: bool,
    pub has_drift_correction: bool,
    pub has_zone: bool,
    pub has_they: bool,
    pub has_counterforce: bool,
    pub has_narrative: bool,
    pub has_bleed: bool,
}

impl AssemblyMetadata {
    pub(super) fn populate_has_flags(&mut self, components: &AssembledComponents) {
        self.has_council_frame = components.council_frame.is_some();
        self.has_setting = components.setting.is_some();
        self.has_ambient = components.ambient.is_some();
        self.has_temporal = components.temporal.is_some();
        self.has_relationship = components.relationship.is_some();
        self.has_persona_relations = components.persona_relations.is_some();
        self.has_memories = components.memories.is_some();
        self.has_persona_memories = components.persona_memories.is_some();
        self.has_preterite = components.preterite.is_some();
        self.has_entropy = components.entropy.is_some();
        self.has_drift_correction = components.drift_correction.is_some();
        self.has_zone = components.zone.is_some();
        self.has_they = components.they.is_some();
        self.has_counterforce = components.counterforce.is_some();
        self.has_narrative = components.narrative.is_some();
        self.has_bleed = components.bleed.is_some();
    }
}

/// The result of a single `assemble_context` invocation (§4.1).
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssembledContext {
    pub prompt: String,
    pub components: AssembledComponents,
    pub metadata: AssemblyMetadata,
}

impl AssembledContext {
    /// The sentinel returned when the soul-integrity gate fails (§4.1 Step
    /// 1, §7): empty prompt, every component `None`, no further work done.
    pub fn soul_integrity_failure() -> Self {
        let mut metadata = AssemblyMetadata::default();
        metadata.soul_integrity_failure = true;
        Self {
            prompt: String::new(),
            components: AssembledComponents::default(),
            metadata,
        }
    }

    /// The minimal fallback prompt used when composition itself fails
    /// catastrophically (§7).
    pub fn fallback() -> Self {
        let mut metadata = AssemblyMetadata::default();
        metadata.fallback_used = true;
        Self {
            prompt: crate::setting::FALLBACK_SETTING.to_string(),
            components: AssembledComponents::default(),
            metadata,
        }
    }
}
