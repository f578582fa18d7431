//! Setting compilation (§4.1 Step 2.5, §6): the bar-scene ambiance layer
//! sourced from the `setting_state` singleton and persona-scoped
//! `context_templates`, with the external setting-preference extractor
//! (an LLM call, per §1's explicit out-of-scope list) represented only as
//! a trait seam — same pattern as [`crate::memory::EmbeddingProvider`].

pub mod compiler;
pub mod extractor;
pub mod repository;

pub use compiler::{compile_setting, FALLBACK_SETTING};
pub use extractor::{NoopSettingExtractor, SettingPreferenceExtractor};
pub use repository::{SettingRepository, SettingState};
