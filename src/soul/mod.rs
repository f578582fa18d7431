pub mod markers;
pub mod validator;

pub use markers::{is_diacritic, MarkerCache, PatternSignals, SoulMarkers};
pub use validator::{validate_persona_slug, SoulValidator, ValidationOutcome};
