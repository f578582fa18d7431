//! The eight stylistic "Pynchon" layers (§3, §4.5, §4.6): ambient,
//! entropy, preterite surfacing, zone resistance, they-awareness,
//! counterforce alignment, narrative-gravity arc, and interface bleed.
//! Preterite lives in [`crate::memory::preterite`]; narrative gravity
//! lives in [`crate::arc`]. This module holds the remaining six.

pub mod ambient;
pub mod bleed;
pub mod counterforce;
pub mod data;
pub mod entropy;
pub mod paranoia;
pub mod zone;

pub use ambient::generate as ambient_line;
pub use bleed::generate as bleed_lines;
pub use counterforce::{classify as classify_counterforce, effective_score as counterforce_score};
pub use entropy::{classify as classify_entropy, EntropyRepository};
pub use paranoia::{classify as classify_paranoia, they_line, ParanoiaRepository};
pub use zone::{atmospheric_line as zone_line, proximity as zone_proximity, ZoneRepository};
