pub mod model;
pub mod relations;
pub mod repository;

pub use model::{CounterforceAdjustment, LearnedTraits, Persona};
pub use relations::{relations_among, relations_for};
pub use repository::PersonaRepository;
