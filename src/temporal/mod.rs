pub mod model;
pub mod reflection;
pub mod repository;

pub use model::{classify_gap, GapClass};
pub use reflection::reflection_for;
pub use repository::TemporalRepository;
