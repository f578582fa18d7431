pub mod model;
pub mod quality;
pub mod repository;
pub mod tracker;

pub use model::{Relationship, TrustLevel};
pub use repository::RelationshipRepository;
pub use tracker::{update_familiarity, FamiliarityUpdate};
