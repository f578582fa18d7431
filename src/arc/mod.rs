pub mod momentum;
pub mod phase;
pub mod repository;

pub use momentum::{analyze_message_momentum, MomentumEffects};
pub use phase::{transition, ArcState, Phase};
pub use repository::ArcRepository;
