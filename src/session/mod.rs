//! Session completion (§4.4, §6, §8): the single write-path that lands a
//! finished conversation's familiarity update and extracted memories, then
//! best-effort touches arc, entropy, temporal, and setting state.

pub mod model;
pub mod transaction;

pub use model::{RelationshipSummary, SessionCompleteRequest, SessionCompleteResult, SessionMessage};
pub use transaction::{complete_session, SessionContext};
