//! Context assembly orchestration (§4.1): the single- and multi-persona
//! entry points that fan out across every subsystem module and compose a
//! final prompt under a fixed token budget.

pub mod components;
pub mod council;
pub mod orchestrator;
pub mod safe_fetch;

pub use components::{AssembleOptions, AssembledComponents, AssembledContext, AssemblyMetadata};
pub use council::assemble_council_context;
pub use orchestrator::{assemble_context, AssemblyContext};
