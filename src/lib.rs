#![warn(clippy::all, clippy::pedantic)]
#![allow(
    async_fn_in_trait,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

//! Context assembly pipeline for a multi-persona conversational runtime:
//! given a persona slug and a live session, [`assembly::assemble_context`]
//! fans out across relationship, memory, narrative-arc, and stylistic
//! ("Pynchon") layers and composes a single prompt under a token budget.
//! [`session::complete_session`] is the matching write path run once a
//! conversation ends.

pub mod arc;
pub mod assembly;
pub mod config;
pub mod db;
pub mod drift;
pub mod error;
pub mod memory;
pub mod persona;
pub mod pynchon;
pub mod relationship;
pub mod session;
pub mod setting;
pub mod soul;
pub mod temporal;

pub use config::Config;
pub use error::{Result, WeaveError};
