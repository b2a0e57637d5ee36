//! LLM-backed agents for the courtroom simulator.
//!
//! The `courtroom` crate owns the trial state machine and only knows about
//! the [`courtroom::Generator`] trait. This crate supplies the rest:
//! - [`config`]: provider, model and data-directory settings from env/TOML
//! - [`prompts`]: Korean prompt templates and `{var}` rendering
//! - [`generator`]: a rig-core client implementing `Generator`
//! - [`console`]: plain-text rendering of trials and benchmark results

pub mod config;
pub mod console;
pub mod generator;
pub mod prompts;

pub use config::{CourtConfig, Provider};
pub use generator::RigGenerator;
