//! Trial orchestration: state, phases, and the engine that drives them.

pub mod critique;
pub mod engine;
pub mod format;
pub mod outcome;
pub mod persona;
pub mod phase;
pub mod state;

pub use critique::{parse_critique, CritiqueCriterion, CritiqueItem, CritiqueOutcome};
pub use engine::{Courtroom, PhaseEvent, TrialConfig, TrialError, TrialRun};
pub use outcome::Outcome;
pub use persona::{persona_pool, select_judges, JudgePersona};
pub use phase::{IllegalTransition, PhaseTracker, TransitionRecord, TrialPhase};
pub use state::{Side, Speech, TrialState};
