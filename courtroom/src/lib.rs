//! Courtroom simulation core
//!
//! This library provides:
//! - The trial state machine (debate, deliberation, verdict, knowledge
//!   update, critique) over an injected [`Generator`]
//! - Strategy store and precedent archive traits with in-memory and
//!   JSON-file implementations
//! - Batch drivers for dataset learning and benchmark runs, with CSV
//!   reporting and outcome-prediction metrics
//!
//! No LLM client lives here; the `court-agents` crate supplies one.
//!
//! # Usage
//!
//! ```no_run
//! # async fn demo(generator: &dyn courtroom::Generator) -> Result<(), courtroom::TrialError> {
//! use courtroom::{Courtroom, InMemoryCaseArchive, InMemoryStrategyStore};
//!
//! let strategies = InMemoryStrategyStore::new();
//! let archive = InMemoryCaseArchive::new();
//! let court = Courtroom::new(generator, &strategies, &archive);
//! let state = court
//!     .run_trial("아파트 층간소음으로 인한 손해배상 청구", "원고측 변호사", "피고측 변호사")
//!     .await?;
//! println!("{}", state.status_line());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod generation;
pub mod knowledge;
pub mod trial;

pub use generation::{GenerationError, Generator, PromptTemplate, PromptVars};
pub use knowledge::{
    ArchivedCase, CaseArchive, InMemoryCaseArchive, InMemoryStrategyStore, JsonCaseArchive,
    JsonStrategyStore, SimilarCase, StrategyStore, WritePolicy,
};
pub use trial::{
    Courtroom, CritiqueCriterion, CritiqueItem, JudgePersona, Outcome, PhaseEvent, Side, Speech,
    TrialConfig, TrialError, TrialPhase, TrialRun, TrialState,
};
