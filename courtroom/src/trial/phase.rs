//! Trial phases and the guarded transition log.
//!
//! Every run starts at `Init` and terminates at `End` or `Failed`. The
//! engine calls [`PhaseTracker::advance`] between phases; an edge outside
//! the table is rejected and nothing is recorded.

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialPhase {
    /// Bench seated, counters reset.
    Init,
    /// One advocate speech per step until the turn limit.
    Debate,
    /// Each associate adjudicator gives an opinion.
    AssociateDeliberation,
    /// Presiding adjudicator issues the binding verdict.
    FinalJudgment,
    /// Outcome classification, reflections, store writes.
    KnowledgeUpdate,
    /// Three-criterion scorecard.
    Critique,
    /// Trial complete. Terminal.
    End,
    /// Aborted by a capability or store failure. Terminal.
    Failed,
}

impl TrialPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::End | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Debate => "debate",
            Self::AssociateDeliberation => "associate_deliberation",
            Self::FinalJudgment => "final_judgment",
            Self::KnowledgeUpdate => "knowledge_update",
            Self::Critique => "critique",
            Self::End => "end",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TrialPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ```text
/// Init → Debate
/// Debate → Debate | AssociateDeliberation
/// AssociateDeliberation → FinalJudgment
/// FinalJudgment → KnowledgeUpdate
/// KnowledgeUpdate → Critique
/// Critique → End
/// any non-terminal → Failed
/// ```
fn is_legal_transition(from: TrialPhase, to: TrialPhase) -> bool {
    use TrialPhase::*;

    if to == Failed && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Init, Debate)
            | (Debate, Debate)
            | (Debate, AssociateDeliberation)
            | (AssociateDeliberation, FinalJudgment)
            | (FinalJudgment, KnowledgeUpdate)
            | (KnowledgeUpdate, Critique)
            | (Critique, End)
    )
}

/// A single recorded phase transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: TrialPhase,
    pub to: TrialPhase,
    /// Debate turns completed when the transition happened.
    pub turn: u32,
    /// Milliseconds since the trial was opened.
    pub elapsed_ms: u64,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: TrialPhase,
    pub to: TrialPhase,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal phase transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Current phase plus the full transition history of one trial.
#[derive(Debug)]
pub struct PhaseTracker {
    current: TrialPhase,
    turn: u32,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            current: TrialPhase::Init,
            turn: 0,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> TrialPhase {
        self.current
    }

    pub fn set_turn(&mut self, turn: u32) {
        self.turn = turn;
    }

    pub fn advance(
        &mut self,
        to: TrialPhase,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            turn: self.turn,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            at: Utc::now(),
            reason: reason.map(String::from),
        };

        tracing::debug!(
            from = %self.current,
            to = %to,
            turn = self.turn,
            "Phase transition"
        );

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    pub fn fail(&mut self, reason: &str) -> Result<(), IllegalTransition> {
        self.advance(TrialPhase::Failed, Some(reason))
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// `init -> end (12ms, 9 transitions)`
    pub fn summary(&self) -> String {
        format!(
            "{} -> {} ({}ms, {} transitions)",
            TrialPhase::Init,
            self.current,
            self.created_at.elapsed().as_millis(),
            self.transitions.len(),
        )
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
