//! The in-flight trial record.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::critique::CritiqueItem;
use super::outcome::Outcome;
use super::persona::JudgePersona;

/// One utterance attributed to a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speech {
    pub agent_name: String,
    pub speech: String,
}

impl Speech {
    pub fn new(agent_name: impl Into<String>, speech: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            speech: speech.into(),
        }
    }
}

/// The two adversarial sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Plaintiff,
    Defendant,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Plaintiff, Side::Defendant];

    /// Strategy-store key prefix for this side.
    pub fn key_prefix(self) -> &'static str {
        match self {
            Self::Plaintiff => "plaintiff_lawyer",
            Self::Defendant => "defendant_lawyer",
        }
    }

    /// Client designation bound into the advocate prompt.
    pub fn client_type(self) -> &'static str {
        match self {
            Self::Plaintiff => "원고",
            Self::Defendant => "피고",
        }
    }

    /// Speaker for a debate turn: even turns belong to the plaintiff.
    pub fn for_turn(turn_count: u32) -> Self {
        if turn_count % 2 == 0 {
            Self::Plaintiff
        } else {
            Self::Defendant
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_prefix())
    }
}

/// Everything one trial accumulates, owned by exactly one run.
///
/// Fields are filled in phase order and each post-debate field is written
/// at most once. The struct is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialState {
    pub case_file: String,
    pub plaintiff_lawyer: String,
    pub defendant_lawyer: String,
    pub selected_judges: Vec<JudgePersona>,
    pub debate_transcript: Vec<Speech>,
    pub turn_count: u32,
    pub max_turns: u32,
    pub associate_verdicts: Vec<Speech>,
    pub final_verdict: Option<String>,
    pub plaintiff_outcome: Option<Outcome>,
    pub plaintiff_lesson: Option<String>,
    pub defendant_lesson: Option<String>,
    pub critique_scores: Option<Vec<CritiqueItem>>,
    /// Raw critic text when it could not be validated.
    pub critique_raw: Option<String>,
}

impl TrialState {
    pub fn new(
        case_file: impl Into<String>,
        plaintiff_lawyer: impl Into<String>,
        defendant_lawyer: impl Into<String>,
        selected_judges: Vec<JudgePersona>,
        max_turns: u32,
    ) -> Self {
        Self {
            case_file: case_file.into(),
            plaintiff_lawyer: plaintiff_lawyer.into(),
            defendant_lawyer: defendant_lawyer.into(),
            selected_judges,
            debate_transcript: Vec::new(),
            turn_count: 0,
            max_turns,
            associate_verdicts: Vec::new(),
            final_verdict: None,
            plaintiff_outcome: None,
            plaintiff_lesson: None,
            defendant_lesson: None,
            critique_scores: None,
            critique_raw: None,
        }
    }

    pub fn debate_finished(&self) -> bool {
        self.turn_count >= self.max_turns
    }

    /// Side due to speak next.
    pub fn current_speaker(&self) -> Side {
        Side::for_turn(self.turn_count)
    }

    /// Label the transcript uses for `side`.
    pub fn label_of(&self, side: Side) -> &str {
        match side {
            Side::Plaintiff => &self.plaintiff_lawyer,
            Side::Defendant => &self.defendant_lawyer,
        }
    }

    /// Append one debate speech and advance the turn counter.
    pub fn record_turn(&mut self, side: Side, speech: impl Into<String>) {
        let agent_name = self.label_of(side).to_string();
        self.debate_transcript.push(Speech::new(agent_name, speech));
        self.turn_count += 1;
    }

    /// The speeches `side` gave, in order.
    pub fn speeches_of(&self, side: Side) -> Vec<&str> {
        let label = self.label_of(side);
        self.debate_transcript
            .iter()
            .filter(|s| s.agent_name == label)
            .map(|s| s.speech.as_str())
            .collect()
    }

    pub fn outcome_of(&self, side: Side) -> Option<Outcome> {
        match side {
            Side::Plaintiff => self.plaintiff_outcome,
            Side::Defendant => self.defendant_outcome(),
        }
    }

    pub fn defendant_outcome(&self) -> Option<Outcome> {
        self.plaintiff_outcome.map(Outcome::complement)
    }

    pub fn lesson_of(&self, side: Side) -> Option<&str> {
        match side {
            Side::Plaintiff => self.plaintiff_lesson.as_deref(),
            Side::Defendant => self.defendant_lesson.as_deref(),
        }
    }

    /// One-line progress summary.
    pub fn status_line(&self) -> String {
        format!(
            "turn {}/{} | judges {} | associates {} | verdict {} | outcome {} | critique {}",
            self.turn_count,
            self.max_turns,
            self.selected_judges.len(),
            self.associate_verdicts.len(),
            self.final_verdict.as_ref().map_or("no", |_| "yes"),
            self.plaintiff_outcome
                .map(|o| o.label().to_string())
                .unwrap_or_else(|| "-".into()),
            self.critique_scores
                .as_ref()
                .map(|c| c.len().to_string())
                .unwrap_or_else(|| "-".into()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(max_turns: u32) -> TrialState {
        TrialState::new(
            "사건",
            "원고측 변호사",
            "피고측 변호사",
            Vec::new(),
            max_turns,
        )
    }

    #[test]
    fn test_turn_parity() {
        let mut s = state(5);
        let mut speakers = Vec::new();
        while !s.debate_finished() {
            let side = s.current_speaker();
            speakers.push(side);
            s.record_turn(side, format!("발언 {}", s.turn_count));
        }
        assert_eq!(
            speakers,
            vec![
                Side::Plaintiff,
                Side::Defendant,
                Side::Plaintiff,
                Side::Defendant,
                Side::Plaintiff
            ]
        );
        assert_eq!(s.debate_transcript.len() as u32, s.turn_count);
        assert_eq!(s.debate_transcript[1].agent_name, "피고측 변호사");
    }

    #[test]
    fn test_speeches_of_keeps_order() {
        let mut s = state(4);
        for text in ["p1", "d1", "p2", "d2"] {
            let side = s.current_speaker();
            s.record_turn(side, text);
        }
        assert_eq!(s.speeches_of(Side::Plaintiff), vec!["p1", "p2"]);
        assert_eq!(s.speeches_of(Side::Defendant), vec!["d1", "d2"]);
    }

    #[test]
    fn test_defendant_outcome_complement() {
        let mut s = state(2);
        assert_eq!(s.defendant_outcome(), None);
        s.plaintiff_outcome = Some(Outcome::Win);
        assert_eq!(s.outcome_of(Side::Defendant), Some(Outcome::Loss));
        s.plaintiff_outcome = Some(Outcome::Draw);
        assert_eq!(s.defendant_outcome(), Some(Outcome::Draw));
    }

    #[test]
    fn test_status_line() {
        let s = state(4);
        assert!(s.status_line().starts_with("turn 0/4"));
        assert!(s.status_line().ends_with("critique -"));
    }
}
