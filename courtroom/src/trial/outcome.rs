//! Plaintiff outcome decoding.
//!
//! The classifier is asked to answer with exactly one of three Korean tokens.
//! Decoding is strict: only the win and loss tokens are recognized, and any
//! other answer (including the draw token, prose, or an empty string) is
//! a draw. The fallback is intentional: an ambiguous verdict teaches neither
//! side anything, so it must not land in either strategy list.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const WIN_TOKEN: &str = "승리";
pub const LOSS_TOKEN: &str = "패배";
pub const DRAW_TOKEN: &str = "무승부";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Self::Win, Self::Loss, Self::Draw];

    /// Decode raw classifier output. Unrecognized output maps to `Draw`.
    pub fn from_classifier(raw: &str) -> Self {
        match raw.trim() {
            WIN_TOKEN => Self::Win,
            LOSS_TOKEN => Self::Loss,
            _ => Self::Draw,
        }
    }

    /// Parse a dataset label. Accepts the Korean tokens and the English
    /// enum names (case-insensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        match label {
            WIN_TOKEN => return Some(Self::Win),
            LOSS_TOKEN => return Some(Self::Loss),
            DRAW_TOKEN => return Some(Self::Draw),
            _ => {}
        }
        match label.to_ascii_uppercase().as_str() {
            "WIN" => Some(Self::Win),
            "LOSS" => Some(Self::Loss),
            "DRAW" => Some(Self::Draw),
            _ => None,
        }
    }

    /// The opposing side's outcome.
    pub fn complement(self) -> Self {
        match self {
            Self::Win => Self::Loss,
            Self::Loss => Self::Win,
            Self::Draw => Self::Draw,
        }
    }

    /// Korean token, as fed back into prompts and reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Win => WIN_TOKEN,
            Self::Loss => LOSS_TOKEN,
            Self::Draw => DRAW_TOKEN,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
