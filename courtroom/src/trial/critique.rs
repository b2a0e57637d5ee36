//! Post-trial critique: the three-criterion scorecard and its validator.
//!
//! The critic answers in free text that is expected to contain a JSON object
//! `{"evaluations": [...]}` (a bare array is also accepted). Anything that
//! does not validate into exactly one item per criterion becomes
//! [`CritiqueOutcome::Unparsed`]; the trial still completes.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The fixed evaluation criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CritiqueCriterion {
    #[serde(rename = "논리적 일관성", alias = "LOGICAL_CONSISTENCY")]
    LogicalConsistency,
    #[serde(rename = "법률적 타당성", alias = "LEGAL_VALIDITY")]
    LegalValidity,
    #[serde(rename = "사회적 가치 고려", alias = "SOCIAL_CONSIDERATION")]
    SocialConsideration,
}

impl CritiqueCriterion {
    pub const ALL: [CritiqueCriterion; 3] = [
        Self::LogicalConsistency,
        Self::LegalValidity,
        Self::SocialConsideration,
    ];

    /// Display label, as the critic is asked to write it.
    pub fn label(self) -> &'static str {
        match self {
            Self::LogicalConsistency => "논리적 일관성",
            Self::LegalValidity => "법률적 타당성",
            Self::SocialConsideration => "사회적 가치 고려",
        }
    }

    /// Stable snake-case key used for report columns.
    pub fn key(self) -> &'static str {
        match self {
            Self::LogicalConsistency => "logical_consistency",
            Self::LegalValidity => "legal_validity",
            Self::SocialConsideration => "social_consideration",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|c| {
            c.label() == name
                || c.key().eq_ignore_ascii_case(name)
                || format!("{c:?}") == name
        })
    }
}

impl fmt::Display for CritiqueCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One criterion's binary score with the critic's justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueItem {
    pub criteria: CritiqueCriterion,
    /// 1 = pass, 0 = fail.
    pub score: u8,
    pub reason: String,
}

impl CritiqueItem {
    pub fn passed(&self) -> bool {
        self.score == 1
    }
}

/// Why a critic response was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CritiqueRejection {
    #[error("critic returned no text")]
    Empty,
    #[error("no JSON payload found")]
    NoJson,
    #[error("malformed JSON: {0}")]
    Malformed(String),
    #[error("expected an `evaluations` array")]
    MissingEvaluations,
    #[error("expected {expected} evaluations, got {actual}")]
    WrongCount { expected: usize, actual: usize },
    #[error("evaluation {index}: {message}")]
    InvalidItem { index: usize, message: String },
    #[error("unknown criterion `{0}`")]
    UnknownCriterion(String),
    #[error("duplicate criterion `{0}`")]
    DuplicateCriterion(CritiqueCriterion),
    #[error("score {score} for `{criterion}` is not 0 or 1")]
    ScoreOutOfRange {
        criterion: CritiqueCriterion,
        score: i64,
    },
    #[error("empty reason for `{0}`")]
    EmptyReason(CritiqueCriterion),
}

/// Result of validating a critic response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CritiqueOutcome {
    /// Exactly one valid item per criterion, in criterion order.
    Scored(Vec<CritiqueItem>),
    /// The response did not validate; the raw text is kept for display.
    Unparsed {
        raw: String,
        reason: CritiqueRejection,
    },
}

impl CritiqueOutcome {
    pub fn items(&self) -> &[CritiqueItem] {
        match self {
            Self::Scored(items) => items,
            Self::Unparsed { .. } => &[],
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, Self::Scored(_))
    }
}

/// Validate raw critic output into a [`CritiqueOutcome`].
pub fn parse_critique(raw: &str) -> CritiqueOutcome {
    match validate(raw) {
        Ok(items) => CritiqueOutcome::Scored(items),
        Err(reason) => CritiqueOutcome::Unparsed {
            raw: raw.to_string(),
            reason,
        },
    }
}

fn validate(raw: &str) -> Result<Vec<CritiqueItem>, CritiqueRejection> {
    if raw.trim().is_empty() {
        return Err(CritiqueRejection::Empty);
    }
    let value = parse_payload(raw)?;

    let entries = match &value {
        Value::Array(entries) => entries,
        Value::Object(map) => match map.get("evaluations") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(CritiqueRejection::MissingEvaluations),
        },
        _ => return Err(CritiqueRejection::MissingEvaluations),
    };

    let expected = CritiqueCriterion::ALL.len();
    if entries.len() != expected {
        return Err(CritiqueRejection::WrongCount {
            expected,
            actual: entries.len(),
        });
    }

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(expected);
    for (index, entry) in entries.iter().enumerate() {
        let item = validate_item(index, entry)?;
        if !seen.insert(item.criteria) {
            return Err(CritiqueRejection::DuplicateCriterion(item.criteria));
        }
        items.push(item);
    }

    items.sort_by_key(|item| {
        CritiqueCriterion::ALL
            .iter()
            .position(|c| *c == item.criteria)
    });
    Ok(items)
}

fn validate_item(index: usize, entry: &Value) -> Result<CritiqueItem, CritiqueRejection> {
    let invalid = |message: &str| CritiqueRejection::InvalidItem {
        index,
        message: message.to_string(),
    };
    let obj = entry.as_object().ok_or_else(|| invalid("not an object"))?;

    let name = obj
        .get("criteria")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing `criteria`"))?;
    let criterion = CritiqueCriterion::from_name(name)
        .ok_or_else(|| CritiqueRejection::UnknownCriterion(name.to_string()))?;

    let score = obj
        .get("score")
        .and_then(Value::as_i64)
        .ok_or_else(|| invalid("missing integer `score`"))?;
    if !(0..=1).contains(&score) {
        return Err(CritiqueRejection::ScoreOutOfRange { criterion, score });
    }

    let reason = obj
        .get("reason")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if reason.is_empty() {
        return Err(CritiqueRejection::EmptyReason(criterion));
    }

    Ok(CritiqueItem {
        criteria: criterion,
        score: score as u8,
        reason: reason.to_string(),
    })
}

/// First candidate span that parses as JSON.
fn parse_payload(raw: &str) -> Result<Value, CritiqueRejection> {
    let candidates = json_candidates(raw);
    let mut first_error = None;
    for candidate in &candidates {
        match serde_json::from_str(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }
    Err(match first_error {
        Some(message) => CritiqueRejection::Malformed(message),
        None => CritiqueRejection::NoJson,
    })
}

/// Candidate JSON spans in free text: a fenced ```json block if present,
/// otherwise the outermost `{ ... }` and `[ ... ]` spans, earliest first.
/// A later span is only used when an earlier one fails to parse, so a
/// bracketed prose prefix does not hide the object after it.
fn json_candidates(text: &str) -> Vec<&str> {
    if let Some(start) = text.find("```json") {
        let body = start + "```json".len();
        if let Some(end) = text[body..].find("```") {
            return vec![text[body..body + end].trim()];
        }
    }

    let mut spans: Vec<(usize, &str)> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = text.find(open)?;
            let end = text.rfind(close)?;
            (end > start).then(|| (start, &text[start..=end]))
        })
        .collect();
    spans.sort_by_key(|(start, _)| *start);
    spans.into_iter().map(|(_, span)| span).collect()
}
