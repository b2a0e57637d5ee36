//! JSONL case datasets.
//!
//! One JSON object per line:
//! `{"caseId": .., "plaintiff_statement": .., "defendant_statement": .., "expected_outcome": ..}`.
//! `caseId` may be a string or a number; `expected_outcome` is optional.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::trial::format::char_prefix;
use crate::trial::Outcome;

/// Characters of each statement kept in a learned case's archive summary.
pub const SUMMARY_PREFIX_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: malformed case record: {message}", .path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{}:{line}: unknown expected_outcome `{label}`", .path.display())]
    InvalidLabel {
        path: PathBuf,
        line: usize,
        label: String,
    },

    #[error("Dataset has {available} cases but {requested} were requested for the test split")]
    TooFewCases { available: usize, requested: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaseRecord {
    #[serde(
        rename = "caseId",
        alias = "case_id",
        default = "missing_case_id",
        deserialize_with = "case_id_text"
    )]
    pub case_id: String,
    pub plaintiff_statement: String,
    pub defendant_statement: String,
    #[serde(skip)]
    pub expected_outcome: Option<Outcome>,
}

#[derive(Deserialize)]
struct ExpectedField {
    #[serde(default)]
    expected_outcome: Option<String>,
}

fn missing_case_id() -> String {
    "N/A".to_string()
}

fn case_id_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(missing_case_id()),
        other => Err(serde::de::Error::custom(format!(
            "caseId must be a string or number, got {other}"
        ))),
    }
}

impl CaseRecord {
    /// Case file handed to a full trial.
    pub fn trial_case_file(&self) -> String {
        format!(
            "원고 주장: {}\n피고 주장: {}",
            self.plaintiff_statement, self.defendant_statement
        )
    }

    /// Archive summary for a learned case: both statements truncated.
    pub fn archive_summary(&self) -> String {
        format!(
            "원고 주장: {}...\n피고 주장: {}...",
            char_prefix(&self.plaintiff_statement, SUMMARY_PREFIX_CHARS),
            char_prefix(&self.defendant_statement, SUMMARY_PREFIX_CHARS),
        )
    }
}

fn read_lines(path: &Path) -> Result<Vec<(usize, String)>, DatasetError> {
    let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim().trim_start_matches('\u{feff}').to_string()))
        .filter(|(_, line)| !line.is_empty())
        .collect())
}

/// Load and validate every record. Fails on the first bad line.
pub fn load_cases(path: &Path) -> Result<Vec<CaseRecord>, DatasetError> {
    let mut records = Vec::new();
    for (line, text) in read_lines(path)? {
        let malformed = |message: String| DatasetError::Malformed {
            path: path.to_path_buf(),
            line,
            message,
        };
        let parse_error = |e: serde_json::Error| malformed(e.to_string());
        let mut record: CaseRecord = serde_json::from_str(&text).map_err(parse_error)?;
        let expected: ExpectedField = serde_json::from_str(&text).map_err(parse_error)?;

        record.expected_outcome = match expected.expected_outcome.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(label) => Some(Outcome::from_label(label).ok_or_else(|| {
                DatasetError::InvalidLabel {
                    path: path.to_path_buf(),
                    line,
                    label: label.to_string(),
                }
            })?),
        };
        records.push(record);
    }
    tracing::debug!(path = %path.display(), cases = records.len(), "Loaded dataset");
    Ok(records)
}

/// Load lines as raw JSON objects, preserving every field.
pub fn load_raw(path: &Path) -> Result<Vec<Value>, DatasetError> {
    read_lines(path)?
        .into_iter()
        .map(|(line, text)| match serde_json::from_str::<Value>(&text) {
            Ok(value @ Value::Object(_)) => Ok(value),
            Ok(_) => Err(DatasetError::Malformed {
                path: path.to_path_buf(),
                line,
                message: "expected a JSON object".into(),
            }),
            Err(e) => Err(DatasetError::Malformed {
                path: path.to_path_buf(),
                line,
                message: e.to_string(),
            }),
        })
        .collect()
}

/// Write one JSON value per line.
pub fn write_raw(path: &Path, values: &[Value]) -> Result<(), DatasetError> {
    let mut out = String::new();
    for value in values {
        out.push_str(&value.to_string());
        out.push('\n');
    }
    std::fs::write(path, out).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Shuffle `items` and split off the first `test_size` as the test set.
/// Returns `(test, train)`.
pub fn split_cases<T, R: Rng + ?Sized>(
    mut items: Vec<T>,
    test_size: usize,
    rng: &mut R,
) -> Result<(Vec<T>, Vec<T>), DatasetError> {
    if items.len() < test_size {
        return Err(DatasetError::TooFewCases {
            available: items.len(),
            requested: test_size,
        });
    }
    items.shuffle(rng);
    let train = items.split_off(test_size);
    Ok((items, train))
}
