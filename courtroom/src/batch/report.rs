//! CSV benchmark report, one row per case.
//!
//! The file starts with a UTF-8 byte-order mark so spreadsheet tools pick up
//! the Korean text correctly.

use std::io::Write;

use chrono::{DateTime, Local};

use crate::trial::CritiqueCriterion;

use super::metrics::CaseResult;

pub const NOT_APPLICABLE: &str = "N/A";
/// `model_outcome` for a labelled case the trial produced no outcome for.
pub const NOT_PREDICTED: &str = "미예측";
/// Reason written when the critic produced no item for a criterion.
pub const MISSING_REASON: &str = "평가 결과가 기록되지 않았습니다.";

const BOM: &str = "\u{feff}";

pub fn header() -> Vec<String> {
    let mut columns = vec![
        "case_id".to_string(),
        "expected_outcome".to_string(),
        "model_outcome".to_string(),
        "is_correct".to_string(),
    ];
    for criterion in CritiqueCriterion::ALL {
        columns.push(format!("{}_score", criterion.key()));
        columns.push(format!("{}_reason", criterion.key()));
    }
    columns
}

/// `benchmark_results_{mode}_{YYYYmmdd_HHMMSS}.csv`
pub fn report_file_name(mode: &str, at: DateTime<Local>) -> String {
    format!(
        "benchmark_results_{}_{}.csv",
        mode.replace(' ', "_"),
        at.format("%Y%m%d_%H%M%S")
    )
}

/// Quote a field when it contains a delimiter, quote, or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn row(result: &CaseResult) -> Vec<String> {
    let expected = result
        .expected
        .map(|e| e.label().to_string())
        .unwrap_or_else(|| NOT_APPLICABLE.to_string());
    let model = match (result.predicted, result.expected) {
        (Some(p), _) => p.label().to_string(),
        (None, Some(_)) => NOT_PREDICTED.to_string(),
        (None, None) => NOT_APPLICABLE.to_string(),
    };
    let correct = match result.is_correct() {
        Some(true) => "Y",
        Some(false) => "N",
        None => NOT_APPLICABLE,
    };

    let mut fields = vec![result.case_id.clone(), expected, model, correct.to_string()];
    for criterion in CritiqueCriterion::ALL {
        match result.item(criterion) {
            Some(item) => {
                fields.push(item.score.to_string());
                fields.push(item.reason.clone());
            }
            None => {
                fields.push("0".to_string());
                fields.push(MISSING_REASON.to_string());
            }
        }
    }
    fields
}

/// Streaming CSV writer; each row is flushed as it is written so a report
/// survives an aborted run.
pub struct CsvReport<W: Write> {
    out: W,
    rows: usize,
}

impl<W: Write> CsvReport<W> {
    /// Write the BOM and header line.
    pub fn new(mut out: W) -> std::io::Result<Self> {
        out.write_all(BOM.as_bytes())?;
        write_line(&mut out, &header())?;
        out.flush()?;
        Ok(Self { out, rows: 0 })
    }

    pub fn write_case(&mut self, result: &CaseResult) -> std::io::Result<()> {
        write_line(&mut self.out, &row(result))?;
        self.out.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn write_line<W: Write>(out: &mut W, fields: &[String]) -> std::io::Result<()> {
    let line = fields
        .iter()
        .map(|f| escape(f))
        .collect::<Vec<_>>()
        .join(",");
    out.write_all(line.as_bytes())?;
    out.write_all(b"\r\n")
}
