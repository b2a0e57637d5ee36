//! Batch drivers: dataset learning and benchmark runs.
//!
//! Both drivers are strictly sequential and pause for a fixed pacing delay
//! after every case. A capability failure aborts the whole batch.

pub mod benchmark;
pub mod dataset;
pub mod learn;
pub mod metrics;
pub mod report;

use thiserror::Error;

use crate::generation::GenerationError;
use crate::trial::TrialError;

pub use benchmark::{BenchmarkMode, BenchmarkRunner};
pub use dataset::{load_cases, load_raw, split_cases, write_raw, CaseRecord, DatasetError};
pub use learn::{BatchLearner, LearnSummary, LearnedCase};
pub use metrics::{BenchmarkMetrics, CaseResult, LabelMetrics, MetricsTracker};
pub use report::{report_file_name, CsvReport};

/// Advocate label for the plaintiff in batch runs.
pub const PLAINTIFF_LABEL: &str = "원고측 변호사";
/// Advocate label for the defendant in batch runs.
pub const DEFENDANT_LABEL: &str = "피고측 변호사";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("Case {case_id}: {source}")]
    Generation {
        case_id: String,
        #[source]
        source: GenerationError,
    },

    #[error("Case {case_id}: {source}")]
    Trial {
        case_id: String,
        #[source]
        source: TrialError,
    },

    #[error("Case {case_id}: store operation failed: {message}")]
    Store { case_id: String, message: String },

    #[error("Failed to write report row: {0}")]
    Report(#[from] std::io::Error),
}
