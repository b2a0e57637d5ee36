//! Benchmark runs: full trials over labelled cases, scored into a CSV
//! report and aggregated metrics.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::generation::Generator;
use crate::knowledge::{CaseArchive, StrategyStore};
use crate::trial::{Courtroom, PhaseEvent, TrialConfig};

use super::dataset::CaseRecord;
use super::metrics::{BenchmarkMetrics, CaseResult, MetricsTracker};
use super::report::CsvReport;
use super::{BatchError, DEFENDANT_LABEL, PLAINTIFF_LABEL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkMode {
    /// Reuse whatever the stores already hold.
    Trained,
    /// Wipe both stores before the first case.
    Untrained,
}

impl BenchmarkMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trained => "trained",
            Self::Untrained => "untrained",
        }
    }

    pub fn clears_knowledge(self) -> bool {
        matches!(self, Self::Untrained)
    }
}

impl fmt::Display for BenchmarkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct BenchmarkRunner<'a> {
    generator: &'a dyn Generator,
    strategies: &'a dyn StrategyStore,
    archive: &'a dyn CaseArchive,
    trial_config: TrialConfig,
    pacing: Duration,
}

impl<'a> BenchmarkRunner<'a> {
    pub fn new(
        generator: &'a dyn Generator,
        strategies: &'a dyn StrategyStore,
        archive: &'a dyn CaseArchive,
    ) -> Self {
        Self {
            generator,
            strategies,
            archive,
            trial_config: TrialConfig::default(),
            pacing: Duration::from_secs(1),
        }
    }

    pub fn with_trial_config(mut self, config: TrialConfig) -> Self {
        self.trial_config = config;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Run every case, writing one report row per case as it finishes.
    ///
    /// `on_event` sees each completed phase step of each case.
    pub async fn run<W, F>(
        &self,
        mode: BenchmarkMode,
        cases: &[CaseRecord],
        report: &mut CsvReport<W>,
        mut on_event: F,
    ) -> Result<BenchmarkMetrics, BatchError>
    where
        W: Write,
        F: FnMut(usize, &CaseRecord, &PhaseEvent),
    {
        if mode.clears_knowledge() {
            let clear_err = |e: anyhow::Error| BatchError::Store {
                case_id: "-".into(),
                message: format!("{e:#}"),
            };
            self.strategies.clear().map_err(clear_err)?;
            self.archive.clear().map_err(clear_err)?;
            info!("Cleared strategy store and case archive");
        }

        let courtroom = Courtroom::new(self.generator, self.strategies, self.archive)
            .with_config(self.trial_config.clone());
        let mut tracker = MetricsTracker::new(Uuid::new_v4().to_string(), mode.as_str());
        let total = cases.len();

        for (index, case) in cases.iter().enumerate() {
            info!(case = %case.case_id, index = index + 1, total, mode = %mode, "Benchmark case");
            let trial_err = |source| BatchError::Trial {
                case_id: case.case_id.clone(),
                source,
            };

            let mut run = courtroom
                .open_trial(&case.trial_case_file(), PLAINTIFF_LABEL, DEFENDANT_LABEL)
                .map_err(trial_err)?;
            while let Some(step) = run.next_phase().await {
                let event = step.map_err(trial_err)?;
                on_event(index, case, &event);
            }
            let state = run.into_state();

            let result = CaseResult::from_state(&case.case_id, case.expected_outcome, &state);
            report.write_case(&result)?;
            tracker.add_case(result);
            tokio::time::sleep(self.pacing).await;
        }

        let metrics = tracker.build();
        info!(
            mode = %mode,
            cases = metrics.total_cases,
            accuracy = metrics.accuracy,
            macro_f1 = metrics.macro_f1,
            "Benchmark complete"
        );
        Ok(metrics)
    }
}
