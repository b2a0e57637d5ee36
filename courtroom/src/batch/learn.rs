//! Dataset learning: one-shot verdicts that seed the strategy store and
//! the case archive without running full trials.

use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::generation::{generate_with_timeout, vars, Generator, PromptTemplate, PromptVars};
use crate::knowledge::{
    commit_case, commit_lesson, ArchivedCase, CaseArchive, StrategyStore, WritePolicy,
};
use crate::trial::{Outcome, Side};

use super::dataset::CaseRecord;
use super::BatchError;

/// What learning one case produced.
#[derive(Debug, Clone, Serialize)]
pub struct LearnedCase {
    pub case_id: String,
    pub verdict: String,
    pub plaintiff_outcome: Outcome,
    pub plaintiff_lesson: String,
    pub defendant_lesson: String,
    /// Strategy keys written for this case.
    pub recorded_keys: Vec<String>,
    pub archived: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LearnSummary {
    pub cases: usize,
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
    pub strategies_recorded: usize,
}

impl LearnSummary {
    fn add(&mut self, case: &LearnedCase) {
        self.cases += 1;
        match case.plaintiff_outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Draw => self.draws += 1,
        }
        self.strategies_recorded += case.recorded_keys.len();
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{} cases learned (plaintiff {}W/{}L/{}D), {} strategies recorded",
            self.cases, self.wins, self.losses, self.draws, self.strategies_recorded
        )
    }
}

pub struct BatchLearner<'a> {
    generator: &'a dyn Generator,
    strategies: &'a dyn StrategyStore,
    archive: &'a dyn CaseArchive,
    pacing: Duration,
    write_policy: WritePolicy,
    generation_timeout: Option<Duration>,
}

impl<'a> BatchLearner<'a> {
    pub fn new(
        generator: &'a dyn Generator,
        strategies: &'a dyn StrategyStore,
        archive: &'a dyn CaseArchive,
    ) -> Self {
        Self {
            generator,
            strategies,
            archive,
            pacing: Duration::from_secs(1),
            write_policy: WritePolicy::AppendAlways,
            generation_timeout: None,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.generation_timeout = timeout;
        self
    }

    async fn generate(
        &self,
        case_id: &str,
        template: PromptTemplate,
        prompt_vars: PromptVars,
    ) -> Result<String, BatchError> {
        generate_with_timeout(
            self.generator,
            template,
            &prompt_vars,
            self.generation_timeout,
        )
        .await
        .map(|text| text.trim().to_string())
        .map_err(|source| BatchError::Generation {
            case_id: case_id.to_string(),
            source,
        })
    }

    /// Learn from a single record. All generation happens before any write.
    pub async fn learn_case(&self, record: &CaseRecord) -> Result<LearnedCase, BatchError> {
        let case_id = record.case_id.as_str();

        let verdict = self
            .generate(
                case_id,
                PromptTemplate::BatchJudge,
                PromptVars::new()
                    .with(vars::PLAINTIFF_STATEMENT, &record.plaintiff_statement)
                    .with(vars::DEFENDANT_STATEMENT, &record.defendant_statement),
            )
            .await?;

        let raw = self
            .generate(
                case_id,
                PromptTemplate::OutcomeClassifier,
                PromptVars::new().with(vars::FINAL_VERDICT, verdict.clone()),
            )
            .await?;
        let plaintiff_outcome = Outcome::from_classifier(&raw);

        let mut lessons = Vec::with_capacity(2);
        for (side, statement) in [
            (Side::Plaintiff, &record.plaintiff_statement),
            (Side::Defendant, &record.defendant_statement),
        ] {
            let outcome = match side {
                Side::Plaintiff => plaintiff_outcome,
                Side::Defendant => plaintiff_outcome.complement(),
            };
            let lesson = self
                .generate(
                    case_id,
                    PromptTemplate::Reflection,
                    PromptVars::new()
                        .with(vars::OUTCOME, outcome.label())
                        .with(vars::MY_SPEECHES, statement.clone()),
                )
                .await?;
            lessons.push((side, outcome, lesson));
        }

        let store_err = |e: anyhow::Error| BatchError::Store {
            case_id: case_id.to_string(),
            message: format!("{e:#}"),
        };

        let policy = self.write_policy;
        let mut recorded_keys = Vec::new();
        for (side, outcome, lesson) in &lessons {
            let committed = commit_lesson(self.strategies, *side, *outcome, lesson, policy);
            if let Some(key) = committed.map_err(store_err)? {
                recorded_keys.push(key);
            }
        }

        let plaintiff_lesson = lessons[0].2.clone();
        let defendant_lesson = lessons[1].2.clone();
        let archived = commit_case(
            self.archive,
            ArchivedCase::new(
                &record.archive_summary(),
                &verdict,
                &plaintiff_lesson,
                &defendant_lesson,
            ),
            policy,
        )
        .map_err(store_err)?;

        Ok(LearnedCase {
            case_id: case_id.to_string(),
            verdict,
            plaintiff_outcome,
            plaintiff_lesson,
            defendant_lesson,
            recorded_keys,
            archived,
        })
    }

    /// Learn every record in order. `on_case` sees `(index, total, result)`.
    pub async fn run<F>(
        &self,
        records: &[CaseRecord],
        mut on_case: F,
    ) -> Result<LearnSummary, BatchError>
    where
        F: FnMut(usize, usize, &LearnedCase),
    {
        let mut summary = LearnSummary::default();
        let total = records.len();
        for (index, record) in records.iter().enumerate() {
            info!(case = %record.case_id, index = index + 1, total, "Learning case");
            let learned = self.learn_case(record).await?;
            on_case(index, total, &learned);
            summary.add(&learned);
            tokio::time::sleep(self.pacing).await;
        }
        info!(summary = %summary.summary_line(), "Batch learning complete");
        Ok(summary)
    }
}
