//! Trial engine: drives one case through every phase.
//!
//! [`Courtroom`] holds the injected capabilities and configuration.
//! [`Courtroom::open_trial`] validates the input and seats the bench, and
//! the returned [`TrialRun`] executes one phase step per call to
//! [`TrialRun::next_phase`]. Each debate turn is its own step.
//!
//! Store writes happen only in `KnowledgeUpdate`, after both reflections
//! have been generated, so a failure earlier in the trial leaves the stores
//! untouched.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::generation::{
    generate_with_timeout, vars, GenerationError, Generator, PromptTemplate, PromptVars,
};
use crate::knowledge::{
    commit_case, commit_lesson, strategy_key, ArchivedCase, CaseArchive, StrategyList,
    StrategyStore, WritePolicy,
};

use super::critique::{parse_critique, CritiqueOutcome};
use super::format::{
    format_associate_opinions, format_past_lessons, format_similar_cases, format_transcript,
    has_disposition, ARCHIVE_UNAVAILABLE,
};
use super::outcome::Outcome;
use super::persona::{select_judges, ASSOCIATE_BENCH_SIZE};
use super::phase::{IllegalTransition, PhaseTracker, TransitionRecord, TrialPhase};
use super::state::{Side, Speech, TrialState};

/// Per-trial knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    /// Total debate turns across both sides.
    pub max_turns: u32,
    /// Similar cases retrieved for each advocate turn.
    pub similar_case_k: usize,
    pub write_policy: WritePolicy,
    /// Fixes persona selection when set.
    pub seed: Option<u64>,
    /// Per-call generation limit.
    pub generation_timeout_ms: Option<u64>,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            max_turns: 4,
            similar_case_k: 2,
            write_policy: WritePolicy::AppendAlways,
            seed: None,
            generation_timeout_ms: None,
        }
    }
}

impl TrialConfig {
    pub fn generation_timeout(&self) -> Option<Duration> {
        self.generation_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Error)]
pub enum TrialError {
    #[error("Case file is empty")]
    EmptyCaseFile,

    #[error("Invalid trial configuration: {0}")]
    InvalidConfig(String),

    #[error("Generation failed during {phase}: {source}")]
    Generation {
        phase: TrialPhase,
        #[source]
        source: GenerationError,
    },

    #[error("Store operation failed during {phase}: {message}")]
    Store { phase: TrialPhase, message: String },

    #[error(transparent)]
    Transition(#[from] IllegalTransition),

    #[error("{artifact} missing when entering {phase}")]
    MissingArtifact {
        phase: TrialPhase,
        artifact: &'static str,
    },
}

impl TrialError {
    fn store(phase: TrialPhase, err: anyhow::Error) -> Self {
        Self::Store {
            phase,
            message: format!("{err:#}"),
        }
    }
}

/// One completed phase step.
#[derive(Debug, Clone)]
pub struct PhaseEvent {
    /// Phase that just completed.
    pub phase: TrialPhase,
    /// Phase the trial moved to.
    pub next: TrialPhase,
    /// State after the step.
    pub state: TrialState,
}

/// Entry point holding the injected capabilities.
pub struct Courtroom<'a> {
    generator: &'a dyn Generator,
    strategies: &'a dyn StrategyStore,
    archive: &'a dyn CaseArchive,
    config: TrialConfig,
}

impl<'a> Courtroom<'a> {
    pub fn new(
        generator: &'a dyn Generator,
        strategies: &'a dyn StrategyStore,
        archive: &'a dyn CaseArchive,
    ) -> Self {
        Self {
            generator,
            strategies,
            archive,
            config: TrialConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TrialConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    /// Validate inputs and seat the bench. Nothing is generated yet.
    pub fn open_trial(
        &self,
        case_file: &str,
        plaintiff_lawyer: &str,
        defendant_lawyer: &str,
    ) -> Result<TrialRun<'a>, TrialError> {
        if case_file.trim().is_empty() {
            return Err(TrialError::EmptyCaseFile);
        }
        if plaintiff_lawyer.trim().is_empty() || defendant_lawyer.trim().is_empty() {
            return Err(TrialError::InvalidConfig("advocate labels must not be empty".into()));
        }
        if plaintiff_lawyer == defendant_lawyer {
            return Err(TrialError::InvalidConfig(format!(
                "advocate labels must differ (both `{plaintiff_lawyer}`)"
            )));
        }
        if self.config.max_turns == 0 {
            return Err(TrialError::InvalidConfig("max_turns must be at least 1".into()));
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let judges = select_judges(&mut rng, ASSOCIATE_BENCH_SIZE);
        let state = TrialState::new(
            case_file,
            plaintiff_lawyer,
            defendant_lawyer,
            judges,
            self.config.max_turns,
        );

        let id = Uuid::new_v4();
        info!(
            trial = %id,
            max_turns = state.max_turns,
            judges = ?state.selected_judges.iter().map(|j| j.name.as_str()).collect::<Vec<_>>(),
            "Trial opened"
        );

        Ok(TrialRun {
            id,
            generator: self.generator,
            strategies: self.strategies,
            archive: self.archive,
            config: self.config.clone(),
            state,
            tracker: PhaseTracker::new(),
        })
    }

    /// Run a trial to completion and return its terminal state.
    pub async fn run_trial(
        &self,
        case_file: &str,
        plaintiff_lawyer: &str,
        defendant_lawyer: &str,
    ) -> Result<TrialState, TrialError> {
        self.open_trial(case_file, plaintiff_lawyer, defendant_lawyer)?
            .run_to_end()
            .await
    }
}

/// A single in-flight trial.
pub struct TrialRun<'a> {
    id: Uuid,
    generator: &'a dyn Generator,
    strategies: &'a dyn StrategyStore,
    archive: &'a dyn CaseArchive,
    config: TrialConfig,
    state: TrialState,
    tracker: PhaseTracker,
}

impl<'a> TrialRun<'a> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &TrialState {
        &self.state
    }

    pub fn into_state(self) -> TrialState {
        self.state
    }

    /// Phase the next step will execute.
    pub fn phase(&self) -> TrialPhase {
        self.tracker.current()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        self.tracker.transitions()
    }

    /// Execute one step. `None` once the trial has ended or failed.
    pub async fn next_phase(&mut self) -> Option<Result<PhaseEvent, TrialError>> {
        if self.tracker.is_terminal() {
            return None;
        }
        let phase = self.tracker.current();
        info!(trial = %self.id, phase = %phase, turn = self.state.turn_count, "Phase started");

        let step = match self.execute(phase).await {
            Ok(()) => {
                let next = self.next_after(phase);
                self.tracker.set_turn(self.state.turn_count);
                self.tracker
                    .advance(next, None)
                    .map(|()| next)
                    .map_err(TrialError::from)
            }
            Err(e) => Err(e),
        };

        match step {
            Ok(next) => {
                info!(
                    trial = %self.id,
                    phase = %phase,
                    next = %next,
                    status = %self.state.status_line(),
                    "Phase completed"
                );
                Some(Ok(PhaseEvent {
                    phase,
                    next,
                    state: self.state.clone(),
                }))
            }
            Err(e) => {
                warn!(trial = %self.id, phase = %phase, error = %e, "Trial failed");
                if let Err(illegal) = self.tracker.fail(&e.to_string()) {
                    debug!(error = %illegal, "Could not record failure transition");
                }
                Some(Err(e))
            }
        }
    }

    /// Drive every remaining step and return the terminal state.
    pub async fn run_to_end(mut self) -> Result<TrialState, TrialError> {
        while let Some(step) = self.next_phase().await {
            step?;
        }
        debug!(trial = %self.id, summary = %self.tracker.summary(), "Trial finished");
        Ok(self.state)
    }

    fn next_after(&self, phase: TrialPhase) -> TrialPhase {
        match phase {
            TrialPhase::Init => TrialPhase::Debate,
            TrialPhase::Debate if self.state.debate_finished() => TrialPhase::AssociateDeliberation,
            TrialPhase::Debate => TrialPhase::Debate,
            TrialPhase::AssociateDeliberation => TrialPhase::FinalJudgment,
            TrialPhase::FinalJudgment => TrialPhase::KnowledgeUpdate,
            TrialPhase::KnowledgeUpdate => TrialPhase::Critique,
            TrialPhase::Critique => TrialPhase::End,
            TrialPhase::End | TrialPhase::Failed => phase,
        }
    }

    async fn execute(&mut self, phase: TrialPhase) -> Result<(), TrialError> {
        match phase {
            TrialPhase::Init => Ok(()),
            TrialPhase::Debate => self.debate_turn().await,
            TrialPhase::AssociateDeliberation => self.deliberate().await,
            TrialPhase::FinalJudgment => self.final_judgment().await,
            TrialPhase::KnowledgeUpdate => self.update_knowledge().await,
            TrialPhase::Critique => self.critique().await,
            TrialPhase::End | TrialPhase::Failed => Ok(()),
        }
    }

    async fn generate(
        &self,
        phase: TrialPhase,
        template: PromptTemplate,
        prompt_vars: PromptVars,
    ) -> Result<String, TrialError> {
        generate_with_timeout(
            self.generator,
            template,
            &prompt_vars,
            self.config.generation_timeout(),
        )
        .await
        .map(|text| text.trim().to_string())
        .map_err(|source| TrialError::Generation { phase, source })
    }

    fn past_lessons(&self, side: Side) -> Result<String, TrialError> {
        let read = |list| {
            self.strategies
                .list_strategies(&strategy_key(side, list))
                .map_err(|e| TrialError::store(TrialPhase::Debate, e))
        };
        let successful = read(StrategyList::Successful)?;
        let failed = read(StrategyList::Failed)?;
        Ok(format_past_lessons(&successful, &failed))
    }

    fn similar_cases(&self) -> String {
        match self
            .archive
            .search_similar(&self.state.case_file, self.config.similar_case_k)
        {
            Ok(hits) => format_similar_cases(&hits),
            Err(e) => {
                warn!(error = %e, "Case archive search failed");
                ARCHIVE_UNAVAILABLE.to_string()
            }
        }
    }

    async fn debate_turn(&mut self) -> Result<(), TrialError> {
        let side = self.state.current_speaker();
        let prompt_vars = PromptVars::new()
            .with(vars::CLIENT_TYPE, side.client_type())
            .with(vars::CASE_FILE, self.state.case_file.clone())
            .with(vars::SIMILAR_CASES, self.similar_cases())
            .with(vars::PAST_LESSONS, self.past_lessons(side)?)
            .with(
                vars::TRANSCRIPT,
                format_transcript(&self.state.debate_transcript),
            );

        let speech = self
            .generate(TrialPhase::Debate, PromptTemplate::Advocate, prompt_vars)
            .await?;
        self.state.record_turn(side, speech);
        debug!(
            trial = %self.id,
            speaker = %side,
            turn = self.state.turn_count,
            max_turns = self.state.max_turns,
            "Debate turn recorded"
        );
        Ok(())
    }

    async fn deliberate(&mut self) -> Result<(), TrialError> {
        let transcript = format_transcript(&self.state.debate_transcript);
        let mut opinions = Vec::with_capacity(self.state.selected_judges.len());
        for judge in self.state.selected_judges.clone() {
            let prompt_vars = PromptVars::new()
                .with(vars::JUDGE_NAME, judge.name.clone())
                .with(vars::JUDGE_DESCRIPTION, judge.description.clone())
                .with(vars::TRANSCRIPT, transcript.clone());
            let opinion = self
                .generate(
                    TrialPhase::AssociateDeliberation,
                    PromptTemplate::AssociateJudge,
                    prompt_vars,
                )
                .await?;
            debug!(trial = %self.id, judge = %judge.name, "Associate opinion recorded");
            opinions.push(Speech::new(judge.name, opinion));
        }
        self.state.associate_verdicts = opinions;
        Ok(())
    }

    async fn final_judgment(&mut self) -> Result<(), TrialError> {
        let prompt_vars = PromptVars::new()
            .with(
                vars::TRANSCRIPT,
                format_transcript(&self.state.debate_transcript),
            )
            .with(
                vars::JUDGE_VERDICTS,
                format_associate_opinions(&self.state.associate_verdicts),
            );
        let verdict = self
            .generate(
                TrialPhase::FinalJudgment,
                PromptTemplate::PresidingJudge,
                prompt_vars,
            )
            .await?;
        if !has_disposition(&verdict) {
            debug!(trial = %self.id, "Verdict does not open with a disposition");
        }
        self.state.final_verdict = Some(verdict);
        Ok(())
    }

    async fn update_knowledge(&mut self) -> Result<(), TrialError> {
        const PHASE: TrialPhase = TrialPhase::KnowledgeUpdate;
        let verdict = self
            .state
            .final_verdict
            .clone()
            .ok_or(TrialError::MissingArtifact {
                phase: PHASE,
                artifact: "final verdict",
            })?;

        let raw = self
            .generate(
                PHASE,
                PromptTemplate::OutcomeClassifier,
                PromptVars::new().with(vars::FINAL_VERDICT, verdict.clone()),
            )
            .await?;
        let plaintiff_outcome = Outcome::from_classifier(&raw);
        if plaintiff_outcome == Outcome::Draw && raw != Outcome::Draw.label() {
            debug!(trial = %self.id, raw = %raw, "Unrecognized classifier output treated as draw");
        }

        let mut lessons = Vec::with_capacity(Side::BOTH.len());
        for side in Side::BOTH {
            let outcome = match side {
                Side::Plaintiff => plaintiff_outcome,
                Side::Defendant => plaintiff_outcome.complement(),
            };
            let prompt_vars = PromptVars::new()
                .with(vars::OUTCOME, outcome.label())
                .with(vars::MY_SPEECHES, self.state.speeches_of(side).join("\n"));
            let lesson = self
                .generate(PHASE, PromptTemplate::Reflection, prompt_vars)
                .await?;
            lessons.push((side, outcome, lesson));
        }

        let policy = self.config.write_policy;
        for (side, outcome, lesson) in &lessons {
            if let Some(key) = commit_lesson(self.strategies, *side, *outcome, lesson, policy)
                .map_err(|e| TrialError::store(PHASE, e))?
            {
                info!(trial = %self.id, key = %key, "Strategy recorded");
            }
        }

        let [(_, _, plaintiff_lesson), (_, _, defendant_lesson)] = &lessons[..] else {
            return Err(TrialError::MissingArtifact {
                phase: PHASE,
                artifact: "reflection lessons",
            });
        };
        let case = ArchivedCase::new(
            &self.state.case_file,
            &verdict,
            plaintiff_lesson,
            defendant_lesson,
        );
        commit_case(self.archive, case, policy)
            .map_err(|e| TrialError::store(PHASE, e))?;

        self.state.plaintiff_outcome = Some(plaintiff_outcome);
        self.state.plaintiff_lesson = Some(plaintiff_lesson.clone());
        self.state.defendant_lesson = Some(defendant_lesson.clone());
        info!(trial = %self.id, outcome = %plaintiff_outcome, "Knowledge updated");
        Ok(())
    }

    async fn critique(&mut self) -> Result<(), TrialError> {
        let verdict = self
            .state
            .final_verdict
            .clone()
            .ok_or(TrialError::MissingArtifact {
                phase: TrialPhase::Critique,
                artifact: "final verdict",
            })?;
        let prompt_vars = PromptVars::new()
            .with(
                vars::TRANSCRIPT,
                format_transcript(&self.state.debate_transcript),
            )
            .with(vars::FINAL_VERDICT, verdict);
        let raw = self
            .generate(TrialPhase::Critique, PromptTemplate::Critic, prompt_vars)
            .await?;

        match parse_critique(&raw) {
            CritiqueOutcome::Scored(items) => {
                self.state.critique_scores = Some(items);
            }
            CritiqueOutcome::Unparsed { raw, reason } => {
                warn!(trial = %self.id, reason = %reason, "Critique could not be parsed");
                self.state.critique_scores = Some(Vec::new());
                self.state.critique_raw = Some(raw);
            }
        }
        Ok(())
    }
}
