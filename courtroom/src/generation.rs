//! Generation capability: the seam between the trial engine and any LLM backend.
//!
//! The engine never talks to a model directly. Every agent turn is a call to
//! [`Generator::generate`] with a named [`PromptTemplate`] and a set of
//! variable bindings; the backend decides how the template is rendered and
//! which model answers it.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named prompt templates, one per agent role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTemplate {
    /// Plaintiff or defendant advocate arguing one debate turn.
    Advocate,
    /// Persona-bound associate adjudicator giving a non-binding opinion.
    AssociateJudge,
    /// Presiding adjudicator writing the binding verdict.
    PresidingJudge,
    /// One-shot verdict from raw statements (batch learning).
    BatchJudge,
    /// Plaintiff win/loss/draw classifier over a verdict.
    OutcomeClassifier,
    /// Strategy coach distilling one lesson from an advocate's speeches.
    Reflection,
    /// Post-hoc three-criterion critic.
    Critic,
}

impl PromptTemplate {
    pub const ALL: [PromptTemplate; 7] = [
        Self::Advocate,
        Self::AssociateJudge,
        Self::PresidingJudge,
        Self::BatchJudge,
        Self::OutcomeClassifier,
        Self::Reflection,
        Self::Critic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Advocate => "advocate",
            Self::AssociateJudge => "associate_judge",
            Self::PresidingJudge => "presiding_judge",
            Self::BatchJudge => "batch_judge",
            Self::OutcomeClassifier => "outcome_classifier",
            Self::Reflection => "reflection",
            Self::Critic => "critic",
        }
    }

    /// Variables the engine binds for this template.
    pub fn variables(self) -> &'static [&'static str] {
        match self {
            Self::Advocate => &[
                vars::CLIENT_TYPE,
                vars::CASE_FILE,
                vars::SIMILAR_CASES,
                vars::PAST_LESSONS,
                vars::TRANSCRIPT,
            ],
            Self::AssociateJudge => &[vars::JUDGE_NAME, vars::JUDGE_DESCRIPTION, vars::TRANSCRIPT],
            Self::PresidingJudge => &[vars::TRANSCRIPT, vars::JUDGE_VERDICTS],
            Self::BatchJudge => &[vars::PLAINTIFF_STATEMENT, vars::DEFENDANT_STATEMENT],
            Self::OutcomeClassifier => &[vars::FINAL_VERDICT],
            Self::Reflection => &[vars::OUTCOME, vars::MY_SPEECHES],
            Self::Critic => &[vars::TRANSCRIPT, vars::FINAL_VERDICT],
        }
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variable names bound into prompt templates.
pub mod vars {
    pub const CLIENT_TYPE: &str = "client_type";
    pub const CASE_FILE: &str = "case_file";
    pub const SIMILAR_CASES: &str = "similar_cases";
    pub const PAST_LESSONS: &str = "past_lessons";
    pub const TRANSCRIPT: &str = "transcript";
    pub const JUDGE_NAME: &str = "judge_name";
    pub const JUDGE_DESCRIPTION: &str = "judge_description";
    pub const JUDGE_VERDICTS: &str = "judge_verdicts";
    pub const PLAINTIFF_STATEMENT: &str = "plaintiff_statement";
    pub const DEFENDANT_STATEMENT: &str = "defendant_statement";
    pub const FINAL_VERDICT: &str = "final_verdict";
    pub const OUTCOME: &str = "outcome";
    pub const MY_SPEECHES: &str = "my_speeches";
}

/// Ordered variable bindings for one template invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptVars(BTreeMap<&'static str, String>);

impl PromptVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `value`, replacing any previous binding.
    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.0.insert(key, value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Failure of a single generation call.
///
/// The engine never retries; any of these is fatal to the in-flight trial.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The backend rejected or failed the request (network, provider error).
    #[error("Inference failure [{template}]: {message}")]
    Inference {
        template: PromptTemplate,
        message: String,
    },

    /// The call did not complete within the configured limit.
    #[error("Generation timed out after {elapsed_ms}ms [{template}]")]
    Timeout {
        template: PromptTemplate,
        elapsed_ms: u64,
    },

    /// The template could not be rendered with the supplied variables.
    #[error("Invalid prompt [{template}]: {message}")]
    InvalidPrompt {
        template: PromptTemplate,
        message: String,
    },

    /// The backend answered with nothing but whitespace.
    #[error("Empty response [{template}]")]
    EmptyResponse { template: PromptTemplate },
}

impl GenerationError {
    pub fn template(&self) -> PromptTemplate {
        match self {
            Self::Inference { template, .. }
            | Self::Timeout { template, .. }
            | Self::InvalidPrompt { template, .. }
            | Self::EmptyResponse { template } => *template,
        }
    }
}

/// Stateless text generation parameterized by a template and its variables.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        template: PromptTemplate,
        vars: &PromptVars,
    ) -> Result<String, GenerationError>;
}

/// Run one generation call, cancelling it after `timeout` if one is set.
pub async fn generate_with_timeout(
    generator: &dyn Generator,
    template: PromptTemplate,
    vars: &PromptVars,
    timeout: Option<Duration>,
) -> Result<String, GenerationError> {
    let call = generator.generate(template, vars);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| {
                Err(GenerationError::Timeout {
                    template,
                    elapsed_ms: limit.as_millis() as u64,
                })
            }),
        None => call.await,
    }
}
