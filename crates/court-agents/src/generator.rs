use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use courtroom::{GenerationError, Generator, PromptTemplate, PromptVars};
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use tracing::debug;

use crate::config::CourtConfig;
use crate::prompts;

/// [`Generator`] backed by an OpenAI-compatible chat endpoint.
///
/// Each call renders the template, builds a fresh single-turn agent with
/// the template's preamble, and returns the trimmed reply. OpenAI and
/// NVIDIA NIM both speak the same protocol, so only the base URL differs.
pub struct RigGenerator {
    client: openai::CompletionsClient,
    model: String,
    temperature: f64,
}

impl RigGenerator {
    pub fn new(config: &CourtConfig) -> Result<Self> {
        let api_key = config.api_key.as_deref().unwrap_or("not-needed");
        let client = openai::CompletionsClient::builder()
            .api_key(api_key)
            .base_url(&config.base_url)
            .build()
            .with_context(|| format!("Failed to build {} client", config.provider))?;

        Ok(Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Generator for RigGenerator {
    async fn generate(
        &self,
        template: PromptTemplate,
        vars: &PromptVars,
    ) -> Result<String, GenerationError> {
        let prompt = prompts::render(template, vars)?;
        let agent = self
            .client
            .agent(&self.model)
            .preamble(prompts::preamble(template))
            .temperature(self.temperature)
            .build();

        let started = Instant::now();
        let response: String = agent
            .prompt(prompt.as_str())
            .await
            .map_err(|e| GenerationError::Inference {
                template,
                message: e.to_string(),
            })?;
        debug!(
            template = %template,
            model = %self.model,
            prompt_version = prompts::PROMPT_VERSION,
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = response.chars().count(),
            "Generation complete"
        );

        let trimmed = response.trim();
        if trimmed.is_empty() {
            return Err(GenerationError::EmptyResponse { template });
        }
        Ok(trimmed.to_string())
    }
}
