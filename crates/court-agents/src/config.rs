use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use courtroom::{TrialConfig, WritePolicy};
use serde::Deserialize;
use thiserror::Error;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o";
pub const NVIDIA_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";
pub const NVIDIA_DEFAULT_MODEL: &str = "meta/llama3-70b-instruct";

/// OpenAI-compatible inference provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Nvidia,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Nvidia => "nvidia",
        }
    }

    /// Provider-specific key variable, consulted after `COURT_LLM_API_KEY`.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Nvidia => "NVIDIA_API_KEY",
        }
    }

    fn default_base_url(self, env: &dyn Fn(&str) -> Option<String>) -> String {
        let (var, fallback) = match self {
            Self::OpenAi => return OPENAI_BASE_URL.to_string(),
            Self::Nvidia => ("NVIDIA_NIM_BASE_URL", NVIDIA_BASE_URL),
        };
        env(var).unwrap_or_else(|| fallback.to_string())
    }

    fn default_model(self, env: &dyn Fn(&str) -> Option<String>) -> String {
        let (var, fallback) = match self {
            Self::OpenAi => ("OPENAI_MODEL", OPENAI_DEFAULT_MODEL),
            Self::Nvidia => ("NVIDIA_NIM_MODEL", NVIDIA_DEFAULT_MODEL),
        };
        env(var).unwrap_or_else(|| fallback.to_string())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "nvidia" => Ok(Self::Nvidia),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Unsupported LLM provider '{0}' (expected openai or nvidia)")]
    UnknownProvider(String),

    #[error("No API key for {provider}: set COURT_LLM_API_KEY or {var}")]
    MissingApiKey {
        provider: Provider,
        var: &'static str,
    },

    #[error("Temperature {0} is outside 0.0..=2.0")]
    TemperatureOutOfRange(f64),

    #[error("max_turns must be at least 1")]
    ZeroTurns,
}

/// Top-level simulator configuration.
#[derive(Debug, Clone)]
pub struct CourtConfig {
    pub provider: Provider,
    /// OpenAI-compatible base URL (ends in `/v1`).
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    /// Holds `strategies.json`, `cases.json` and benchmark reports.
    pub data_dir: PathBuf,
    /// Pause between batch cases.
    pub pacing_ms: u64,
    pub max_turns: u32,
    pub similar_case_k: usize,
    pub generation_timeout_ms: Option<u64>,
    pub write_policy: WritePolicy,
    pub seed: Option<u64>,
}

impl Default for CourtConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Optional TOML overrides, applied on top of the environment defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileOverrides {
    provider: Option<Provider>,
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    temperature: Option<f64>,
    data_dir: Option<PathBuf>,
    pacing_ms: Option<u64>,
    max_turns: Option<u32>,
    similar_case_k: Option<usize>,
    generation_timeout_ms: Option<u64>,
    write_policy: Option<WritePolicy>,
    seed: Option<u64>,
}

impl CourtConfig {
    /// Build from an arbitrary variable source. Unparseable values fall back
    /// to their defaults.
    pub fn from_lookup<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = env("COURT_LLM_PROVIDER")
            .and_then(|p| p.parse().ok())
            .unwrap_or(Provider::OpenAi);
        let (base_url, model, api_key) = resolve_endpoint(provider, &env);
        let defaults = TrialConfig::default();

        Self {
            provider,
            base_url,
            model,
            api_key,
            temperature: parsed(&env, "COURT_LLM_TEMPERATURE").unwrap_or(0.7),
            data_dir: env("COURT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./court-data")),
            pacing_ms: parsed(&env, "COURT_PACING_MS").unwrap_or(1000),
            max_turns: parsed(&env, "COURT_MAX_TURNS")
                .unwrap_or(defaults.max_turns),
            similar_case_k: parsed(&env, "COURT_SIMILAR_CASES")
                .unwrap_or(defaults.similar_case_k),
            generation_timeout_ms: parsed(&env, "COURT_GENERATION_TIMEOUT_MS"),
            write_policy: defaults.write_policy,
            seed: parsed(&env, "COURT_SEED"),
        }
    }

    /// Environment defaults overlaid with the TOML file at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::default()
            .merge_toml(&text)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Apply TOML overrides, resolving provider defaults from the process
    /// environment.
    pub fn merge_toml(self, text: &str) -> Result<Self> {
        self.merge_toml_with(text, |key| std::env::var(key).ok())
    }

    /// Apply TOML overrides. Switching provider without naming a base URL
    /// or model re-resolves them for the new provider, with `COURT_LLM_*`
    /// variables from `env` still taking precedence.
    pub fn merge_toml_with<F>(mut self, text: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileOverrides = toml::from_str(text)?;

        if let Some(provider) = file.provider {
            if provider != self.provider {
                let (base_url, model, api_key) = resolve_endpoint(provider, &env);
                self.base_url = base_url;
                self.model = model;
                self.api_key = api_key;
            }
            self.provider = provider;
        }
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.model {
            self.model = v;
        }
        if file.api_key.is_some() {
            self.api_key = file.api_key;
        }
        if let Some(v) = file.temperature {
            self.temperature = v;
        }
        if let Some(v) = file.data_dir {
            self.data_dir = v;
        }
        if let Some(v) = file.pacing_ms {
            self.pacing_ms = v;
        }
        if let Some(v) = file.max_turns {
            self.max_turns = v;
        }
        if let Some(v) = file.similar_case_k {
            self.similar_case_k = v;
        }
        if file.generation_timeout_ms.is_some() {
            self.generation_timeout_ms = file.generation_timeout_ms;
        }
        if let Some(v) = file.write_policy {
            self.write_policy = v;
        }
        if file.seed.is_some() {
            self.seed = file.seed;
        }
        Ok(self)
    }

    /// Settings every command needs before it can reach a model.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey {
                provider: self.provider,
                var: self.provider.api_key_var(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::TemperatureOutOfRange(self.temperature));
        }
        if self.max_turns == 0 {
            return Err(ConfigError::ZeroTurns);
        }
        Ok(())
    }

    pub fn trial_config(&self) -> TrialConfig {
        TrialConfig {
            max_turns: self.max_turns,
            similar_case_k: self.similar_case_k,
            write_policy: self.write_policy,
            seed: self.seed,
            generation_timeout_ms: self.generation_timeout_ms,
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn strategies_path(&self) -> PathBuf {
        self.data_dir.join("strategies.json")
    }

    pub fn archive_path(&self) -> PathBuf {
        self.data_dir.join("cases.json")
    }
}

/// Base URL, model and API key for `provider`. Generic `COURT_LLM_*`
/// variables win over provider-specific ones.
fn resolve_endpoint(
    provider: Provider,
    env: &dyn Fn(&str) -> Option<String>,
) -> (String, String, Option<String>) {
    let base_url = env("COURT_LLM_BASE_URL")
        .unwrap_or_else(|| provider.default_base_url(env));
    let model = env("COURT_LLM_MODEL")
        .unwrap_or_else(|| provider.default_model(env));
    let api_key = env("COURT_LLM_API_KEY")
        .or_else(|| env(provider.api_key_var()));
    (base_url, model, api_key)
}

fn parsed<T: FromStr>(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    env(key).and_then(|v| v.trim().parse().ok())
}

/// Check if an inference endpoint is reachable (GET {url}/models).
pub async fn check_endpoint(url: &str, api_key: Option<&str>) -> bool {
    let models_url = format!("{}/models", url.trim_end_matches('/'));
    let mut request = reqwest::Client::new()
        .get(&models_url)
        .timeout(Duration::from_secs(5));
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }
    match request.send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = CourtConfig::from_lookup(lookup(&[]));
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.base_url, OPENAI_BASE_URL);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.pacing(), Duration::from_millis(1000));
        assert_eq!(config.max_turns, 4);
        assert_eq!(
            config.strategies_path(),
            PathBuf::from("./court-data/strategies.json")
        );
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_nvidia_provider_uses_nim_settings() {
        let config = CourtConfig::from_lookup(lookup(&[
            ("COURT_LLM_PROVIDER", "NVIDIA"),
            ("NVIDIA_NIM_MODEL", "meta/llama3-8b-instruct"),
            ("NVIDIA_API_KEY", "nv-key"),
            ("OPENAI_API_KEY", "oa-key"),
        ]));
        assert_eq!(config.provider, Provider::Nvidia);
        assert_eq!(config.base_url, NVIDIA_BASE_URL);
        assert_eq!(config.model, "meta/llama3-8b-instruct");
        assert_eq!(config.api_key.as_deref(), Some("nv-key"));
    }

    #[test]
    fn test_generic_key_wins_over_provider_key() {
        let config = CourtConfig::from_lookup(lookup(&[
            ("COURT_LLM_API_KEY", "generic"),
            ("OPENAI_API_KEY", "specific"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("generic"));
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = CourtConfig::from_lookup(lookup(&[
            ("COURT_LLM_TEMPERATURE", "warm"),
            ("COURT_MAX_TURNS", "six"),
            ("COURT_PACING_MS", "0"),
        ]));
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_turns, 4);
        assert_eq!(config.pacing_ms, 0);
    }

    #[test]
    fn test_validate() {
        let mut config = CourtConfig::from_lookup(lookup(&[]));
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingApiKey {
                provider: Provider::OpenAi,
                var: "OPENAI_API_KEY"
            })
        );
        config.api_key = Some("k".into());
        assert!(config.validate().is_ok());
        config.temperature = 3.5;
        assert_eq!(
            config.validate(),
            Err(ConfigError::TemperatureOutOfRange(3.5))
        );
        config.temperature = 0.0;
        config.max_turns = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTurns));
    }

    #[test]
    fn test_unknown_provider() {
        assert!(matches!(
            "anthropic".parse::<Provider>(),
            Err(ConfigError::UnknownProvider(p)) if p == "anthropic"
        ));
    }

    #[test]
    fn test_trial_config_carries_overrides() {
        let config = CourtConfig::from_lookup(lookup(&[]))
            .merge_toml(
                r#"
                max_turns = 6
                similar_case_k = 3
                seed = 11
                write_policy = "skip_duplicates"
                "#,
            )
            .unwrap();
        let trial = config.trial_config();
        assert_eq!(trial.max_turns, 6);
        assert_eq!(trial.similar_case_k, 3);
        assert_eq!(trial.seed, Some(11));
        assert_eq!(trial.write_policy, WritePolicy::SkipDuplicates);
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        let err = CourtConfig::from_lookup(lookup(&[]))
            .merge_toml("max_turn = 6")
            .unwrap_err();
        assert!(err.to_string().contains("max_turn"), "{err}");
    }

    #[test]
    fn test_provider_switch_keeps_generic_overrides() {
        let env = lookup(&[
            ("COURT_LLM_MODEL", "served-model"),
            ("NVIDIA_NIM_BASE_URL", "http://nim.local/v1"),
            ("NVIDIA_API_KEY", "nv-key"),
        ]);
        let config = CourtConfig::from_lookup(&env)
            .merge_toml_with(r#"provider = "nvidia""#, &env)
            .unwrap();
        assert_eq!(config.provider, Provider::Nvidia);
        assert_eq!(config.model, "served-model");
        assert_eq!(config.base_url, "http://nim.local/v1");
        assert_eq!(config.api_key.as_deref(), Some("nv-key"));
    }

    #[test]
    fn test_provider_switch_without_env_uses_provider_defaults() {
        let config = CourtConfig::from_lookup(lookup(&[]))
            .merge_toml_with(r#"provider = "nvidia""#, lookup(&[]))
            .unwrap();
        assert_eq!(config.base_url, NVIDIA_BASE_URL);
        assert_eq!(config.model, NVIDIA_DEFAULT_MODEL);
        assert!(config.api_key.is_none());
    }
}
