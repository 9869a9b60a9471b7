//! # Configuration Module
//!
//! Loads the assistant's settings from environment variables (and an optional
//! `.env` file) and converts them into the library's [`HandoffConfig`].
//! Command-line flags are applied on top in `main.rs`.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rig_handoff::{
    CheckpointerConfig, DivisionByZeroPolicy, GraphLimits, HandoffConfig, LLMConfig, RetryPolicy,
};

// =============================================================================
// PROVIDER SELECTION
// =============================================================================
/// Model backend used for the supervisor and every agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Provider {
    /// Local models served by Ollama
    Ollama,
    /// OpenAI API (reads OPENAI_API_KEY)
    #[value(name = "openai")]
    OpenAi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
        }
    }

    /// Model used when LLM_MODEL is not set.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Ollama => "llama3.1",
            Self::OpenAi => "gpt-4o-mini",
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => anyhow::bail!("LLM_PROVIDER must be 'ollama' or 'openai', got: {}", other),
        }
    }
}

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Settings for the handoff assistant.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,

    /// Model name; `None` means the provider's default
    pub model: Option<String>,

    /// Ollama server URL (default: http://localhost:11434)
    pub ollama_host: String,

    /// Sampling temperature; 0.0 keeps routing deterministic
    pub temperature: f64,

    pub max_tokens: u64,

    /// Timeout for a single model call
    pub timeout: Duration,

    /// Retries after a failed or timed-out model call
    pub max_retries: usize,

    /// Model calls allowed in one agent's tool loop
    pub max_tool_iterations: usize,

    /// Directory for file checkpoints; in-memory when unset
    pub checkpoint_dir: Option<PathBuf>,

    pub division_by_zero: DivisionByZeroPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            model: None,
            ollama_host: "http://localhost:11434".to_string(),
            temperature: 0.0,
            max_tokens: 2000,
            timeout: Duration::from_secs(120),
            max_retries: 2,
            max_tool_iterations: rig_handoff::config::DEFAULT_MAX_TOOL_ITERATIONS,
            checkpoint_dir: None,
            division_by_zero: DivisionByZeroPolicy::Sentinel,
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(val) = lookup("LLM_PROVIDER") {
            config.provider = val.parse()?;
        }

        if let Some(val) = lookup("LLM_MODEL") {
            config.model = Some(val);
        }

        if let Some(val) = lookup("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        if let Some(val) = lookup("LLM_TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("LLM_TEMPERATURE must be a valid floating-point number (e.g., 0.0)")?;
        }

        if let Some(val) = lookup("LLM_MAX_TOKENS") {
            config.max_tokens = val
                .parse()
                .context("LLM_MAX_TOKENS must be a valid positive integer")?;
        }

        if let Some(val) = lookup("LLM_TIMEOUT_SECS") {
            let secs: u64 = val
                .parse()
                .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(val) = lookup("LLM_MAX_RETRIES") {
            config.max_retries = val
                .parse()
                .context("LLM_MAX_RETRIES must be a non-negative integer")?;
        }

        if let Some(val) = lookup("MAX_TOOL_ITERATIONS") {
            config.max_tool_iterations = val
                .parse()
                .context("MAX_TOOL_ITERATIONS must be a valid positive integer")?;
        }

        if let Some(val) = lookup("CHECKPOINT_DIR") {
            if !val.trim().is_empty() {
                config.checkpoint_dir = Some(PathBuf::from(val));
            }
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if self.max_tokens == 0 {
            anyhow::bail!("LLM_MAX_TOKENS must be at least 1");
        }

        if self.timeout.is_zero() {
            anyhow::bail!("LLM_TIMEOUT_SECS must be at least 1");
        }

        if self.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            anyhow::bail!("LLM_MODEL cannot be empty");
        }

        if self.provider == Provider::OpenAi && env::var("OPENAI_API_KEY").is_err() {
            anyhow::bail!("OPENAI_API_KEY must be set to use the openai provider");
        }

        self.handoff_config()
            .validate()
            .context("Invalid graph configuration")?;

        Ok(())
    }

    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn llm_config(&self) -> LLMConfig {
        LLMConfig::new(self.model_name())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// Library-level configuration derived from these settings.
    pub fn handoff_config(&self) -> HandoffConfig {
        let checkpointer = match &self.checkpoint_dir {
            Some(path) => CheckpointerConfig::File {
                path: path.clone(),
                compression: false,
            },
            None => CheckpointerConfig::Memory,
        };

        HandoffConfig {
            limits: GraphLimits::default().with_max_tool_iterations(self.max_tool_iterations),
            model_timeout: self.timeout,
            retry: RetryPolicy::new(self.max_retries),
            checkpointer,
        }
    }
}
