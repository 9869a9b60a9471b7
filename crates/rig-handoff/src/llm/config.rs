//! LLM configuration types

use serde::{Deserialize, Serialize};

/// Token usage statistics from an LLM completion.
///
/// # Example
///
/// ```
/// use rig_handoff::llm::TokenUsage;
///
/// let usage = TokenUsage::new(100, 50);
/// assert_eq!(usage.total_tokens, 150);
///
/// let total = usage + TokenUsage::new(200, 75);
/// assert_eq!(total.total_tokens, 425);
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(input: u64, output: u64) -> Self {
        Self {
            input_tokens: input,
            output_tokens: output,
            total_tokens: input + output,
        }
    }

    /// Create from rig-core Usage struct
    pub fn from_rig_usage(usage: &rig::completion::Usage) -> Self {
        Self::new(usage.input_tokens, usage.output_tokens)
    }
}

impl std::ops::Add for TokenUsage {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
        }
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Per-call generation settings.
///
/// ```
/// use rig_handoff::llm::LLMConfig;
///
/// let config = LLMConfig::new("llama3.1").with_temperature(0.0).with_max_tokens(2000);
/// assert_eq!(config.max_tokens, Some(2000));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Model identifier (e.g., "gpt-4o-mini", "llama3.1")
    pub model: String,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: Option<f64>,
    /// Maximum tokens to generate in the response
    pub max_tokens: Option<u64>,
}

impl LLMConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u64) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_accumulates() {
        let mut total = TokenUsage::default();
        total += TokenUsage::new(10, 5);
        total += TokenUsage::new(3, 2);
        assert_eq!(total, TokenUsage::new(13, 7));
    }

    #[test]
    fn test_config_builder() {
        let config = LLMConfig::new("gpt-4o-mini").with_temperature(0.0);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.temperature, Some(0.0));
        assert_eq!(config.max_tokens, None);
    }
}
