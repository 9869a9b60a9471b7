//! Runtime configuration
//!
//! Serializable settings shared by the graph, the model wrapper and the
//! checkpoint store. Durations are written in humantime form ("120s", "250ms").

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::checkpoint::CheckpointerConfig;
use crate::error::HandoffError;

/// Default maximum number of graph steps per run
pub const DEFAULT_MAX_STEPS: usize = 25;

/// Default maximum number of model calls in one agent's tool loop
pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;

/// Bounds on a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLimits {
    /// Maximum steps (including start and end) before `RecursionLimit`
    pub max_steps: usize,
    /// Maximum model calls per agent invocation before `ToolLoopExceeded`
    pub max_tool_iterations: usize,
}

impl Default for GraphLimits {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }
}

impl GraphLimits {
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn with_max_tool_iterations(mut self, iterations: usize) -> Self {
        self.max_tool_iterations = iterations;
        self
    }

    pub fn validate(&self) -> Result<(), HandoffError> {
        // start + supervisor + agent + supervisor + end
        if self.max_steps < 5 {
            return Err(HandoffError::config(format!(
                "max_steps must be at least 5, got {}",
                self.max_steps
            )));
        }
        if self.max_tool_iterations == 0 {
            return Err(HandoffError::config("max_tool_iterations must be at least 1"));
        }
        Ok(())
    }
}

/// Retry policy for model calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the first call
    pub max_retries: usize,

    /// Base delay for exponential backoff
    #[serde(with = "humantime_serde")]
    pub backoff_base: Duration,

    /// Maximum delay between retries
    #[serde(with = "humantime_serde")]
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base: Duration::from_millis(250),
            backoff_max: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn with_backoff_max(mut self, max: Duration) -> Self {
        self.backoff_max = max;
        self
    }

    /// Calculate delay for a given retry attempt (exponential backoff)
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt as u32);
        let delay = self.backoff_base.saturating_mul(multiplier);
        delay.min(self.backoff_max)
    }

    /// Check if more retries are allowed
    pub fn should_retry(&self, attempts: usize) -> bool {
        attempts < self.max_retries
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Top-level configuration of a handoff deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffConfig {
    #[serde(default)]
    pub limits: GraphLimits,

    /// Timeout for a single model call
    #[serde(with = "humantime_serde", default = "default_model_timeout")]
    pub model_timeout: Duration,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub checkpointer: CheckpointerConfig,
}

fn default_model_timeout() -> Duration {
    Duration::from_secs(120)
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            limits: GraphLimits::default(),
            model_timeout: default_model_timeout(),
            retry: RetryPolicy::default(),
            checkpointer: CheckpointerConfig::default(),
        }
    }
}

impl HandoffConfig {
    pub fn validate(&self) -> Result<(), HandoffError> {
        self.limits.validate()?;
        if self.model_timeout.is_zero() {
            return Err(HandoffError::config("model_timeout must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_backoff() {
        let policy = RetryPolicy::new(3)
            .with_backoff_base(Duration::from_millis(100))
            .with_backoff_max(Duration::from_millis(350));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(350));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!RetryPolicy::no_retry().should_retry(0));
    }

    #[test]
    fn test_limits_validation() {
        assert!(GraphLimits::default().validate().is_ok());
        assert!(GraphLimits::default().with_max_steps(3).validate().is_err());
        assert!(GraphLimits::default()
            .with_max_tool_iterations(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_config_serde_humantime() {
        let json = r#"{
            "limits": {"max_steps": 12, "max_tool_iterations": 4},
            "model_timeout": "30s",
            "retry": {"max_retries": 1, "backoff_base": "50ms", "backoff_max": "1s"},
            "checkpointer": {"type": "file", "path": "/tmp/ckpt", "compression": true}
        }"#;

        let config: HandoffConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.limits.max_steps, 12);
        assert_eq!(config.model_timeout, Duration::from_secs(30));
        assert_eq!(config.retry.backoff_base, Duration::from_millis(50));
        assert!(matches!(
            config.checkpointer,
            CheckpointerConfig::File { compression: true, .. }
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: HandoffConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HandoffConfig::default());
    }
}
