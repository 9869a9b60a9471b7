//! Timeout and retry around a model backend

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::config::LLMConfig;
use super::provider::{LLMProvider, LLMResponse};
use crate::config::RetryPolicy;
use crate::error::HandoffError;
use crate::state::Message;
use crate::tools::ToolDefinition;

/// Wraps a provider with a per-call timeout and retries on recoverable
/// backend errors. Non-retryable errors are returned immediately.
pub struct ResilientProvider {
    inner: Arc<dyn LLMProvider>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ResilientProvider {
    pub fn new(inner: Arc<dyn LLMProvider>, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            inner,
            timeout,
            retry,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

#[async_trait]
impl LLMProvider for ResilientProvider {
    async fn complete(
        &self,
        system_instruction: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, HandoffError> {
        let mut attempt = 0;
        loop {
            let call = self
                .inner
                .complete(system_instruction, messages, tools, config);
            let result = match tokio::time::timeout(self.timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(HandoffError::LlmTimeout(self.timeout)),
            };

            match result {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        provider = self.inner.name(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(provider = self.inner.name(), attempts = attempt + 1, error = %err, "Model call failed");
                    return Err(err);
                }
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }
}

impl std::fmt::Debug for ResilientProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientProvider")
            .field("provider", &self.inner.name())
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}
