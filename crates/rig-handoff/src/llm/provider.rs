//! LLM Provider trait definition
//!
//! The model backend contract: given a system instruction, the conversation
//! history and the tools on offer, return either assistant text or a tool
//! request. Timeouts and retries are the caller's concern (see
//! `ResilientProvider`).

use async_trait::async_trait;

use super::config::{LLMConfig, TokenUsage};
use crate::error::HandoffError;
use crate::state::Message;
use crate::tools::ToolDefinition;

/// LLM completion response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// `AssistantText` or `AssistantToolRequest`
    pub message: Message,
    /// Token usage statistics (if available from provider)
    pub usage: Option<TokenUsage>,
}

impl LLMResponse {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Reject responses that are not assistant output.
    pub fn validated(self) -> Result<Self, HandoffError> {
        match &self.message {
            Message::AssistantText { .. } => Ok(self),
            Message::AssistantToolRequest { calls, .. } if !calls.is_empty() => Ok(self),
            Message::AssistantToolRequest { .. } => Err(HandoffError::llm(
                "backend returned a tool request without any tool calls",
            )),
            other => Err(HandoffError::llm(format!(
                "backend returned a non-assistant message: {:?}",
                other
            ))),
        }
    }
}

/// Core LLM Provider trait
///
/// # Example Implementation
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use rig_handoff::llm::{LLMProvider, LLMResponse, LLMConfig};
///
/// struct EchoProvider;
///
/// #[async_trait]
/// impl LLMProvider for EchoProvider {
///     async fn complete(
///         &self,
///         _system: &str,
///         messages: &[Message],
///         _tools: &[ToolDefinition],
///         _config: Option<&LLMConfig>,
///     ) -> Result<LLMResponse, HandoffError> {
///         let last = messages.last().map(|m| m.text().to_string()).unwrap_or_default();
///         Ok(LLMResponse::new(Message::assistant(last)))
///     }
///
///     fn name(&self) -> &str { "echo" }
///     fn default_model(&self) -> &str { "echo" }
/// }
/// ```
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion.
    ///
    /// # Arguments
    ///
    /// * `system_instruction` - Instruction of the node making the call
    /// * `messages` - Conversation history as seen by that node
    /// * `tools` - Tools the model may request
    /// * `config` - Optional per-call overrides
    async fn complete(
        &self,
        system_instruction: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, HandoffError>;

    /// Provider name for logging (e.g., "openai", "ollama")
    fn name(&self) -> &str;

    /// Default model used by this provider
    fn default_model(&self) -> &str;
}
