//! Adapter for using Rig Agents as LLMProvider
//!
//! Rig agents normally run their own tool loop. Here the handoff graph owns
//! the loop, so the adapter only uses Rig's completion API: the node's system
//! instruction becomes the preamble, the tool definitions are forwarded so the
//! model can emit tool calls, and the calls come back as
//! `AssistantToolRequest` messages for the graph to execute.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rig::providers::ollama;
//! use rig::client::{CompletionClient, ProviderClient};
//! use rig_handoff::compat::RigAgentAdapter;
//!
//! let client = ollama::Client::from_env();
//! let agent = client.agent("llama3.1").build();
//! let provider = Arc::new(RigAgentAdapter::with_names(agent, "ollama", "llama3.1"));
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use rig::agent::Agent;
use rig::completion::{
    Completion, CompletionModel, Message as RigMessage, ToolDefinition as RigToolDefinition,
};
use rig::message::{AssistantContent, ToolCall as RigToolCall};
use rig::OneOrMany;

use crate::error::HandoffError;
use crate::llm::{LLMConfig, LLMProvider, LLMResponse, TokenUsage};
use crate::state::{Message, ToolCall};
use crate::tools::ToolDefinition;

/// Adapter that wraps a Rig `Agent<M>` to implement `LLMProvider`.
///
/// # Type Parameters
///
/// - `M`: The Rig CompletionModel type (e.g., Ollama, OpenAI)
pub struct RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    agent: Arc<Agent<M>>,
    provider_name: String,
    model_name: String,
}

impl<M> RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    pub fn new(agent: Agent<M>) -> Self {
        Self::with_names(agent, "rig", "rig-agent")
    }

    /// Create adapter with custom provider/model names for logging.
    pub fn with_names(
        agent: Agent<M>,
        provider_name: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            agent: Arc::new(agent),
            provider_name: provider_name.into(),
            model_name: model_name.into(),
        }
    }

    pub fn agent(&self) -> &Agent<M> {
        &self.agent
    }
}

#[async_trait]
impl<M> LLMProvider for RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    async fn complete(
        &self,
        system_instruction: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, HandoffError> {
        let conversation = build_rig_conversation(system_instruction, messages);
        let mut builder = self
            .agent
            .completion(conversation.prompt, conversation.history)
            .await
            .map_err(|e| HandoffError::llm(format!("Rig agent error: {}", e)))?;

        if let Some(system_preamble) = conversation.preamble {
            let preamble = match self.agent.preamble.as_deref() {
                Some(agent_preamble) => format!("{}\n\n{}", agent_preamble, system_preamble),
                None => system_preamble,
            };
            builder = builder.preamble(preamble);
        }

        if let Some(cfg) = config {
            if let Some(temperature) = cfg.temperature {
                builder = builder.temperature(temperature);
            }
            if let Some(max_tokens) = cfg.max_tokens {
                builder = builder.max_tokens(max_tokens);
            }
        }

        let rig_tools = to_rig_tool_definitions(tools);
        if !rig_tools.is_empty() {
            builder = builder.tools(rig_tools);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HandoffError::llm(format!("Rig agent error: {}", e)))?;

        let message = message_from_rig_choice(&response.choice);
        let usage = TokenUsage::from_rig_usage(&response.usage);

        let mut llm_response = LLMResponse::new(message);
        if usage.total_tokens > 0 {
            llm_response = llm_response.with_usage(usage);
        }

        Ok(llm_response)
    }

    fn name(&self) -> &str {
        &self.provider_name
    }

    fn default_model(&self) -> &str {
        &self.model_name
    }
}

struct RigConversation {
    prompt: RigMessage,
    history: Vec<RigMessage>,
    preamble: Option<String>,
}

fn build_rig_conversation(system_instruction: &str, messages: &[Message]) -> RigConversation {
    let mut system_parts = Vec::new();
    if !system_instruction.trim().is_empty() {
        system_parts.push(system_instruction.to_string());
    }

    let mut rig_messages = Vec::new();
    for message in messages {
        match message {
            Message::System { content } => {
                if !content.trim().is_empty() {
                    system_parts.push(content.clone());
                }
            }
            Message::User { content } => rig_messages.push(RigMessage::user(content.clone())),
            Message::AssistantText { content, .. } => {
                rig_messages.push(convert_assistant_message(content, &[]))
            }
            Message::AssistantToolRequest { content, calls, .. } => {
                rig_messages.push(convert_assistant_message(content, calls))
            }
            Message::ToolResult {
                call_id, content, ..
            } => rig_messages.push(RigMessage::tool_result(call_id.clone(), content.clone())),
        }
    }

    let prompt = rig_messages.pop().unwrap_or_else(|| RigMessage::user(""));

    let preamble = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };

    RigConversation {
        prompt,
        history: rig_messages,
        preamble,
    }
}

fn convert_assistant_message(text: &str, calls: &[ToolCall]) -> RigMessage {
    let mut contents = Vec::new();

    if !text.is_empty() {
        contents.push(AssistantContent::text(text.to_string()));
    }

    for call in calls {
        contents.push(AssistantContent::tool_call(
            call.id.clone(),
            call.name.clone(),
            call.arguments.clone(),
        ));
    }

    let content = if contents.is_empty() {
        OneOrMany::one(AssistantContent::text(""))
    } else {
        OneOrMany::many(contents).unwrap_or_else(|_| OneOrMany::one(AssistantContent::text("")))
    };

    RigMessage::Assistant { id: None, content }
}

fn to_rig_tool_definitions(tools: &[ToolDefinition]) -> Vec<RigToolDefinition> {
    tools
        .iter()
        .map(|tool| RigToolDefinition {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        })
        .collect()
}

fn message_from_rig_choice(choice: &OneOrMany<AssistantContent>) -> Message {
    let mut content_parts = Vec::new();
    let mut tool_calls = Vec::new();

    for item in choice.iter() {
        match item {
            AssistantContent::Text(text) => content_parts.push(text.text.clone()),
            AssistantContent::ToolCall(tool_call) => {
                tool_calls.push(convert_rig_tool_call(tool_call));
            }
            AssistantContent::Reasoning(_) => {}
            AssistantContent::Image(_) => {}
        }
    }

    let content = content_parts.join("");

    if tool_calls.is_empty() {
        Message::assistant(content)
    } else {
        Message::AssistantToolRequest {
            content,
            calls: tool_calls,
            agent: None,
        }
    }
}

fn convert_rig_tool_call(tool_call: &RigToolCall) -> ToolCall {
    ToolCall {
        id: tool_call.id.clone(),
        name: tool_call.function.name.clone(),
        arguments: tool_call.function.arguments.clone(),
    }
}

impl<M> std::fmt::Debug for RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigAgentAdapter")
            .field("provider_name", &self.provider_name)
            .field("model_name", &self.model_name)
            .finish()
    }
}
