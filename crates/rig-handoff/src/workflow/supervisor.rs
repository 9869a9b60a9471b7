//! Supervisor routing node
//!
//! Each agent is offered to the model as a handoff tool. A tool call routes
//! the turn to that agent; plain text means the run is complete.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::agent::HANDOFF_INPUT_PARAM;
use crate::error::HandoffError;
use crate::llm::{LLMConfig, LLMProvider, TokenUsage};
use crate::state::{ConversationState, Message, ToolCall};
use crate::tools::ToolDefinition;

pub const DEFAULT_SUPERVISOR_INSTRUCTION: &str = "You are a supervisor coordinating a team of \
specialist agents. Each agent is available to you as a tool. For every new user request, call \
the single most suitable agent and pass everything it needs in the `context` argument. When an \
agent has returned its answer and nothing else is needed, reply to the user with the final \
answer as plain text. Do not solve tasks yourself.";

/// Supervisor settings.
#[derive(Clone)]
pub struct SupervisorConfig {
    pub instruction: String,
    /// Falls back to the graph model when unset
    pub model: Option<Arc<dyn LLMProvider>>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            instruction: DEFAULT_SUPERVISOR_INSTRUCTION.to_string(),
            model: None,
        }
    }
}

impl SupervisorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_model(mut self, model: Arc<dyn LLMProvider>) -> Self {
        self.model = Some(model);
        self
    }
}

impl fmt::Debug for SupervisorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorConfig")
            .field("instruction", &self.instruction)
            .field("model", &self.model.as_ref().map(|m| m.name().to_string()))
            .finish()
    }
}

/// What the supervisor decided for the current turn.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    /// Hand the turn to `agent` with `input`; `call` is the recorded handoff request
    Handoff {
        agent: String,
        input: String,
        call: ToolCall,
    },
    /// The run is complete; `text` is what the supervisor said (may be empty)
    Complete { text: String },
}

/// Turn a supervisor response into a route.
///
/// Only the first tool call is honoured. An unknown agent name is fatal.
/// A missing or empty `context` argument falls back to the latest user turn.
pub fn resolve_route(
    response: Message,
    agents: &[String],
    state: &ConversationState,
) -> Result<RouteDecision, HandoffError> {
    match response {
        Message::AssistantText { content, .. } => Ok(RouteDecision::Complete { text: content }),
        Message::AssistantToolRequest { calls, .. } => {
            let mut calls = calls.into_iter();
            let call = calls
                .next()
                .ok_or_else(|| HandoffError::llm("supervisor returned an empty tool request"))?;
            let ignored = calls.count();
            if ignored > 0 {
                warn!(agent = %call.name, ignored, "Supervisor requested several handoffs, using the first");
            }

            if !agents.iter().any(|a| a == &call.name) {
                return Err(HandoffError::UnknownAgent(call.name));
            }

            let input = extract_input(&call)
                .or_else(|| state.last_user_text().map(str::to_string))
                .unwrap_or_default();

            Ok(RouteDecision::Handoff {
                agent: call.name.clone(),
                input,
                call,
            })
        }
        other => Err(HandoffError::llm(format!(
            "supervisor returned a non-assistant message: {:?}",
            other
        ))),
    }
}

fn extract_input(call: &ToolCall) -> Option<String> {
    let value = match &call.arguments {
        serde_json::Value::String(s) => Some(s.clone()),
        args => args
            .get(HANDOFF_INPUT_PARAM)
            .and_then(|v| v.as_str())
            .map(str::to_string),
    };
    value.filter(|s| !s.trim().is_empty())
}

/// Compiled supervisor node.
pub(crate) struct Supervisor {
    instruction: String,
    llm: Arc<dyn LLMProvider>,
    handoff_tools: Vec<ToolDefinition>,
    agent_names: Vec<String>,
    config: Option<LLMConfig>,
}

impl Supervisor {
    pub(crate) fn new(
        instruction: String,
        llm: Arc<dyn LLMProvider>,
        handoff_tools: Vec<ToolDefinition>,
        config: Option<LLMConfig>,
    ) -> Self {
        let agent_names = handoff_tools.iter().map(|t| t.name.clone()).collect();
        Self {
            instruction,
            llm,
            handoff_tools,
            agent_names,
            config,
        }
    }

    pub(crate) fn provider_name(&self) -> &str {
        self.llm.name()
    }

    pub(crate) async fn decide(
        &self,
        state: &ConversationState,
    ) -> Result<(RouteDecision, Option<TokenUsage>), HandoffError> {
        let view = state.supervisor_view();
        let response = self
            .llm
            .complete(
                &self.instruction,
                &view,
                &self.handoff_tools,
                self.config.as_ref(),
            )
            .await?
            .validated()?;

        let usage = response.usage;
        let decision = resolve_route(response.message, &self.agent_names, state)?;
        debug!(?decision, "Supervisor decided");
        Ok((decision, usage))
    }
}
