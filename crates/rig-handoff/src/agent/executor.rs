//! Agent Executor
//!
//! Runs one agent for one routed input:
//! 1. Send the system instruction and the agent's history to the model
//! 2. Execute any requested tools and append their results
//! 3. Repeat until the model answers in plain text or the iteration
//!    limit is reached
//!
//! A tool that is not in the agent's tool set is fatal (`UnknownTool`).
//! A tool that fails is reported back to the model as an `Error: ...`
//! tool result.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{AgentDefinition, AgentKind};
use crate::config::DEFAULT_MAX_TOOL_ITERATIONS;
use crate::error::HandoffError;
use crate::llm::{LLMConfig, LLMProvider, LLMResponse, TokenUsage};
use crate::state::{Message, ToolCall};
use crate::tools::{ToolDefinition, ToolRegistry};

/// How an agent invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStatus {
    Finished,
    /// The tool loop hit its bound; the response explains this
    LoopExceeded { limit: usize },
}

/// Result of running an agent.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// Messages the agent produced, attributed to it
    pub transcript: Vec<Message>,
    /// Terminal answer text
    pub response: String,
    pub status: AgentStatus,
    pub usage: TokenUsage,
}

#[derive(Clone)]
pub struct AgentExecutor {
    llm: Arc<dyn LLMProvider>,
    max_iterations: usize,
    config: Option<LLMConfig>,
}

impl AgentExecutor {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self {
            llm,
            max_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            config: None,
        }
    }

    /// Set the maximum number of model calls for the tool loop
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set LLM configuration for all calls
    pub fn with_config(mut self, config: LLMConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.llm.name()
    }

    /// Run `agent` on `input` and return its terminal answer.
    pub async fn run(
        &self,
        agent: &AgentDefinition,
        input: &str,
    ) -> Result<AgentOutcome, HandoffError> {
        info!(agent = agent.name(), provider = self.llm.name(), "Running agent");

        match agent.kind() {
            AgentKind::Direct => self.run_direct(agent, input).await,
            AgentKind::ToolUsing { tools } => self.run_tool_loop(agent, tools, input).await,
        }
    }

    async fn run_direct(
        &self,
        agent: &AgentDefinition,
        input: &str,
    ) -> Result<AgentOutcome, HandoffError> {
        let history = vec![Message::user(input)];
        let response = self.call(agent, &history, &[]).await?;
        let usage = response.usage.unwrap_or_default();

        match response.message {
            Message::AssistantText { content, .. } => Ok(AgentOutcome {
                transcript: vec![Message::assistant(content.clone()).attributed_to(agent.name())],
                response: content,
                status: AgentStatus::Finished,
                usage,
            }),
            other => Err(unknown_tool(agent, other.tool_calls())),
        }
    }

    async fn run_tool_loop(
        &self,
        agent: &AgentDefinition,
        tools: &ToolRegistry,
        input: &str,
    ) -> Result<AgentOutcome, HandoffError> {
        let limit = agent.max_tool_iterations().unwrap_or(self.max_iterations);
        let definitions = tools.definitions();
        let mut history = vec![Message::user(input)];
        let mut transcript = Vec::new();
        let mut usage = TokenUsage::default();

        for iteration in 0..limit {
            debug!(agent = agent.name(), iteration, "Agent iteration");

            let response = self.call(agent, &history, &definitions).await?;
            if let Some(u) = response.usage {
                usage += u;
            }

            let message = response.message.attributed_to(agent.name());
            let calls = message.tool_calls().to_vec();
            history.push(message.clone());
            transcript.push(message);

            if calls.is_empty() {
                debug!(agent = agent.name(), "No tool calls, finishing");
                let text = history
                    .last()
                    .map(|m| m.text().to_string())
                    .unwrap_or_default();
                return Ok(AgentOutcome {
                    transcript,
                    response: text,
                    status: AgentStatus::Finished,
                    usage,
                });
            }

            for call in &calls {
                let result = execute_tool_call(agent, tools, call)?;
                let tool_message = Message::tool_result(&call.id, &call.name, result)
                    .attributed_to(agent.name());
                history.push(tool_message.clone());
                transcript.push(tool_message);
            }
        }

        let err = HandoffError::ToolLoopExceeded {
            agent: agent.name().to_string(),
            limit,
        };
        warn!(agent = agent.name(), limit, "Tool loop did not converge");

        let explanation = format!(
            "I could not finish this request: {}. The last tool results are above.",
            err
        );
        transcript.push(Message::assistant(explanation.clone()).attributed_to(agent.name()));

        Ok(AgentOutcome {
            transcript,
            response: explanation,
            status: AgentStatus::LoopExceeded { limit },
            usage,
        })
    }

    async fn call(
        &self,
        agent: &AgentDefinition,
        history: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse, HandoffError> {
        self.llm
            .complete(
                agent.system_instruction(),
                history,
                tools,
                self.config.as_ref(),
            )
            .await?
            .validated()
    }
}

fn execute_tool_call(
    agent: &AgentDefinition,
    tools: &ToolRegistry,
    call: &ToolCall,
) -> Result<String, HandoffError> {
    let tool = tools.get(&call.name).ok_or_else(|| HandoffError::UnknownTool {
        agent: agent.name().to_string(),
        tool: call.name.clone(),
    })?;

    match tool.invoke(&call.arguments) {
        Ok(result) => {
            debug!(agent = agent.name(), tool = %call.name, result = %result, "Tool executed");
            Ok(result)
        }
        Err(e) => {
            debug!(agent = agent.name(), tool = %call.name, error = %e, "Tool failed");
            Ok(format!("Error: {}", e))
        }
    }
}

fn unknown_tool(agent: &AgentDefinition, calls: &[ToolCall]) -> HandoffError {
    HandoffError::UnknownTool {
        agent: agent.name().to_string(),
        tool: calls
            .first()
            .map(|c| c.name.clone())
            .unwrap_or_default(),
    }
}

impl std::fmt::Debug for AgentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentExecutor")
            .field("provider", &self.llm.name())
            .field("max_iterations", &self.max_iterations)
            .field("config", &self.config)
            .finish()
    }
}
