//! Compiled handoff graph
//!
//! Compilation validates a [`GraphDescription`], resolves every node's model
//! and binds the checkpoint store. The result is cheap to clone and can run
//! any number of threads concurrently.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::graph::GraphDescription;
use super::stream::StepStream;
use super::supervisor::{Supervisor, SupervisorConfig};
use super::visualization::{render_edge, render_node, NodeRole};
use super::{END, RESERVED_NODES, START, SUPERVISOR};
use crate::agent::{AgentDefinition, AgentExecutor};
use crate::checkpoint::Checkpointer;
use crate::config::GraphLimits;
use crate::error::HandoffError;
use crate::state::ConversationState;

pub(crate) struct AgentNode {
    pub(crate) definition: AgentDefinition,
    pub(crate) executor: AgentExecutor,
}

pub(crate) struct GraphInner {
    pub(crate) name: String,
    pub(crate) supervisor: Supervisor,
    pub(crate) agents: Vec<AgentNode>,
    pub(crate) checkpointer: Arc<dyn Checkpointer>,
    pub(crate) limits: GraphLimits,
}

impl GraphInner {
    pub(crate) fn agent(&self, name: &str) -> Option<&AgentNode> {
        self.agents.iter().find(|a| a.definition.name() == name)
    }
}

/// Executable handoff graph bound to a checkpoint store.
#[derive(Clone)]
pub struct CompiledGraph {
    inner: Arc<GraphInner>,
}

impl CompiledGraph {
    /// Validate `description` and bind it to `checkpointer`.
    ///
    /// Fails with `GraphConfiguration` if there is no supervisor (no
    /// supervisor model and no graph model), no agents, duplicate or
    /// reserved agent names, or an agent without a model.
    pub fn compile(
        description: GraphDescription,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Result<Self, HandoffError> {
        let GraphDescription {
            name,
            model,
            supervisor,
            agents,
            limits,
            llm_config,
        } = description;

        limits.validate()?;

        let supervisor_config = supervisor.unwrap_or_else(SupervisorConfig::default);
        let supervisor_model = supervisor_config
            .model
            .clone()
            .or_else(|| model.clone())
            .ok_or_else(|| HandoffError::config("graph has no supervisor: no supervisor or graph model set"))?;

        if supervisor_config.instruction.trim().is_empty() {
            return Err(HandoffError::config("supervisor instruction must not be empty"));
        }

        if agents.is_empty() {
            return Err(HandoffError::config("graph has no agents"));
        }

        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(agents.len());
        for spec in agents {
            let definition = spec.definition;
            definition.validate()?;

            let agent_name = definition.name().to_string();
            if RESERVED_NODES.contains(&agent_name.as_str()) {
                return Err(HandoffError::config(format!(
                    "agent name '{}' is reserved",
                    agent_name
                )));
            }
            if !seen.insert(agent_name.clone()) {
                return Err(HandoffError::config(format!(
                    "duplicate agent name '{}'",
                    agent_name
                )));
            }

            let agent_model = spec.model.or_else(|| model.clone()).ok_or_else(|| {
                HandoffError::config(format!("agent '{}' has no model", agent_name))
            })?;

            let mut executor =
                AgentExecutor::new(agent_model).with_max_iterations(limits.max_tool_iterations);
            if let Some(cfg) = &llm_config {
                executor = executor.with_config(cfg.clone());
            }

            nodes.push(AgentNode {
                definition,
                executor,
            });
        }

        let handoff_tools = nodes.iter().map(|n| n.definition.handoff_tool()).collect();
        let supervisor = Supervisor::new(
            supervisor_config.instruction,
            supervisor_model,
            handoff_tools,
            llm_config,
        );

        info!(
            graph = %name,
            agents = nodes.len(),
            supervisor_provider = supervisor.provider_name(),
            max_steps = limits.max_steps,
            "Compiled handoff graph"
        );

        Ok(Self {
            inner: Arc::new(GraphInner {
                name,
                supervisor,
                agents: nodes,
                checkpointer,
                limits,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Agent names in registration order.
    pub fn agent_names(&self) -> Vec<&str> {
        self.inner
            .agents
            .iter()
            .map(|a| a.definition.name())
            .collect()
    }

    pub fn limits(&self) -> GraphLimits {
        self.inner.limits
    }

    pub fn checkpointer(&self) -> Arc<dyn Checkpointer> {
        self.inner.checkpointer.clone()
    }

    /// Start a run for `thread_id`. Nothing happens until the stream is polled.
    ///
    /// `cancel` is checked before every step.
    pub fn stream(
        &self,
        thread_id: impl Into<String>,
        input: impl Into<String>,
        cancel: CancellationToken,
    ) -> StepStream {
        StepStream::new(self.inner.clone(), thread_id.into(), input.into(), cancel)
    }

    /// Run to completion and return the final state.
    pub async fn invoke(
        &self,
        thread_id: impl Into<String>,
        input: impl Into<String>,
    ) -> Result<ConversationState, HandoffError> {
        let mut stream = self.stream(thread_id, input, CancellationToken::new());
        let mut last = None;
        while let Some(step) = stream.next().await {
            last = Some(step?);
        }
        last.map(|step| step.state)
            .ok_or_else(|| HandoffError::Internal("run produced no steps".into()))
    }

    /// Latest checkpointed state of a thread.
    pub async fn get_state(&self, thread_id: &str) -> Result<Option<ConversationState>, HandoffError> {
        self.inner.checkpointer.get_state(thread_id).await
    }

    /// Render the graph topology as a Mermaid flowchart.
    pub fn to_mermaid(&self) -> String {
        let mut lines = vec!["graph TD".to_string()];
        lines.push(render_node(START, NodeRole::Terminal));
        lines.push(render_node(SUPERVISOR, NodeRole::Supervisor));
        for agent in &self.inner.agents {
            let role = if agent.definition.is_tool_using() {
                NodeRole::ToolAgent
            } else {
                NodeRole::DirectAgent
            };
            lines.push(render_node(agent.definition.name(), role));
        }
        lines.push(render_node(END, NodeRole::Terminal));

        lines.push(render_edge(START, SUPERVISOR, None));
        for agent in &self.inner.agents {
            let name = agent.definition.name();
            lines.push(render_edge(SUPERVISOR, name, Some("handoff")));
            lines.push(render_edge(name, SUPERVISOR, None));
        }
        lines.push(render_edge(SUPERVISOR, END, Some("complete")));

        lines.join("\n")
    }
}

impl fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("name", &self.inner.name)
            .field("agents", &self.agent_names())
            .field("limits", &self.inner.limits)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::presets::{email_agent, math_agent};
    use crate::checkpoint::MemoryCheckpointer;
    use crate::llm::{LLMConfig, LLMProvider, LLMResponse};
    use crate::state::Message;
    use crate::tools::{DivisionByZeroPolicy, ToolDefinition};
    use crate::workflow::HandoffGraph;
    use async_trait::async_trait;

    struct SilentLLM;

    #[async_trait]
    impl LLMProvider for SilentLLM {
        async fn complete(
            &self,
            _system: &str,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _config: Option<&LLMConfig>,
        ) -> Result<LLMResponse, HandoffError> {
            Ok(LLMResponse::new(Message::assistant("")))
        }

        fn name(&self) -> &str {
            "silent"
        }

        fn default_model(&self) -> &str {
            "silent"
        }
    }

    fn memory() -> Arc<dyn Checkpointer> {
        Arc::new(MemoryCheckpointer::new())
    }

    fn llm() -> Arc<dyn LLMProvider> {
        Arc::new(SilentLLM)
    }

    #[test]
    fn test_compile_valid_graph() {
        let description = HandoffGraph::new("assistant")
            .model(llm())
            .agent(math_agent(DivisionByZeroPolicy::Sentinel).unwrap())
            .agent(email_agent())
            .build();

        let graph = CompiledGraph::compile(description, memory()).unwrap();
        assert_eq!(graph.name(), "assistant");
        assert_eq!(graph.agent_names(), vec!["math_agent", "email_agent"]);
    }

    #[test]
    fn test_compile_is_repeatable() {
        let description = HandoffGraph::new("assistant")
            .model(llm())
            .agent(email_agent())
            .build();

        let a = CompiledGraph::compile(description.clone(), memory()).unwrap();
        let b = CompiledGraph::compile(description, memory()).unwrap();
        assert_eq!(a.to_mermaid(), b.to_mermaid());
        assert_eq!(a.agent_names(), b.agent_names());
    }

    #[test]
    fn test_compile_without_supervisor_fails() {
        let description = HandoffGraph::new("g").agent(email_agent()).build();
        let err = CompiledGraph::compile(description, memory()).unwrap_err();
        assert!(matches!(err, HandoffError::GraphConfiguration(msg) if msg.contains("no supervisor")));
    }

    #[test]
    fn test_compile_without_agents_fails() {
        let description = HandoffGraph::new("g").model(llm()).build();
        let err = CompiledGraph::compile(description, memory()).unwrap_err();
        assert!(matches!(err, HandoffError::GraphConfiguration(msg) if msg.contains("no agents")));
    }

    #[test]
    fn test_compile_duplicate_agents_fails() {
        let description = HandoffGraph::new("g")
            .model(llm())
            .agent(email_agent())
            .agent(email_agent())
            .build();
        let err = CompiledGraph::compile(description, memory()).unwrap_err();
        assert!(matches!(err, HandoffError::GraphConfiguration(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_compile_reserved_name_fails() {
        let reserved = AgentDefinition::direct(SUPERVISOR, "desc", "sys", "input");
        let description = HandoffGraph::new("g").model(llm()).agent(reserved).build();
        assert!(CompiledGraph::compile(description, memory()).is_err());
    }

    #[test]
    fn test_supervisor_model_without_agent_model_fails() {
        let description = HandoffGraph::new("g")
            .supervisor(SupervisorConfig::new().with_model(llm()))
            .agent(email_agent())
            .build();
        let err = CompiledGraph::compile(description, memory()).unwrap_err();
        assert!(matches!(err, HandoffError::GraphConfiguration(msg) if msg.contains("has no model")));

        let description = HandoffGraph::new("g")
            .supervisor(SupervisorConfig::new().with_model(llm()))
            .agent_with_model(email_agent(), llm())
            .build();
        assert!(CompiledGraph::compile(description, memory()).is_ok());
    }

    #[test]
    fn test_to_mermaid() {
        let description = HandoffGraph::new("assistant")
            .model(llm())
            .agent(math_agent(DivisionByZeroPolicy::Sentinel).unwrap())
            .agent(email_agent())
            .build();
        let graph = CompiledGraph::compile(description, memory()).unwrap();

        let diagram = graph.to_mermaid();
        assert!(diagram.starts_with("graph TD"));
        assert!(diagram.contains("    math_agent[[math_agent]]"));
        assert!(diagram.contains("    email_agent[email_agent]"));
        assert!(diagram.contains("    supervisor -. \"handoff\" .-> email_agent"));
        assert!(diagram.contains("    supervisor -. \"complete\" .-> __end__"));
    }

    static_assertions::assert_impl_all!(CompiledGraph: Send, Sync, Clone);
}
