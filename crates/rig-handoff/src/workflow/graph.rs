//! HandoffGraph builder DSL.
//!
//! Collects the supervisor, the agents and the run limits into a
//! [`GraphDescription`]. Nothing is validated here; `CompiledGraph::compile`
//! rejects invalid descriptions.

use std::fmt;
use std::sync::Arc;

use super::supervisor::SupervisorConfig;
use crate::agent::AgentDefinition;
use crate::config::GraphLimits;
use crate::llm::{LLMConfig, LLMProvider};

/// An agent plus the model it runs on (falls back to the graph model).
#[derive(Clone)]
pub struct AgentNodeSpec {
    pub definition: AgentDefinition,
    pub model: Option<Arc<dyn LLMProvider>>,
}

impl fmt::Debug for AgentNodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentNodeSpec")
            .field("definition", &self.definition)
            .field("model", &self.model.as_ref().map(|m| m.name().to_string()))
            .finish()
    }
}

/// Uncompiled graph description.
#[derive(Clone)]
pub struct GraphDescription {
    pub name: String,
    /// Default model for the supervisor and agents without their own
    pub model: Option<Arc<dyn LLMProvider>>,
    pub supervisor: Option<SupervisorConfig>,
    pub agents: Vec<AgentNodeSpec>,
    pub limits: GraphLimits,
    /// Generation settings applied to every model call
    pub llm_config: Option<LLMConfig>,
}

impl fmt::Debug for GraphDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphDescription")
            .field("name", &self.name)
            .field("model", &self.model.as_ref().map(|m| m.name().to_string()))
            .field("supervisor", &self.supervisor)
            .field("agents", &self.agents)
            .field("limits", &self.limits)
            .field("llm_config", &self.llm_config)
            .finish()
    }
}

/// Builder for handoff graphs with fluent API.
///
/// ```rust,ignore
/// let description = HandoffGraph::new("assistant")
///     .model(llm)
///     .agent(math_agent(DivisionByZeroPolicy::Sentinel)?)
///     .agent(email_agent())
///     .build();
/// let graph = CompiledGraph::compile(description, Arc::new(MemoryCheckpointer::new()))?;
/// ```
#[derive(Debug, Clone)]
pub struct HandoffGraph {
    description: GraphDescription,
}

impl HandoffGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            description: GraphDescription {
                name: name.into(),
                model: None,
                supervisor: None,
                agents: Vec::new(),
                limits: GraphLimits::default(),
                llm_config: None,
            },
        }
    }

    /// Default model for every node.
    pub fn model(mut self, model: Arc<dyn LLMProvider>) -> Self {
        self.description.model = Some(model);
        self
    }

    /// Configure the supervisor node.
    pub fn supervisor(mut self, config: SupervisorConfig) -> Self {
        self.description.supervisor = Some(config);
        self
    }

    /// Add an agent running on the default model.
    pub fn agent(mut self, definition: AgentDefinition) -> Self {
        self.description.agents.push(AgentNodeSpec {
            definition,
            model: None,
        });
        self
    }

    /// Add an agent with its own model.
    pub fn agent_with_model(
        mut self,
        definition: AgentDefinition,
        model: Arc<dyn LLMProvider>,
    ) -> Self {
        self.description.agents.push(AgentNodeSpec {
            definition,
            model: Some(model),
        });
        self
    }

    pub fn limits(mut self, limits: GraphLimits) -> Self {
        self.description.limits = limits;
        self
    }

    pub fn llm_config(mut self, config: LLMConfig) -> Self {
        self.description.llm_config = Some(config);
        self
    }

    pub fn build(self) -> GraphDescription {
        self.description
    }
}
