//! Agent definitions
//!
//! An agent is a named, described task handler with a system instruction and
//! a single free-text input. The supervisor sees every agent as a handoff
//! tool whose only parameter is that input.

mod executor;
pub mod presets;

pub use executor::{AgentExecutor, AgentOutcome, AgentStatus};

use crate::error::HandoffError;
use crate::tools::{DynTool, ToolDefinition, ToolParameter, ToolRegistry};

/// Name of the single parameter of every handoff tool.
pub const HANDOFF_INPUT_PARAM: &str = "context";

/// How an agent produces its answer.
#[derive(Debug, Clone)]
pub enum AgentKind {
    /// A single model call; its text is the answer
    Direct,
    /// Iterative propose/execute/observe loop over the given tools
    ToolUsing { tools: ToolRegistry },
}

/// Immutable description of one agent in a graph.
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    name: String,
    description: String,
    system_instruction: String,
    input_description: String,
    kind: AgentKind,
    max_tool_iterations: Option<usize>,
}

impl AgentDefinition {
    /// Agent answering with a single model call.
    pub fn direct(
        name: impl Into<String>,
        description: impl Into<String>,
        system_instruction: impl Into<String>,
        input_description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_instruction: system_instruction.into(),
            input_description: input_description.into(),
            kind: AgentKind::Direct,
            max_tool_iterations: None,
        }
    }

    /// Agent running a tool loop over `tools`.
    ///
    /// Fails if two tools share a name.
    pub fn tool_using(
        name: impl Into<String>,
        description: impl Into<String>,
        system_instruction: impl Into<String>,
        input_description: impl Into<String>,
        tools: impl IntoIterator<Item = DynTool>,
    ) -> Result<Self, HandoffError> {
        let name = name.into();
        let tools = ToolRegistry::from_tools(tools).map_err(|e| {
            HandoffError::config(format!("agent '{}': {}", name, e))
        })?;

        Ok(Self {
            name,
            description: description.into(),
            system_instruction: system_instruction.into(),
            input_description: input_description.into(),
            kind: AgentKind::ToolUsing { tools },
            max_tool_iterations: None,
        })
    }

    /// Override the graph-wide tool iteration limit for this agent.
    pub fn with_max_tool_iterations(mut self, limit: usize) -> Self {
        self.max_tool_iterations = Some(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn input_description(&self) -> &str {
        &self.input_description
    }

    pub fn kind(&self) -> &AgentKind {
        &self.kind
    }

    pub fn max_tool_iterations(&self) -> Option<usize> {
        self.max_tool_iterations
    }

    pub fn tools(&self) -> Option<&ToolRegistry> {
        match &self.kind {
            AgentKind::Direct => None,
            AgentKind::ToolUsing { tools } => Some(tools),
        }
    }

    pub fn is_tool_using(&self) -> bool {
        matches!(self.kind, AgentKind::ToolUsing { .. })
    }

    /// The tool the supervisor calls to hand a turn to this agent.
    pub fn handoff_tool(&self) -> ToolDefinition {
        ToolDefinition::new(
            self.name.clone(),
            self.description.clone(),
            &[ToolParameter::string(
                HANDOFF_INPUT_PARAM,
                self.input_description.clone(),
            )],
        )
    }

    pub fn validate(&self) -> Result<(), HandoffError> {
        if self.name.trim().is_empty() {
            return Err(HandoffError::config("agent name must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(HandoffError::config(format!(
                "agent '{}' needs a description for routing",
                self.name
            )));
        }
        if self.input_description.trim().is_empty() {
            return Err(HandoffError::config(format!(
                "agent '{}' needs an input description",
                self.name
            )));
        }
        if let AgentKind::ToolUsing { tools } = &self.kind {
            if tools.is_empty() {
                return Err(HandoffError::config(format!(
                    "tool-using agent '{}' has no tools",
                    self.name
                )));
            }
        }
        if self.max_tool_iterations == Some(0) {
            return Err(HandoffError::config(format!(
                "agent '{}': max_tool_iterations must be at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{math_tools, DivisionByZeroPolicy};

    #[test]
    fn test_handoff_tool_schema() {
        let agent = AgentDefinition::direct(
            "email_agent",
            "Writes emails",
            "You write emails.",
            "The name of the person and the topic",
        );

        let tool = agent.handoff_tool();
        assert_eq!(tool.name, "email_agent");
        assert_eq!(tool.description, "Writes emails");
        assert_eq!(
            tool.parameters["properties"][HANDOFF_INPUT_PARAM]["description"],
            "The name of the person and the topic"
        );
    }

    #[test]
    fn test_tool_using_rejects_duplicate_tools() {
        let mut tools = math_tools(DivisionByZeroPolicy::Sentinel);
        tools.extend(math_tools(DivisionByZeroPolicy::Sentinel));

        let err = AgentDefinition::tool_using("math", "Math", "Use tools", "Question", tools)
            .unwrap_err();
        assert!(matches!(err, HandoffError::GraphConfiguration(_)));
    }

    #[test]
    fn test_validate() {
        let ok = AgentDefinition::direct("a", "desc", "sys", "input");
        assert!(ok.validate().is_ok());

        let no_name = AgentDefinition::direct(" ", "desc", "sys", "input");
        assert!(no_name.validate().is_err());

        let no_tools =
            AgentDefinition::tool_using("a", "desc", "sys", "input", Vec::new()).unwrap();
        assert!(no_tools.validate().is_err());

        let zero_limit = ok.with_max_tool_iterations(0);
        assert!(zero_limit.validate().is_err());
    }
}
