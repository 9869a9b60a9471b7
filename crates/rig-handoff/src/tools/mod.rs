//! Tool registry
//!
//! Tools are native functions exposed to agents under a name, a description
//! and a JSON-schema parameter list. Registration is explicit: every tool an
//! agent may call is listed when the agent is defined.

pub mod arithmetic;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{HandoffError, ToolError};

pub use arithmetic::{math_tools, ArithmeticOp, ArithmeticTool, DivisionByZeroPolicy};

/// Tool definition as presented to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Primitive parameter types a tool may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    fn schema_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// A single typed, required tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Integer, description)
    }
}

/// Render a parameter list as a JSON object schema. All parameters are required.
pub fn parameters_schema(params: &[ToolParameter]) -> Value {
    let mut properties = Map::new();
    for param in params {
        properties.insert(
            param.name.clone(),
            json!({
                "type": param.kind.schema_type(),
                "description": param.description,
            }),
        );
    }
    let required: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        params: &[ToolParameter],
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: parameters_schema(params),
        }
    }
}

/// A synchronous tool an agent may invoke.
///
/// Invocations must be quick and side-effect free from the graph's point of
/// view; the returned text becomes a tool result message.
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    fn invoke(&self, arguments: &Value) -> Result<String, ToolError>;

    fn name(&self) -> String {
        self.definition().name
    }
}

/// Shared tool handle
pub type DynTool = Arc<dyn Tool>;

type ToolFn = dyn Fn(&Value) -> Result<String, ToolError> + Send + Sync;

/// Tool backed by a closure.
pub struct FunctionTool {
    definition: ToolDefinition,
    func: Box<ToolFn>,
}

impl FunctionTool {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        params: &[ToolParameter],
        func: F,
    ) -> Self
    where
        F: Fn(&Value) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        Self {
            definition: ToolDefinition::new(name, description, params),
            func: Box::new(func),
        }
    }

    pub fn into_dyn(self) -> DynTool {
        Arc::new(self)
    }
}

impl Tool for FunctionTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn invoke(&self, arguments: &Value) -> Result<String, ToolError> {
        (self.func)(arguments)
    }

    fn name(&self) -> String {
        self.definition.name.clone()
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.definition.name)
            .finish()
    }
}

/// Read a required integer argument.
pub fn int_arg(arguments: &Value, name: &str) -> Result<i64, ToolError> {
    let value = arguments
        .get(name)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing argument '{}'", name)))?;

    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| {
            ToolError::InvalidArguments(format!("argument '{}' must be an integer", name))
        }),
        // Some models quote numbers
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            ToolError::InvalidArguments(format!("argument '{}' must be an integer", name))
        }),
        _ => Err(ToolError::InvalidArguments(format!(
            "argument '{}' must be an integer",
            name
        ))),
    }
}

/// Read a required string argument.
pub fn str_arg<'a>(arguments: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing string argument '{}'", name)))
}

/// Name-indexed tool set of one agent.
///
/// Iteration order is by name so the tool list sent to the model is stable.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, DynTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of tools, rejecting duplicate names.
    pub fn from_tools(tools: impl IntoIterator<Item = DynTool>) -> Result<Self, HandoffError> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, tool: DynTool) -> Result<(), HandoffError> {
        let name = tool.name();
        if name.trim().is_empty() {
            return Err(HandoffError::config("tool name must not be empty"));
        }
        if self.tools.contains_key(&name) {
            return Err(HandoffError::config(format!(
                "duplicate tool name '{}'",
                name
            )));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DynTool> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
