//! Error types for the handoff graph
//!
//! `HandoffError` covers everything that can end a run; `ToolError` covers
//! failures inside a single tool invocation, which are reported back to the
//! model instead of ending the run.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building, compiling or running a handoff graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandoffError {
    /// Graph description is invalid (no supervisor, no agents, duplicates, ...)
    #[error("Graph configuration error: {0}")]
    GraphConfiguration(String),

    /// Supervisor routed to an agent that is not part of the graph
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// Agent requested a tool that is not in its tool set
    #[error("Unknown tool '{tool}' requested by agent '{agent}'")]
    UnknownTool { agent: String, tool: String },

    /// Agent tool loop did not converge
    #[error("Agent '{agent}' did not produce an answer within {limit} tool iterations")]
    ToolLoopExceeded { agent: String, limit: usize },

    /// Run exceeded the maximum number of graph steps
    #[error("Recursion limit of {0} steps exceeded")]
    RecursionLimit(usize),

    /// Model backend failure
    #[error("LLM error: {0}")]
    Llm(String),

    /// Model backend call exceeded its timeout
    #[error("LLM call timed out after {0:?}")]
    LlmTimeout(Duration),

    /// Checkpoint store failure
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// A run is already live for this thread
    #[error("A run is already in progress for thread '{0}'")]
    AlreadyRunning(String),

    /// Run was cancelled between steps
    #[error("Run cancelled")]
    Cancelled,

    #[error("Final response is already set for this run")]
    FinalResponseAlreadySet,

    #[error("Run ended without a final response")]
    EmptyResponse,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandoffError {
    /// Create a checkpoint error
    pub fn checkpoint(msg: impl Into<String>) -> Self {
        Self::Checkpoint(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::GraphConfiguration(msg.into())
    }

    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// The error kind reported to stream sinks.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GraphConfiguration(_) => ErrorKind::Configuration,
            Self::UnknownAgent(_) => ErrorKind::UnknownAgent,
            Self::UnknownTool { .. } => ErrorKind::UnknownTool,
            Self::ToolLoopExceeded { .. } => ErrorKind::ToolLoopExceeded,
            Self::RecursionLimit(_) => ErrorKind::RecursionLimit,
            Self::Llm(_) => ErrorKind::Backend,
            Self::LlmTimeout(_) => ErrorKind::Timeout,
            Self::Checkpoint(_) => ErrorKind::Checkpoint,
            Self::AlreadyRunning(_) => ErrorKind::AlreadyRunning,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::FinalResponseAlreadySet | Self::EmptyResponse | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Check if this error is recoverable.
    ///
    /// Backend failures and timeouts may succeed on retry; a non-converging
    /// tool loop ends the run with an explanation instead of a failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Llm(_) | Self::LlmTimeout(_) | Self::ToolLoopExceeded { .. }
        )
    }

    /// Whether a model-call retry may help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Llm(_) | Self::LlmTimeout(_))
    }
}

/// Closed set of error kinds surfaced through `StreamSink::on_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    UnknownAgent,
    UnknownTool,
    Backend,
    Timeout,
    ToolLoopExceeded,
    RecursionLimit,
    Checkpoint,
    AlreadyRunning,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::UnknownAgent => "unknown_agent",
            Self::UnknownTool => "unknown_tool",
            Self::Backend => "backend",
            Self::Timeout => "timeout",
            Self::ToolLoopExceeded => "tool_loop_exceeded",
            Self::RecursionLimit => "recursion_limit",
            Self::Checkpoint => "checkpoint",
            Self::AlreadyRunning => "already_running",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure inside a single tool invocation.
///
/// These never abort a run: the executor hands the message back to the
/// model as a tool result so it can correct itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Integer overflow in {0}")]
    Overflow(String),

    #[error("Tool execution failed: {0}")]
    Execution(String),
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}
