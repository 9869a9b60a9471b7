//! rig-handoff: supervisor/agent handoff graphs for Rig
//!
//! A supervisor model routes each user turn to one of several specialist
//! agents, exposed to it as tools. Agents either answer with a single model
//! call or run a tool loop. Runs are streamed step by step, checkpointed per
//! conversation thread after every step, and can be cancelled between steps.
//!
//! - [`HandoffGraph`] / [`CompiledGraph`]: build, validate and run graphs
//! - [`AgentDefinition`] / [`AgentExecutor`]: direct and tool-using agents
//! - [`Checkpointer`]: in-memory and file checkpoint stores
//! - [`SessionController`]: one live run per thread, sink callbacks, cancellation
//! - [`RigAgentAdapter`]: any Rig completion model as an [`LLMProvider`]
//!
//! ```rust,ignore
//! use rig_handoff::{
//!     CompiledGraph, HandoffGraph, MemoryCheckpointer, SessionController, ChannelSink,
//!     presets::{email_agent, math_agent}, DivisionByZeroPolicy,
//! };
//!
//! let description = HandoffGraph::new("assistant")
//!     .model(provider)
//!     .agent(math_agent(DivisionByZeroPolicy::Sentinel)?)
//!     .agent(email_agent())
//!     .build();
//! let graph = CompiledGraph::compile(description, Arc::new(MemoryCheckpointer::new()))?;
//!
//! let controller = SessionController::new(graph);
//! let (sink, mut events) = ChannelSink::new();
//! let handle = controller.start_run("chat-1", "What is 7 plus 5?", Arc::new(sink)).await?;
//! ```

pub mod agent;
pub mod checkpoint;
pub mod compat;
pub mod config;
pub mod error;
pub mod llm;
pub mod session;
pub mod state;
pub mod tools;
pub mod workflow;

pub use agent::{presets, AgentDefinition, AgentExecutor, AgentKind, AgentOutcome, AgentStatus};
pub use checkpoint::{
    create_checkpointer, Checkpoint, Checkpointer, CheckpointerConfig, FileCheckpointer,
    MemoryCheckpointer,
};
pub use compat::RigAgentAdapter;
pub use config::{GraphLimits, HandoffConfig, RetryPolicy};
pub use error::{ErrorKind, HandoffError, ToolError};
pub use llm::{LLMConfig, LLMProvider, LLMResponse, ResilientProvider, TokenUsage};
pub use session::{
    ChannelSink, ResponseTransform, RunHandle, RunMetrics, RunOutcome, RunStatus,
    SessionController, SinkEvent, StreamSink,
};
pub use state::{ConversationState, Message, ToolCall, INTERRUPTED_HANDOFF_RESULT};
pub use tools::{
    math_tools, DivisionByZeroPolicy, DynTool, FunctionTool, Tool, ToolDefinition, ToolParameter,
    ToolRegistry,
};
pub use workflow::{
    CompiledGraph, GraphDescription, HandoffGraph, RouteDecision, Step, StepStream,
    SupervisorConfig, END, START, SUPERVISOR,
};
