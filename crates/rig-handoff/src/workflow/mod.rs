//! Supervisor/agent handoff graph
//!
//! Topology is fixed: `__start__ -> supervisor -> (agent -> supervisor)* -> __end__`.
//! The supervisor is a model-backed routing node that sees each agent as a
//! handoff tool; calling one hands the current turn to that agent.
//!
//! - [`HandoffGraph`]: fluent builder producing a [`GraphDescription`]
//! - [`CompiledGraph`]: validated, checkpoint-bound, reusable executable graph
//! - [`StepStream`]: lazy sequence of [`Step`]s for one run

mod compiled;
mod graph;
mod stream;
mod supervisor;
pub mod visualization;

pub use compiled::CompiledGraph;
pub use graph::{AgentNodeSpec, GraphDescription, HandoffGraph};
pub use stream::{Step, StepStream};
pub use supervisor::{RouteDecision, SupervisorConfig, DEFAULT_SUPERVISOR_INSTRUCTION};

/// Entry node; its step holds the merged checkpoint + input state.
pub const START: &str = "__start__";

/// Routing node.
pub const SUPERVISOR: &str = "supervisor";

/// Terminal node; its step carries the final response.
pub const END: &str = "__end__";

/// Node ids agents may not use.
pub const RESERVED_NODES: [&str; 3] = [START, SUPERVISOR, END];
