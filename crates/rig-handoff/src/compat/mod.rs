//! Rig compatibility layer
//!
//! Bridges Rig's completion models to the [`LLMProvider`](crate::llm::LLMProvider) contract.

mod rig_agent_adapter;

pub use rig_agent_adapter::RigAgentAdapter;
