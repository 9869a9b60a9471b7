//! Model backend abstraction
//!
//! - `LLMProvider`: the contract every backend implements
//! - `LLMConfig` / `TokenUsage`: per-call settings and usage accounting
//! - `ResilientProvider`: timeout and retry around any provider

mod config;
mod provider;
mod resilient;

pub use config::{LLMConfig, TokenUsage};
pub use provider::{LLMProvider, LLMResponse};
pub use resilient::ResilientProvider;
