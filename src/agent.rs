//! # Agent Module
//!
//! Wires the configured Rig backend into the handoff graph: one model
//! (wrapped with timeout and retry) serves the supervisor, the arithmetic
//! agent and the email agent.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use rig::client::{CompletionClient, ProviderClient};
use rig::providers::{ollama, openai};

use rig_handoff::agent::presets::{email_agent, math_agent};
use rig_handoff::{
    create_checkpointer, CompiledGraph, HandoffGraph, LLMProvider, ResilientProvider,
    RigAgentAdapter,
};

use crate::config::{Config, Provider};

/// Build the model backend for `config`.
pub fn build_provider(config: &Config) -> Arc<dyn LLMProvider> {
    let model = config.model_name();

    let raw: Arc<dyn LLMProvider> = match config.provider {
        Provider::Ollama => {
            // Rig 0.27 reads the server URL from OLLAMA_API_BASE_URL
            std::env::set_var("OLLAMA_API_BASE_URL", &config.ollama_host);
            let client = ollama::Client::from_env();
            let agent = client.agent(model).build();
            debug!(host = %config.ollama_host, model = %model, "Connected to Ollama");
            Arc::new(RigAgentAdapter::with_names(agent, "ollama", model))
        }
        Provider::OpenAi => {
            let client = openai::Client::from_env();
            let agent = client.agent(model).build();
            debug!(model = %model, "Connected to OpenAI");
            Arc::new(RigAgentAdapter::with_names(agent, "openai", model))
        }
    };

    let handoff = config.handoff_config();
    Arc::new(ResilientProvider::new(raw, handoff.model_timeout, handoff.retry))
}

/// Compile the two-agent assistant graph.
pub fn build_graph(config: &Config, llm: Arc<dyn LLMProvider>) -> Result<CompiledGraph> {
    let handoff = config.handoff_config();
    let checkpointer =
        create_checkpointer(handoff.checkpointer.clone()).context("Failed to open checkpoint store")?;

    let description = HandoffGraph::new("assistant")
        .model(llm)
        .agent(math_agent(config.division_by_zero)?)
        .agent(email_agent())
        .limits(handoff.limits)
        .llm_config(config.llm_config())
        .build();

    let graph = CompiledGraph::compile(description, checkpointer)?;

    info!(
        provider = config.provider.as_str(),
        model = config.model_name(),
        agents = ?graph.agent_names(),
        "Assistant graph ready"
    );

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_graph_with_memory_checkpoints() {
        let config = Config::default();
        let graph = build_graph(&config, build_provider(&config)).unwrap();

        assert_eq!(graph.agent_names(), vec!["math_agent", "email_agent"]);
        assert_eq!(graph.limits().max_tool_iterations, config.max_tool_iterations);
    }
}
