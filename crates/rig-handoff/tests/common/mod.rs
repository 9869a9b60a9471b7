//! Shared fixtures for integration tests
//!
//! `ScriptedLLM` answers from a closure over (system instruction, history), so
//! every run is deterministic. `GatedLLM` parks each call until the test
//! releases it, which lets tests observe a run while it is in flight.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Notify, Semaphore};

use rig_handoff::agent::presets::{email_agent, math_agent, MATH_AGENT};
use rig_handoff::{
    CompiledGraph, DivisionByZeroPolicy, GraphLimits, HandoffError, HandoffGraph, LLMConfig,
    LLMProvider, LLMResponse, MemoryCheckpointer, Message, SinkEvent, ToolCall, ToolDefinition,
};
use rig_handoff::workflow::DEFAULT_SUPERVISOR_INSTRUCTION;

type Script = dyn Fn(&str, &[Message]) -> Message + Send + Sync;

pub struct ScriptedLLM {
    script: Box<Script>,
    calls: AtomicUsize,
}

impl ScriptedLLM {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str, &[Message]) -> Message + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for ScriptedLLM {
    async fn complete(
        &self,
        system_instruction: &str,
        messages: &[Message],
        _tools: &[ToolDefinition],
        _config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, HandoffError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LLMResponse::new((self.script)(system_instruction, messages)))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted"
    }
}

/// Wraps a provider; every call waits for a permit from `release`.
pub struct GatedLLM {
    inner: Arc<dyn LLMProvider>,
    gate: Semaphore,
    entered: Notify,
}

impl GatedLLM {
    pub fn new(inner: Arc<dyn LLMProvider>) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
            entered: Notify::new(),
        }
    }

    /// Let `calls` more model calls through.
    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    /// Wait until a call is parked at the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl LLMProvider for GatedLLM {
    async fn complete(
        &self,
        system_instruction: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, HandoffError> {
        self.entered.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| HandoffError::llm(e.to_string()))?;
        permit.forget();
        self.inner
            .complete(system_instruction, messages, tools, config)
            .await
    }

    fn name(&self) -> &str {
        "gated"
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }
}

// =============================================================================
// Scripts
// =============================================================================

pub fn is_supervisor(system: &str) -> bool {
    system == DEFAULT_SUPERVISOR_INSTRUCTION
}

pub fn is_math(system: &str) -> bool {
    system.starts_with("You are a math expert")
}

fn call_id(prefix: &str, messages: &[Message]) -> String {
    format!("{}_{}", prefix, messages.len())
}

/// Parse "<a> plus <b>", "divide <a> by <b>" and similar into a tool call.
pub fn arithmetic_call(text: &str, messages: &[Message]) -> Option<ToolCall> {
    let lower = text.to_lowercase();
    let numbers: Vec<i64> = lower
        .split(|c: char| !c.is_ascii_digit() && c != '-')
        .filter_map(|s| s.parse().ok())
        .collect();
    if numbers.len() < 2 {
        return None;
    }
    let tool = if lower.contains("plus") || lower.contains('+') {
        "add"
    } else if lower.contains("minus") {
        "subtract"
    } else if lower.contains("times") || lower.contains("multiply") {
        "multiply"
    } else if lower.contains("divide") {
        "divide"
    } else {
        return None;
    };
    Some(ToolCall::new(
        call_id("tool", messages),
        tool,
        json!({"a": numbers[0], "b": numbers[1]}),
    ))
}

/// Supervisor: route a fresh user turn to an agent, relay the agent's answer.
pub fn supervisor_script(messages: &[Message]) -> Message {
    match messages.last() {
        Some(Message::ToolResult { content, .. }) => Message::assistant(content.clone()),
        Some(Message::User { content }) => {
            let agent = if content.to_lowercase().contains("email") {
                "email_agent"
            } else {
                MATH_AGENT
            };
            Message::tool_request(vec![ToolCall::new(
                call_id("handoff", messages),
                agent,
                json!({"context": content}),
            )])
        }
        _ => Message::assistant(""),
    }
}

/// Math agent: one tool call, then report the result.
pub fn math_script(messages: &[Message]) -> Message {
    match messages.last() {
        Some(Message::ToolResult { content, .. }) => Message::assistant(content.clone()),
        Some(Message::User { content }) => match arithmetic_call(content, messages) {
            Some(call) => Message::tool_request(vec![call]),
            None => Message::assistant("I can only do arithmetic."),
        },
        _ => Message::assistant(""),
    }
}

pub fn email_script(messages: &[Message]) -> Message {
    let topic = messages.last().map(|m| m.text().to_string()).unwrap_or_default();
    Message::assistant(format!("Subject: Hello\n\nDear reader,\n{}\n\nBest regards", topic))
}

/// Provider playing every role of the standard two-agent graph.
pub fn standard_llm() -> ScriptedLLM {
    ScriptedLLM::new(|system, messages| {
        if is_supervisor(system) {
            supervisor_script(messages)
        } else if is_math(system) {
            math_script(messages)
        } else {
            email_script(messages)
        }
    })
}

// =============================================================================
// Graphs
// =============================================================================

pub fn standard_graph(llm: Arc<dyn LLMProvider>, policy: DivisionByZeroPolicy) -> CompiledGraph {
    standard_graph_with(llm, policy, GraphLimits::default())
}

pub fn standard_graph_with(
    llm: Arc<dyn LLMProvider>,
    policy: DivisionByZeroPolicy,
    limits: GraphLimits,
) -> CompiledGraph {
    let description = HandoffGraph::new("assistant")
        .model(llm)
        .agent(math_agent(policy).expect("math agent"))
        .agent(email_agent())
        .limits(limits)
        .build();
    CompiledGraph::compile(description, Arc::new(MemoryCheckpointer::new()))
        .expect("graph compiles")
}

/// Drain sink events up to and including the terminal one.
pub async fn collect_events(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<SinkEvent>,
) -> Vec<SinkEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
    }
    events
}
