//! Streaming sink contract
//!
//! A sink receives zero or more `on_partial` calls followed by exactly one of
//! `on_final`, `on_cancelled` or `on_error`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ErrorKind;
use crate::llm::TokenUsage;
use crate::state::Message;

/// Metrics of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Graph steps executed, including start and end
    pub steps: usize,
    /// Supervisor handoffs to agents
    pub handoffs: usize,
    /// Tool invocations made by agents
    pub tool_calls: usize,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub usage: TokenUsage,
}

impl RunMetrics {
    pub(crate) fn record(&mut self, message: &Message) {
        match message {
            Message::ToolResult { agent: Some(_), .. } => self.tool_calls += 1,
            Message::ToolResult { agent: None, .. } => self.handoffs += 1,
            _ => {}
        }
    }
}

/// Receiver of run progress. Callbacks run on the run's worker task, in
/// step order, and must not block.
pub trait StreamSink: Send + Sync {
    fn on_partial(&self, text: &str);

    fn on_final(&self, response: &str, metrics: &RunMetrics);

    fn on_cancelled(&self);

    fn on_error(&self, kind: ErrorKind, detail: &str);
}

/// Human-readable progress line for a message, newline-terminated.
///
/// ```
/// use rig_handoff::session::progress_line;
/// use rig_handoff::state::Message;
///
/// let line = progress_line(&Message::tool_result("c1", "add", "12"));
/// assert_eq!(line.as_deref(), Some("...Tool Result for add: 12\n"));
/// ```
pub fn progress_line(message: &Message) -> Option<String> {
    match message {
        Message::AssistantToolRequest { calls, .. } => {
            let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
            Some(format!("...Calling tool: {}\n", names.join(", ")))
        }
        Message::ToolResult {
            tool_name, content, ..
        } => Some(format!("...Tool Result for {}: {}\n", tool_name, content)),
        Message::AssistantText { content, .. } if !content.trim().is_empty() => {
            Some(format!("...{}\n", content))
        }
        _ => None,
    }
}

/// Sink callback as a value.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Partial(String),
    Final { response: String, metrics: RunMetrics },
    Cancelled,
    Error { kind: ErrorKind, detail: String },
}

impl SinkEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Partial(_))
    }
}

/// Sink forwarding every callback over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SinkEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(event);
    }
}

impl StreamSink for ChannelSink {
    fn on_partial(&self, text: &str) {
        self.send(SinkEvent::Partial(text.to_string()));
    }

    fn on_final(&self, response: &str, metrics: &RunMetrics) {
        self.send(SinkEvent::Final {
            response: response.to_string(),
            metrics: metrics.clone(),
        });
    }

    fn on_cancelled(&self) {
        self.send(SinkEvent::Cancelled);
    }

    fn on_error(&self, kind: ErrorKind, detail: &str) {
        self.send(SinkEvent::Error {
            kind,
            detail: detail.to_string(),
        });
    }
}
