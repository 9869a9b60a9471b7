//! Conversation state and message types
//!
//! Messages are a closed tagged union. Every message produced inside an agent
//! carries that agent's name, so the supervisor can be shown only the
//! supervisor-level part of the conversation (user turns, its own handoff
//! requests and their results).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HandoffError;

/// A single tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Result recorded for a handoff whose run ended before the agent answered.
pub const INTERRUPTED_HANDOFF_RESULT: &str = "Cancelled before completion";

/// Conversation message.
///
/// `agent` is `None` for messages that belong to the supervisor level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    AssistantText {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
    },
    AssistantToolRequest {
        #[serde(default)]
        content: String,
        calls: Vec<ToolCall>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
    },
    ToolResult {
        call_id: String,
        tool_name: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::AssistantText {
            content: content.into(),
            agent: None,
        }
    }

    pub fn tool_request(calls: Vec<ToolCall>) -> Self {
        Self::AssistantToolRequest {
            content: String::new(),
            calls,
            agent: None,
        }
    }

    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::ToolResult {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            agent: None,
        }
    }

    /// Attribute this message to an agent. System and user messages are
    /// never attributed.
    pub fn attributed_to(self, name: &str) -> Self {
        let owner = Some(name.to_string());
        match self {
            Self::AssistantText { content, .. } => Self::AssistantText {
                content,
                agent: owner,
            },
            Self::AssistantToolRequest { content, calls, .. } => Self::AssistantToolRequest {
                content,
                calls,
                agent: owner,
            },
            Self::ToolResult {
                call_id,
                tool_name,
                content,
                ..
            } => Self::ToolResult {
                call_id,
                tool_name,
                content,
                agent: owner,
            },
            other => other,
        }
    }

    /// The agent that produced this message, if any.
    pub fn agent(&self) -> Option<&str> {
        match self {
            Self::AssistantText { agent, .. }
            | Self::AssistantToolRequest { agent, .. }
            | Self::ToolResult { agent, .. } => agent.as_deref(),
            Self::System { .. } | Self::User { .. } => None,
        }
    }

    pub fn is_supervisor_level(&self) -> bool {
        self.agent().is_none()
    }

    /// Text content of the message (empty for pure tool requests).
    pub fn text(&self) -> &str {
        match self {
            Self::System { content }
            | Self::User { content }
            | Self::AssistantText { content, .. }
            | Self::AssistantToolRequest { content, .. }
            | Self::ToolResult { content, .. } => content,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::AssistantToolRequest { calls, .. } => calls,
            _ => &[],
        }
    }

    /// Whether the message is something the model produced or observed
    /// during a run (assistant text, tool request, tool result).
    pub fn is_progress(&self) -> bool {
        matches!(
            self,
            Self::AssistantText { .. } | Self::AssistantToolRequest { .. } | Self::ToolResult { .. }
        )
    }
}

/// Running conversation state of a thread.
///
/// Messages are append-only; the final response can be set once per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<Message>,
    #[serde(default)]
    final_response: Option<String>,
    #[serde(default)]
    active_route: Option<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run: prior thread messages (if any) followed by the new
    /// user input. Per-run slots start empty.
    ///
    /// Handoffs left unanswered by a cancelled or failed run are closed with
    /// [`INTERRUPTED_HANDOFF_RESULT`] first, so every supervisor-level tool
    /// request is followed by its result.
    pub fn resume(prior: Option<ConversationState>, input: impl Into<String>) -> Self {
        let mut state = Self {
            messages: prior.map(|p| p.messages).unwrap_or_default(),
            final_response: None,
            active_route: None,
        };
        state.close_unanswered_handoffs();
        state.push(Message::user(input));
        state
    }

    /// Supervisor-level tool calls that have no matching result.
    pub fn unanswered_handoffs(&self) -> Vec<&ToolCall> {
        let answered: HashSet<&str> = self
            .messages
            .iter()
            .filter_map(|m| match m {
                Message::ToolResult {
                    call_id,
                    agent: None,
                    ..
                } => Some(call_id.as_str()),
                _ => None,
            })
            .collect();

        self.messages
            .iter()
            .filter(|m| m.is_supervisor_level())
            .flat_map(Message::tool_calls)
            .filter(|call| !answered.contains(call.id.as_str()))
            .collect()
    }

    fn close_unanswered_handoffs(&mut self) {
        let closing: Vec<Message> = self
            .unanswered_handoffs()
            .into_iter()
            .map(|call| {
                Message::tool_result(call.id.clone(), call.name.clone(), INTERRUPTED_HANDOFF_RESULT)
            })
            .collect();
        self.messages.extend(closing);
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn final_response(&self) -> Option<&str> {
        self.final_response.as_deref()
    }

    /// Set the final response. Fails if it was already set during this run.
    pub fn set_final_response(&mut self, response: impl Into<String>) -> Result<(), HandoffError> {
        if self.final_response.is_some() {
            return Err(HandoffError::FinalResponseAlreadySet);
        }
        self.final_response = Some(response.into());
        Ok(())
    }

    pub fn active_route(&self) -> Option<&str> {
        self.active_route.as_deref()
    }

    pub fn set_active_route(&mut self, route: Option<String>) {
        self.active_route = route;
    }

    /// Messages visible to the supervisor.
    pub fn supervisor_view(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.is_supervisor_level() && !matches!(m, Message::System { .. }))
            .cloned()
            .collect()
    }

    pub fn last_user_text(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::User { content } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Latest non-empty assistant answer at supervisor level, including the
    /// content of handoff results (an agent's answer relayed to the supervisor).
    pub fn last_assistant_answer(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::AssistantText {
                content,
                agent: None,
            }
            | Message::ToolResult {
                content,
                agent: None,
                ..
            } if !content.trim().is_empty() => Some(content.as_str()),
            Message::User { .. } => Some(""),
            _ => None,
        })
        .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resume_keeps_prior_messages_as_prefix() {
        let mut prior = ConversationState::resume(None, "first");
        prior.push(Message::assistant("answer"));
        prior.set_final_response("answer").unwrap();

        let resumed = ConversationState::resume(Some(prior.clone()), "second");

        assert_eq!(&resumed.messages()[..2], prior.messages());
        assert_eq!(resumed.messages()[2], Message::user("second"));
        assert!(resumed.final_response().is_none());
    }

    #[test]
    fn test_resume_closes_unanswered_handoff() {
        let mut prior = ConversationState::resume(None, "What is 7 plus 5?");
        prior.push(Message::tool_request(vec![ToolCall::new(
            "h1",
            "math_agent",
            json!({"context": "7 + 5"}),
        )]));
        // Agent-level request left open by a failed tool loop stays as is
        prior.push(
            Message::tool_request(vec![ToolCall::new("c1", "sqrt", json!({"a": 16}))])
                .attributed_to("math_agent"),
        );
        assert_eq!(prior.unanswered_handoffs().len(), 1);

        let resumed = ConversationState::resume(Some(prior.clone()), "What is 2 plus 2?");

        assert_eq!(&resumed.messages()[..prior.len()], prior.messages());
        assert_eq!(
            resumed.messages()[prior.len()],
            Message::tool_result("h1", "math_agent", INTERRUPTED_HANDOFF_RESULT)
        );
        assert_eq!(
            resumed.messages().last(),
            Some(&Message::user("What is 2 plus 2?"))
        );
        assert!(resumed.unanswered_handoffs().is_empty());
    }

    #[test]
    fn test_resume_after_answered_handoff_adds_only_user_turn() {
        let mut prior = ConversationState::resume(None, "What is 7 plus 5?");
        prior.push(Message::tool_request(vec![ToolCall::new(
            "h1",
            "math_agent",
            json!({}),
        )]));
        prior.push(Message::tool_result("h1", "math_agent", "12"));

        let resumed = ConversationState::resume(Some(prior.clone()), "next");
        assert_eq!(resumed.len(), prior.len() + 1);
    }

    #[test]
    fn test_final_response_set_once() {
        let mut state = ConversationState::new();
        state.set_final_response("12").unwrap();
        assert_eq!(
            state.set_final_response("13"),
            Err(HandoffError::FinalResponseAlreadySet)
        );
        assert_eq!(state.final_response(), Some("12"));
    }

    #[test]
    fn test_supervisor_view_hides_agent_messages() {
        let mut state = ConversationState::resume(None, "What is 7 plus 5?");
        state.push(Message::tool_request(vec![ToolCall::new(
            "h1",
            "math_agent",
            json!({"context": "7 + 5"}),
        )]));
        state.push(
            Message::tool_request(vec![ToolCall::new("c1", "add", json!({"a": 7, "b": 5}))])
                .attributed_to("math_agent"),
        );
        state.push(Message::tool_result("c1", "add", "12").attributed_to("math_agent"));
        state.push(Message::assistant("12").attributed_to("math_agent"));
        state.push(Message::tool_result("h1", "math_agent", "12"));

        let view = state.supervisor_view();
        assert_eq!(view.len(), 3);
        assert!(view.iter().all(Message::is_supervisor_level));
        assert_eq!(state.last_assistant_answer(), Some("12"));
    }

    #[test]
    fn test_last_assistant_answer_stops_at_user_turn() {
        let mut state = ConversationState::resume(None, "hi");
        state.push(Message::assistant("hello"));
        state.push(Message::user("again"));
        assert_eq!(state.last_assistant_answer(), None);
    }

    #[test]
    fn test_message_serde_tagging() {
        let msg = Message::tool_result("c1", "add", "12").attributed_to("math_agent");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "tool_result");
        assert_eq!(value["agent"], "math_agent");

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
    }
}
