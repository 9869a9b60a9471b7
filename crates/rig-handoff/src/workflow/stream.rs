//! Step streaming
//!
//! A run is a lazy sequence of steps. Each pull executes exactly one node,
//! writes the resulting state to the checkpoint store and yields it:
//!
//! ```text
//! __start__ -> supervisor -> math_agent -> supervisor -> __end__
//! ```
//!
//! The cancellation token is checked before each step, never during one.
//! The first error ends the sequence.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::compiled::GraphInner;
use super::supervisor::RouteDecision;
use super::{END, START, SUPERVISOR};
use crate::agent::AgentStatus;
use crate::checkpoint::Checkpoint;
use crate::error::HandoffError;
use crate::llm::TokenUsage;
use crate::state::{ConversationState, Message};

/// One graph transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Node that was executed
    pub node: String,
    /// Position within the run, starting at 0
    pub index: usize,
    /// State after the node ran
    pub state: ConversationState,
    /// Model usage of this step
    pub usage: TokenUsage,
    first_new: usize,
}

impl Step {
    /// Messages appended by this step.
    pub fn new_messages(&self) -> &[Message] {
        &self.state.messages()[self.first_new..]
    }

    pub fn is_terminal(&self) -> bool {
        self.node == END
    }

    pub fn final_response(&self) -> Option<&str> {
        self.state.final_response()
    }
}

enum Phase {
    Start,
    Supervisor,
    Agent { name: String, input: String, call_id: String },
    Finish { response: Option<String> },
    Done,
}

struct Run {
    graph: Arc<GraphInner>,
    thread_id: String,
    run_id: String,
    input: String,
    cancel: CancellationToken,
    state: ConversationState,
    index: usize,
    phase: Phase,
}

impl Run {
    async fn next_step(&mut self) -> Option<Result<Step, HandoffError>> {
        if matches!(self.phase, Phase::Done) {
            return None;
        }

        if self.cancel.is_cancelled() {
            info!(thread_id = %self.thread_id, step = self.index, "Run cancelled");
            self.phase = Phase::Done;
            return Some(Err(HandoffError::Cancelled));
        }

        if self.index >= self.graph.limits.max_steps {
            warn!(thread_id = %self.thread_id, limit = self.graph.limits.max_steps, "Step limit reached");
            self.phase = Phase::Done;
            return Some(Err(HandoffError::RecursionLimit(self.graph.limits.max_steps)));
        }

        let result = self.execute().await;
        if result.is_err() {
            self.phase = Phase::Done;
        }
        Some(result)
    }

    async fn execute(&mut self) -> Result<Step, HandoffError> {
        let phase = std::mem::replace(&mut self.phase, Phase::Done);
        let mut first_new = self.state.len();
        let mut usage = TokenUsage::default();

        let node = match phase {
            Phase::Start => {
                if self.thread_id.trim().is_empty() {
                    return Err(HandoffError::config("thread id must not be empty"));
                }
                let prior = self.graph.checkpointer.get_state(&self.thread_id).await?;
                let resumed = prior.is_some();
                self.state = ConversationState::resume(prior, std::mem::take(&mut self.input));
                // Closing results for interrupted handoffs belong to the prior run
                first_new = self.state.len() - 1;
                debug!(thread_id = %self.thread_id, resumed, messages = self.state.len(), "Run started");
                self.phase = Phase::Supervisor;
                START.to_string()
            }

            Phase::Supervisor => {
                let (decision, step_usage) = self.graph.supervisor.decide(&self.state).await?;
                usage += step_usage.unwrap_or_default();

                match decision {
                    RouteDecision::Handoff { agent, input, call } => {
                        info!(thread_id = %self.thread_id, agent = %agent, "Handing off");
                        let call_id = call.id.clone();
                        self.state.push(Message::tool_request(vec![call]));
                        self.state.set_active_route(Some(agent.clone()));
                        self.phase = Phase::Agent {
                            name: agent,
                            input,
                            call_id,
                        };
                    }
                    RouteDecision::Complete { text } => {
                        let response = if text.trim().is_empty() {
                            self.state.last_assistant_answer().map(str::to_string)
                        } else {
                            self.state.push(Message::assistant(text.clone()));
                            Some(text)
                        };
                        self.phase = Phase::Finish { response };
                    }
                }
                SUPERVISOR.to_string()
            }

            Phase::Agent {
                name,
                input,
                call_id,
            } => {
                let agent = self
                    .graph
                    .agent(&name)
                    .ok_or_else(|| HandoffError::UnknownAgent(name.clone()))?;

                let outcome = agent.executor.run(&agent.definition, &input).await?;
                usage += outcome.usage;

                self.state.extend(outcome.transcript);
                self.state
                    .push(Message::tool_result(call_id, name.clone(), outcome.response.clone()));
                self.state.set_active_route(None);

                self.phase = match outcome.status {
                    AgentStatus::Finished => Phase::Supervisor,
                    AgentStatus::LoopExceeded { .. } => Phase::Finish {
                        response: Some(outcome.response),
                    },
                };
                name
            }

            Phase::Finish { response } => {
                if let Some(response) = response.filter(|r| !r.trim().is_empty()) {
                    self.state.set_final_response(response)?;
                }
                self.phase = Phase::Done;
                END.to_string()
            }

            Phase::Done => return Err(HandoffError::Internal("stream already finished".into())),
        };

        let checkpoint = Checkpoint::new(&self.thread_id, self.index, &node, self.state.clone())
            .with_metadata("run_id", &self.run_id);
        self.graph.checkpointer.put(&checkpoint).await?;

        debug!(thread_id = %self.thread_id, node = %node, step = self.index, "Step complete");

        let step = Step {
            node,
            index: self.index,
            state: self.state.clone(),
            usage,
            first_new,
        };
        self.index += 1;
        Ok(step)
    }
}

/// Lazily-advanced sequence of steps for one run.
///
/// Not restartable; start a new run on the same thread to resume from
/// its checkpoint.
pub struct StepStream {
    inner: Pin<Box<dyn Stream<Item = Result<Step, HandoffError>> + Send>>,
    run_id: String,
}

impl StepStream {
    pub(crate) fn new(
        graph: Arc<GraphInner>,
        thread_id: String,
        input: String,
        cancel: CancellationToken,
    ) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        let run = Run {
            graph,
            thread_id,
            run_id: run_id.clone(),
            input,
            cancel,
            state: ConversationState::new(),
            index: 0,
            phase: Phase::Start,
        };

        let inner = futures::stream::unfold(run, |mut run| async move {
            run.next_step().await.map(|item| (item, run))
        });

        Self {
            inner: Box::pin(inner),
            run_id,
        }
    }

    /// Identifier recorded in this run's checkpoint metadata.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl Stream for StepStream {
    type Item = Result<Step, HandoffError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for StepStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepStream")
            .field("run_id", &self.run_id)
            .finish()
    }
}
