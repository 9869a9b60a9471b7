//! Session controller
//!
//! Owns at most one live run per thread. Each run executes on its own tokio
//! task, forwards progress to a [`StreamSink`] in step order and ends with
//! exactly one terminal callback.
//!
//! ```text
//! Idle --start_run--> Running --> { Completed | Failed | Cancelled } --> Idle
//! ```

mod sink;

pub use sink::{progress_line, ChannelSink, RunMetrics, SinkEvent, StreamSink};

use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{ErrorKind, HandoffError};
use crate::workflow::CompiledGraph;

/// Liveness of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed {
        response: String,
        metrics: RunMetrics,
    },
    Failed {
        kind: ErrorKind,
        detail: String,
    },
    Cancelled,
}

impl RunOutcome {
    fn failed(err: &HandoffError) -> Self {
        Self::Failed {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }

    fn task_failed(err: tokio::task::JoinError) -> Self {
        Self::Failed {
            kind: ErrorKind::Internal,
            detail: format!("run task failed: {}", err),
        }
    }
}

/// Rewrites a completed run's response before it reaches the sink.
pub type ResponseTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Debug)]
struct LiveRun {
    run_id: String,
    token: CancellationToken,
}

type RunRegistry = DashMap<String, LiveRun>;

/// Removes the registry entry of a run when its task ends, even on panic.
struct RegistryGuard {
    runs: Arc<RunRegistry>,
    thread_id: String,
    run_id: String,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        self.runs
            .remove_if(&self.thread_id, |_, live| live.run_id == self.run_id);
    }
}

/// Handle to a live run.
#[derive(Debug)]
pub struct RunHandle {
    thread_id: String,
    run_id: String,
    token: CancellationToken,
    join: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Request cooperative cancellation; takes effect before the next step.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to end.
    pub async fn wait(self) -> RunOutcome {
        self.join.await.unwrap_or_else(RunOutcome::task_failed)
    }
}

/// Runs conversations on a compiled graph, one live run per thread.
#[derive(Clone)]
pub struct SessionController {
    graph: Arc<RwLock<CompiledGraph>>,
    runs: Arc<RunRegistry>,
    transform: Option<ResponseTransform>,
}

impl SessionController {
    pub fn new(graph: CompiledGraph) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
            runs: Arc::new(DashMap::new()),
            transform: None,
        }
    }

    /// Apply `transform` to every final response before `on_final`.
    /// Checkpointed state keeps the untransformed text.
    pub fn with_response_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Replace the compiled graph. Runs already in flight keep the graph
    /// they started with.
    pub async fn reconfigure(&self, graph: CompiledGraph) {
        info!(graph = graph.name(), "Reconfiguring session controller");
        *self.graph.write().await = graph;
    }

    pub async fn graph(&self) -> CompiledGraph {
        self.graph.read().await.clone()
    }

    /// Start a run on `thread_id`.
    ///
    /// Fails immediately with `AlreadyRunning` if the thread has a live run;
    /// the live run is not affected.
    pub async fn start_run(
        &self,
        thread_id: impl Into<String>,
        input: impl Into<String>,
        sink: Arc<dyn StreamSink>,
    ) -> Result<RunHandle, HandoffError> {
        let thread_id = thread_id.into();
        if thread_id.trim().is_empty() {
            return Err(HandoffError::config("thread id must not be empty"));
        }

        let graph = self.graph().await;
        let run_id = uuid::Uuid::new_v4().to_string();
        let token = CancellationToken::new();

        match self.runs.entry(thread_id.clone()) {
            Entry::Occupied(_) => {
                debug!(thread_id = %thread_id, "Rejected run: thread busy");
                return Err(HandoffError::AlreadyRunning(thread_id));
            }
            Entry::Vacant(slot) => {
                slot.insert(LiveRun {
                    run_id: run_id.clone(),
                    token: token.clone(),
                });
            }
        }

        info!(thread_id = %thread_id, run_id = %run_id, "Run started");

        let guard = RegistryGuard {
            runs: self.runs.clone(),
            thread_id: thread_id.clone(),
            run_id: run_id.clone(),
        };
        let input = input.into();
        let task_thread = thread_id.clone();
        let task_token = token.clone();
        let transform = self.transform.clone();

        let join = tokio::spawn(async move {
            // A panic inside the run (a sink callback included) still ends in on_error
            let worker = tokio::spawn(drive(
                graph,
                task_thread.clone(),
                input,
                task_token,
                sink.clone(),
            ));
            let outcome = match worker.await.unwrap_or_else(RunOutcome::task_failed) {
                RunOutcome::Completed { response, metrics } => RunOutcome::Completed {
                    response: match &transform {
                        Some(transform) => transform(&response),
                        None => response,
                    },
                    metrics,
                },
                other => other,
            };

            // Thread becomes idle before the terminal callback fires
            drop(guard);

            match &outcome {
                RunOutcome::Completed { response, metrics } => {
                    info!(thread_id = %task_thread, steps = metrics.steps, "Run completed");
                    sink.on_final(response, metrics);
                }
                RunOutcome::Failed { kind, detail } => {
                    error!(thread_id = %task_thread, kind = %kind, detail = %detail, "Run failed");
                    sink.on_error(*kind, detail);
                }
                RunOutcome::Cancelled => {
                    info!(thread_id = %task_thread, "Run cancelled");
                    sink.on_cancelled();
                }
            }
            outcome
        });

        Ok(RunHandle {
            thread_id,
            run_id,
            token,
            join,
        })
    }

    /// Request cancellation of a run.
    pub fn cancel(&self, handle: &RunHandle) {
        handle.cancel();
    }

    /// Cancel the live run of a thread. Returns `false` if the thread is idle.
    pub fn cancel_thread(&self, thread_id: &str) -> bool {
        match self.runs.get(thread_id) {
            Some(live) => {
                live.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn status(&self, thread_id: &str) -> RunStatus {
        if self.runs.contains_key(thread_id) {
            RunStatus::Running
        } else {
            RunStatus::Idle
        }
    }

    pub fn active_runs(&self) -> usize {
        self.runs.len()
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("active_runs", &self.runs.len())
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Pull steps until the run ends, forwarding progress lines.
async fn drive(
    graph: CompiledGraph,
    thread_id: String,
    input: String,
    token: CancellationToken,
    sink: Arc<dyn StreamSink>,
) -> RunOutcome {
    let started = Instant::now();
    let mut metrics = RunMetrics::default();
    let mut stream = graph.stream(&thread_id, input, token);

    while let Some(item) = stream.next().await {
        let step = match item {
            Ok(step) => step,
            Err(HandoffError::Cancelled) => return RunOutcome::Cancelled,
            Err(e) => return RunOutcome::failed(&e),
        };

        metrics.steps += 1;
        metrics.usage += step.usage;
        for message in step.new_messages() {
            metrics.record(message);
            if let Some(line) = progress_line(message) {
                sink.on_partial(&line);
            }
        }

        if step.is_terminal() {
            metrics.duration = started.elapsed();
            return match step.final_response() {
                Some(response) if !response.trim().is_empty() => RunOutcome::Completed {
                    response: response.to_string(),
                    metrics,
                },
                _ => RunOutcome::failed(&HandoffError::EmptyResponse),
            };
        }
    }

    RunOutcome::failed(&HandoffError::Internal(
        "run ended before reaching the terminal node".into(),
    ))
}
