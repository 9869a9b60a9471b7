//! # Handoff Agent
//!
//! A command-line assistant built on `rig-handoff`: a supervisor model routes
//! each question to an arithmetic agent (with add/subtract/multiply/divide
//! tools) or an email-writing agent, and relays the answer.
//!
//! ## Quick Start
//! ```bash
//! cargo run -- "What is 7 plus 5?"
//! cargo run -- --thread alice --checkpoint-dir ./threads "Write an email to Bob about lunch"
//! ```
//!
//! Progress lines are printed while the run is in flight. Ctrl-C cancels the
//! run after its current step; completed steps stay checkpointed.

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Configuration management
mod config;

/// Model backend and graph wiring
mod agent;

// =============================================================================
// IMPORTS
// =============================================================================
use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rig_handoff::{
    DivisionByZeroPolicy, ErrorKind, RunMetrics, RunOutcome, SessionController, StreamSink,
};

use crate::config::{Config, Provider};

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum DivisionMode {
    /// Division by zero yields 0
    Sentinel,
    /// Division by zero is reported to the agent as an error
    Error,
}

impl From<DivisionMode> for DivisionByZeroPolicy {
    fn from(mode: DivisionMode) -> Self {
        match mode {
            DivisionMode::Sentinel => DivisionByZeroPolicy::Sentinel,
            DivisionMode::Error => DivisionByZeroPolicy::Error,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "handoff-agent",
    version,
    about = "A supervisor-routed assistant with math and email agents",
    long_about = r#"
Handoff Agent routes your request to a specialist agent and prints the answer.

  math_agent   arithmetic with add, subtract, multiply and divide tools
  email_agent  short professional emails

Conversations are kept per --thread. With --checkpoint-dir they survive
restarts; otherwise they live in memory for a single invocation.

EXAMPLES:
  handoff-agent "What is 7 plus 5?"
  handoff-agent --provider openai --model gpt-4o-mini "Divide 9 by 0"
  handoff-agent --thread alice --checkpoint-dir ./threads "Write an email to Bob"
"#
)]
struct Args {
    /// The request to send to the assistant
    #[arg(value_name = "QUERY")]
    query: String,

    /// Conversation thread identifier
    #[arg(short = 't', long = "thread", default_value = "default")]
    thread: String,

    /// Model backend (overrides LLM_PROVIDER)
    #[arg(short = 'p', long = "provider", value_enum)]
    provider: Option<Provider>,

    /// Model name (overrides LLM_MODEL)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Directory for persistent checkpoints (overrides CHECKPOINT_DIR)
    #[arg(long = "checkpoint-dir", value_name = "DIR")]
    checkpoint_dir: Option<PathBuf>,

    /// Division-by-zero behaviour of the arithmetic tools
    #[arg(long = "division-by-zero", value_enum, default_value = "sentinel")]
    division_by_zero: DivisionMode,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose", default_value = "false")]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(model) = &self.model {
            info!(model = %model, "Using model from command line");
            config.model = Some(model.clone());
        }
        if let Some(dir) = &self.checkpoint_dir {
            config.checkpoint_dir = Some(dir.clone());
        }
        config.division_by_zero = self.division_by_zero.into();
    }
}

// =============================================================================
// CONSOLE SINK
// =============================================================================
/// Prints progress to stdout and the outcome to stdout/stderr.
struct ConsoleSink;

impl StreamSink for ConsoleSink {
    fn on_partial(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn on_final(&self, response: &str, metrics: &RunMetrics) {
        println!("\n{}", "=".repeat(60));
        println!("{}", response);
        println!("{}", "=".repeat(60));
        info!(
            steps = metrics.steps,
            handoffs = metrics.handoffs,
            tool_calls = metrics.tool_calls,
            duration = ?metrics.duration,
            tokens = metrics.usage.total_tokens,
            "Run metrics"
        );
    }

    fn on_cancelled(&self) {
        eprintln!("\nRun cancelled. Completed steps are saved; run again to continue.");
    }

    fn on_error(&self, kind: ErrorKind, detail: &str) {
        eprintln!("\nRun failed ({}): {}", kind, detail);
        match kind {
            ErrorKind::Backend | ErrorKind::Timeout => {
                eprintln!("Tip: make sure the model backend is reachable (e.g. `ollama serve`).");
            }
            ErrorKind::UnknownAgent | ErrorKind::UnknownTool => {
                eprintln!("Tip: the model requested something that does not exist; try a more capable model.");
            }
            _ => {}
        }
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("Handoff agent starting up...");

    let mut config = Config::from_env()?;
    args.apply(&mut config);
    config.validate()?;

    info!(
        provider = config.provider.as_str(),
        model = config.model_name(),
        checkpoints = ?config.checkpoint_dir,
        "Configuration loaded"
    );

    let llm = agent::build_provider(&config);
    let graph = agent::build_graph(&config, llm)?;
    let controller = SessionController::new(graph);

    let handle = controller
        .start_run(args.thread.clone(), args.query.clone(), Arc::new(ConsoleSink))
        .await?;

    // Ctrl-C requests cancellation; the run stops before its next step
    let watcher = {
        let controller = controller.clone();
        let thread = args.thread.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(thread = %thread, "Interrupt received, cancelling run");
                controller.cancel_thread(&thread);
            }
        })
    };

    let outcome = handle.wait().await;
    watcher.abort();

    match outcome {
        RunOutcome::Completed { .. } => {
            info!("Run completed successfully");
            Ok(())
        }
        RunOutcome::Cancelled => Ok(()),
        RunOutcome::Failed { kind, detail } => {
            error!(kind = %kind, "Run failed");
            Err(anyhow::anyhow!("{}: {}", kind, detail))
        }
    }
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber. RUST_LOG takes precedence; otherwise
/// `--verbose` selects debug and the default is warn so progress lines stay
/// readable.
fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
