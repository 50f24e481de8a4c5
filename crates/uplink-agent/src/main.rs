// crates/uplink-agent/src/main.rs
// ============================================================================
// Module: Uplink Agent Entry Point
// Description: Command dispatcher for the uplink delivery agent.
// Purpose: Provide run, config, stats, and enqueue commands over the runtime.
// Dependencies: clap, uplink-agent, uplink-config, uplink-core, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `uplink` binary loads the agent configuration, assembles the delivery
//! engine, and either runs it until the process is terminated or executes one
//! administrative command. Logs go to stderr through `tracing-subscriber`
//! (filtered by `RUST_LOG`); command output goes to stdout as JSON or plain
//! lines. Security posture: CLI inputs and config files are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uplink_agent::AgentRuntime;
use uplink_agent::open_store;
use uplink_config::UplinkConfig;
use uplink_core::Clock;
use uplink_core::QueueStore;
use uplink_core::StreamName;
use uplink_core::SystemClock;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Store-and-forward telemetry delivery agent.
#[derive(Parser, Debug)]
#[command(name = "uplink", version, disable_help_subcommand = true, arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the delivery agent.
    Run(RunCommand),
    /// Load and validate the configuration, then exit.
    CheckConfig(CheckConfigCommand),
    /// Print queue statistics as JSON.
    Stats(StatsCommand),
    /// Enqueue one JSON payload for delivery.
    Enqueue(EnqueueCommand),
}

/// Arguments for the `run` command.
#[derive(Args, Debug)]
struct RunCommand {
    /// Path to the configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Run one cycle of every loop and exit instead of staying resident.
    #[arg(long)]
    once: bool,
}

/// Arguments for the `check-config` command.
#[derive(Args, Debug)]
struct CheckConfigCommand {
    /// Path to the configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for the `stats` command.
#[derive(Args, Debug)]
struct StatsCommand {
    /// Path to the configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for the `enqueue` command.
#[derive(Args, Debug)]
struct EnqueueCommand {
    /// Path to the configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Stream the payload belongs to.
    #[arg(long, value_name = "STREAM")]
    stream: String,
    /// JSON payload; read from stdin when omitted.
    #[arg(long, value_name = "JSON")]
    payload: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    init_tracing()?;
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(command) => command_run(&command),
        Commands::CheckConfig(command) => command_check_config(&command),
        Commands::Stats(command) => command_stats(&command),
        Commands::Enqueue(command) => command_enqueue(command),
    }
}

/// Installs the stderr log subscriber filtered by `RUST_LOG`.
fn init_tracing() -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| CliError::new(format!("tracing init failed: {err}")))
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `run` command.
fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let runtime = AgentRuntime::new(&config).map_err(|err| CliError::new(err.to_string()))?;
    if command.once {
        runtime.run_once();
        return Ok(ExitCode::SUCCESS);
    }
    let _handles = runtime.start().map_err(|err| CliError::new(err.to_string()))?;
    info!("agent running");
    // The queue is durable and stale claims are reswept on the next start,
    // so termination needs no coordinated shutdown; the handles stay in
    // scope for the life of the process.
    loop {
        thread::park();
    }
}

/// Executes the `check-config` command.
fn command_check_config(command: &CheckConfigCommand) -> CliResult<ExitCode> {
    load_config(command.config.as_deref())?;
    write_stdout_line("config ok")
        .map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `stats` command.
fn command_stats(command: &StatsCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let store = open_store(&config).map_err(|err| CliError::new(err.to_string()))?;
    let stats = store
        .stats(SystemClock::new().now())
        .map_err(|err| CliError::new(format!("stats read failed: {err}")))?;
    let rendered = serde_json::to_string_pretty(&stats)
        .map_err(|err| CliError::new(format!("stats encode failed: {err}")))?;
    write_stdout_line(&rendered)
        .map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `enqueue` command.
fn command_enqueue(command: EnqueueCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let store = open_store(&config).map_err(|err| CliError::new(err.to_string()))?;
    let payload = match command.payload {
        Some(payload) => payload.into_bytes(),
        None => read_stdin_payload(config.store.max_payload_bytes)?,
    };
    let id = store
        .enqueue(&StreamName::new(command.stream), &payload, SystemClock::new().now())
        .map_err(|err| CliError::new(format!("enqueue failed: {err}")))?;
    let rendered = serde_json::json!({ "item_id": id }).to_string();
    write_stdout_line(&rendered)
        .map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates the configuration from the resolved path.
fn load_config(path: Option<&Path>) -> CliResult<UplinkConfig> {
    UplinkConfig::load(path).map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Reads a payload from stdin, bounded one byte past the configured limit so
/// the store boundary reports oversize inputs with its own error.
fn read_stdin_payload(max_bytes: usize) -> CliResult<Vec<u8>> {
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut payload = Vec::new();
    std::io::stdin()
        .lock()
        .take(limit)
        .read_to_end(&mut payload)
        .map_err(|err| CliError::new(format!("stdin read failed: {err}")))?;
    Ok(payload)
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
