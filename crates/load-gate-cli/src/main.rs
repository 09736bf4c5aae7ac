// crates/load-gate-cli/src/main.rs
// ============================================================================
// Module: Load Gate CLI Entry Point
// Description: Command dispatcher for insert/delete throughput runs.
// Purpose: Build the engine from config and emit machine-readable results.
// Dependencies: clap, load-gate-config, load-gate-core, load-gate-store-sqlite,
//               serde_json, thiserror
// ============================================================================

//! ## Overview
//! The load gate CLI wires a configured engine over the `SQLite` store and
//! runs one throughput operation per invocation. Results and failures are
//! emitted as JSON on stdout/stderr so harness scripts can compare single
//! versus batched runs without parsing prose. The process exits nonzero on
//! any failure.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use load_gate_config::LoadGateConfig;
use load_gate_core::AdmissionController;
use load_gate_core::BatchOperationEngine;
use load_gate_core::ClientId;
use load_gate_core::Clock;
use load_gate_core::MemoryProbe;
use load_gate_core::MetricsRecorder;
use load_gate_core::NoopMetrics;
use load_gate_core::OperationFailure;
use load_gate_core::OperationResult;
use load_gate_core::ProcSelfProbe;
use load_gate_core::ResourceGuard;
use load_gate_core::RetryExecutor;
use load_gate_core::StoragePort;
use load_gate_core::SystemClock;
use load_gate_store_sqlite::SqliteStoragePort;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "load-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an insert throughput operation.
    Insert(RunCommand),
    /// Run a delete throughput operation.
    Delete(RunCommand),
    /// Print the stored record count.
    Count(CountCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments shared by insert and delete runs.
#[derive(Args, Debug)]
struct RunCommand {
    /// Total records to mutate.
    #[arg(long)]
    total_records: u64,
    /// Records per storage call; 1 selects single-record mode.
    #[arg(long)]
    batch_size: u64,
    /// Client identity used for admission accounting.
    #[arg(long, default_value = "cli")]
    client: String,
    /// Path to the TOML config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for the count command.
#[derive(Args, Debug)]
struct CountCommand {
    /// Path to the TOML config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a config file, then exit.
    Validate(ConfigValidateCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Path to the TOML config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a rendered message.
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
    let cli = Cli::parse();
    match cli.command {
        Commands::Insert(command) => command_run(&command, RunKind::Insert),
        Commands::Delete(command) => command_run(&command, RunKind::Delete),
        Commands::Count(command) => command_count(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

// ============================================================================
// SECTION: Run Commands
// ============================================================================

/// Mutation kind selected on the command line.
#[derive(Debug, Clone, Copy)]
enum RunKind {
    /// Insert run.
    Insert,
    /// Delete run.
    Delete,
}

/// Executes an insert or delete run and emits the result as JSON.
fn command_run(command: &RunCommand, kind: RunKind) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let engine = build_engine(&config)?;
    let client = ClientId::new(command.client.clone());
    let outcome = match kind {
        RunKind::Insert => engine.run_insert(&client, command.total_records, command.batch_size),
        RunKind::Delete => engine.run_delete(&client, command.total_records, command.batch_size),
    };
    match outcome {
        Ok(result) => {
            write_stdout_line(&render_result(&result)?)
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            write_stderr_line(&render_failure(&failure)?)
                .map_err(|err| CliError::new(output_error("stderr", &err)))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the count command.
fn command_count(command: &CountCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let store = open_store(&config)?;
    let count = store
        .count_all()
        .map_err(|err| CliError::new(format!("count failed: {err}")))?;
    let body = serde_json::json!({ "records": count });
    write_stdout_line(&body.to_string())
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = load_config(command.config.as_deref())?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Loads configuration, wrapping failures in a CLI error.
fn load_config(path: Option<&std::path::Path>) -> CliResult<LoadGateConfig> {
    LoadGateConfig::load(path).map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Opens the `SQLite` store from config.
fn open_store(config: &LoadGateConfig) -> CliResult<Arc<SqliteStoragePort>> {
    let store = SqliteStoragePort::open(&config.store)
        .map_err(|err| CliError::new(format!("store open failed: {err}")))?;
    Ok(Arc::new(store))
}

/// Assembles the engine from validated configuration.
fn build_engine(config: &LoadGateConfig) -> CliResult<BatchOperationEngine> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let probe: Arc<dyn MemoryProbe> = Arc::new(ProcSelfProbe);
    let metrics: Arc<dyn MetricsRecorder> = Arc::new(NoopMetrics);
    let storage: Arc<dyn StoragePort> = open_store(config)?;
    let admission =
        Arc::new(AdmissionController::new(config.admission, Arc::clone(&clock)));
    let guard = Arc::new(ResourceGuard::new(config.resources, Arc::clone(&probe)));
    let retry = RetryExecutor::new(config.retry, Arc::clone(&metrics));
    Ok(BatchOperationEngine::new(
        admission,
        guard,
        retry,
        storage,
        metrics,
        probe,
        clock,
        config.engine_limits(),
    ))
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders a completed operation result as pretty JSON.
fn render_result(result: &OperationResult) -> CliResult<String> {
    serde_json::to_string_pretty(result)
        .map_err(|err| CliError::new(format!("result serialization failed: {err}")))
}

/// Renders a failed operation as a machine-readable JSON object.
fn render_failure(failure: &OperationFailure) -> CliResult<String> {
    let body = serde_json::json!({
        "operation_id": failure.operation_id.as_str(),
        "error": failure.error.kind(),
        "message": failure.error.to_string(),
    });
    serde_json::to_string_pretty(&body)
        .map_err(|err| CliError::new(format!("failure serialization failed: {err}")))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

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

/// Formats an output stream error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed writing to {stream}: {error}")
}

/// Writes an error message to stderr and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
