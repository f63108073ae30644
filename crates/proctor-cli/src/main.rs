// crates/proctor-cli/src/main.rs
// ============================================================================
// Module: Proctor CLI Entry Point
// Description: Command dispatcher for serving, offline reports, and config.
// Purpose: Run the HTTP server or inspect stored sessions from a shell.
// Dependencies: clap, proctor-config, proctor-core, proctor-server, tokio
// ============================================================================

//! ## Overview
//! `proctor serve` runs the HTTP surface, `proctor report` renders a report
//! for one stored session to stdout without persisting it, and `proctor
//! config check` validates configuration. Failures are written to stderr as a
//! `server_lifecycle` JSON line and the process exits with status 1.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use proctor_config::ProctorConfig;
use proctor_core::RecordStore;
use proctor_core::SessionId;
use proctor_core::SessionReport;
use proctor_server::AuditSink;
use proctor_server::LifecycleEvent;
use proctor_server::ProctorServer;
use proctor_server::StderrAuditSink;
use proctor_server::build_record_store;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "proctor", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected command.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve(ConfigArgs),
    /// Render a stored session's report to stdout.
    Report(ReportCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Shared `--config` argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Optional config file path (defaults to proctor.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `report`.
#[derive(Args, Debug)]
struct ReportCommand {
    /// Session identifier.
    #[arg(value_name = "SESSION_ID")]
    session_id: String,
    /// Output format.
    #[arg(long, value_enum, default_value_t = ReportOutput::Json)]
    format: ReportOutput,
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate configuration.
    Check(ConfigArgs),
}

/// Report output formats.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ReportOutput {
    /// HTML document.
    Html,
    /// CSV header and row.
    Csv,
    /// JSON summary.
    Json,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
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
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => command_serve(args).await,
        Commands::Report(command) => command_report(&command),
        Commands::Config {
            command: ConfigCommand::Check(args),
        } => command_config_check(&args),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Loads configuration from the optional path.
fn load_config(args: &ConfigArgs) -> CliResult<ProctorConfig> {
    ProctorConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Executes `serve`.
async fn command_serve(args: ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(&args)?;
    let server = tokio::task::spawn_blocking(move || ProctorServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `report`.
fn command_report(command: &ReportCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let store = build_record_store(&config.database)
        .map_err(|err| CliError::new(format!("record store unavailable: {err}")))?;
    let id = SessionId::new(command.session_id.clone());
    let session = store
        .get_session(&id)
        .map_err(|err| CliError::new(err.to_string()))?
        .ok_or_else(|| CliError::new(format!("session not found: {id}")))?;
    let events = store.list_events(&id).map_err(|err| CliError::new(err.to_string()))?;
    let report = SessionReport::build(session, &events);
    let bytes = render_report(&report, command.format)?;
    write_stdout_bytes(&bytes).map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Renders a report in the requested output format.
fn render_report(report: &SessionReport, format: ReportOutput) -> CliResult<Vec<u8>> {
    match format {
        ReportOutput::Html => Ok(report.render_html().into_bytes()),
        ReportOutput::Csv => report.render_csv().map_err(|err| CliError::new(err.to_string())),
        ReportOutput::Json => {
            let mut bytes = serde_json::to_vec_pretty(&report.summary())
                .map_err(|err| CliError::new(format!("report serialization failed: {err}")))?;
            bytes.push(b'\n');
            Ok(bytes)
        }
    }
}

/// Executes `config check`.
fn command_config_check(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let line = format!(
        "config ok: database={} storage={} bind={}",
        config.database.store_type.as_str(),
        config.storage.backend.as_str(),
        config.server.bind
    );
    write_stdout_bytes(format!("{line}\n").as_bytes())
        .map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes raw bytes to stdout.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)?;
    stdout.flush()
}

/// Emits a failure lifecycle event to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    StderrAuditSink.record_lifecycle(&LifecycleEvent::new("failed", Some(message.to_string())));
    ExitCode::FAILURE
}
