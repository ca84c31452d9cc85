//! Binary entry point for the deepwalk CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Print an indented outline of a JSON document
//! deepwalk outline config.json
//!
//! # Read from stdin, prefix every line, and close containers explicitly
//! cat config.json | deepwalk outline - --prefix '| ' --container-end
//!
//! # Wrap the outline in a JSON response
//! deepwalk outline config.json --format json
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use deepwalk::error::DeepwalkError;
use deepwalk::outline::{self, OutlineOptions};
use deepwalk::output::{emit_response, ErrorResponse, OutlineResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Walk nested documents depth-first.
#[derive(Parser, Debug)]
#[command(name = "deepwalk", version, about = "Walk nested documents depth-first")]
struct Cli {
    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print an indented outline of a JSON document.
    Outline {
        /// JSON file to read, or `-` for stdin.
        file: PathBuf,

        /// Print a closing line after each container.
        #[arg(long)]
        container_end: bool,

        /// Text written at the start of every line.
        #[arg(long)]
        prefix: Option<String>,

        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl Command {
    fn format(&self) -> OutputFormat {
        match self {
            Command::Outline { format, .. } => *format,
        }
    }
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Output format for commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Plain outline text (default).
    #[default]
    Text,
    /// Full JSON response.
    Json,
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    let format = cli.command.format();
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.error_code();
            match format {
                OutputFormat::Json => {
                    let _ = emit_response(&ErrorResponse::from_error(&err), &mut io::stdout());
                    let _ = io::stdout().flush();
                }
                OutputFormat::Text => eprintln!("error: {}", err),
            }
            ExitCode::from(code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(command: Command) -> Result<(), DeepwalkError> {
    match command {
        Command::Outline {
            file,
            container_end,
            prefix,
            format,
        } => {
            let options = outline_options(container_end, prefix)?;
            execute_outline(&file, &options, format)
        }
    }
}

/// Validate outline flags.
///
/// Missing bindings are never ignored here: the outline adapter binds every
/// kind a JSON document can produce.
fn outline_options(
    container_end: bool,
    prefix: Option<String>,
) -> Result<OutlineOptions, DeepwalkError> {
    if prefix.as_deref().is_some_and(|p| p.contains(['\n', '\r'])) {
        return Err(DeepwalkError::invalid_args(
            "--prefix must not contain line breaks",
        ));
    }
    Ok(OutlineOptions {
        container_end,
        prefix,
        ..OutlineOptions::default()
    })
}

// ============================================================================
// Command Executors
// ============================================================================

/// Execute outline command.
fn execute_outline(
    file: &Path,
    options: &OutlineOptions,
    format: OutputFormat,
) -> Result<(), DeepwalkError> {
    let document = read_document(file)?;
    tracing::debug!(file = %file.display(), "rendering outline");
    let text = outline::render(&document, options)?;

    let mut stdout = io::stdout();
    match format {
        OutputFormat::Text => stdout.write_all(text.as_bytes()),
        OutputFormat::Json => {
            let response = OutlineResponse::new(file.display().to_string(), text);
            emit_response(&response, &mut stdout)
        }
    }
    .map_err(|e| DeepwalkError::WriteFailed {
        message: e.to_string(),
    })
}

/// Read and parse a JSON document from `file`, or stdin for `-`.
fn read_document(file: &Path) -> Result<serde_json::Value, DeepwalkError> {
    let path = file.display().to_string();
    let raw = if file == Path::new("-") {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .map_err(|e| DeepwalkError::ReadFailed {
                path: path.clone(),
                message: e.to_string(),
            })?;
        raw
    } else {
        if !file.exists() {
            return Err(DeepwalkError::FileNotFound { path });
        }
        fs::read_to_string(file).map_err(|e| DeepwalkError::ReadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?
    };
    serde_json::from_str(&raw).map_err(|e| DeepwalkError::InvalidJson {
        path,
        message: e.to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================
