//! Binary entry point for the thisify CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Qualify member references in the class at line 10, column 5
//! thisify --at src/Foo.java:10:5
//!
//! # Preview the change as a unified diff without writing
//! thisify --at src/Foo.java:10:5 --dry-run --format diff
//!
//! # Machine-readable report
//! thisify --at src/Foo.java:10:5 --format json
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use thisify::cli::{load_options, run_insert_this, InsertThisRequest, OutputFormat};
use thisify::error::{OutputErrorCode, ThisifyError};
use thisify::java::ops::ClassBoundary;
use thisify::output::{emit_response, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Qualify unqualified member references with an explicit `this` receiver.
///
/// Rewrites every unqualified reference to an instance field or method of
/// the class at the given location. Errors are printed as JSON.
#[derive(Parser, Debug)]
#[command(name = "thisify", version)]
struct Cli {
    /// Caret location: path:line:col (1-based).
    #[arg(long)]
    at: String,

    /// Do not write the file back.
    #[arg(long)]
    dry_run: bool,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Config file (default: thisify.toml in the current directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// How "the same class" is decided: name or declaration.
    #[arg(long)]
    class_boundary: Option<ClassBoundary>,

    /// Another project file whose references are counted but not rewritten.
    #[arg(long = "project-file")]
    project_files: Vec<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
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

/// Output format.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum Format {
    /// Summary, or the rewritten file with --dry-run.
    #[default]
    Text,
    /// Unified diff.
    Diff,
    /// JSON report.
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Diff => OutputFormat::Diff,
            Format::Json => OutputFormat::Json,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.log_level, cli.log_json);

    match execute(cli) {
        Ok(output) => {
            let mut stdout = io::stdout();
            let _ = stdout.write_all(output.as_bytes());
            let _ = stdout.flush();
            ExitCode::SUCCESS
        }
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Execute the command, returning what to print.
fn execute(cli: Cli) -> Result<String, ThisifyError> {
    let cwd = std::env::current_dir()
        .map_err(|e| ThisifyError::internal(format!("failed to get current directory: {e}")))?;
    let options = load_options(cli.config.as_deref(), &cwd, cli.class_boundary)?;
    let request = InsertThisRequest {
        at: cli.at,
        project_files: cli.project_files,
        dry_run: cli.dry_run,
        format: cli.format.into(),
        options,
    };
    run_insert_this(&request)
}

// ============================================================================
// Tests
// ============================================================================
