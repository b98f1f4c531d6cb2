//! CLI front door.
//!
//! Provides the command-line helpers behind the `thisify` binary:
//! - [`load_options`]: configuration file plus flag overrides
//! - [`execute_insert_this`]: run the command on one file
//! - [`run_insert_this`]: run it and render the result
//!
//! ## Error Handling
//!
//! All functions return `Result<T, ThisifyError>`. The `ThisifyError` type
//! provides stable error codes for JSON output and exit statuses.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thisify_core::error::ThisifyError;
use thisify_core::host::ProjectContext;
use thisify_core::output::{InsertThisResponse, MemberSummary};
use thisify_core::patch::ContentHash;
use thisify_core::types::Location;
use thisify_java::ops::{insert_this, ClassBoundary, InsertThisOptions, InsertThisOutcome};
use thisify_java::{EditorSession, JavaReferenceIndex, RecordingHost};
use tracing::{debug, info};

use crate::config::Config;
use crate::diff::unified_diff;

/// How the result of a run is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// The rewritten file with `--dry-run`, otherwise a short summary.
    #[default]
    Text,
    /// Unified diff of the file.
    Diff,
    /// `InsertThisResponse` as JSON.
    Json,
}

/// One invocation of the command.
#[derive(Debug, Clone, Default)]
pub struct InsertThisRequest {
    /// Caret location: `path:line:col`, 1-based.
    pub at: String,
    /// Other project files whose references are reported (never rewritten).
    pub project_files: Vec<PathBuf>,
    /// Leave the file on disk untouched.
    pub dry_run: bool,
    pub format: OutputFormat,
    pub options: InsertThisOptions,
}

/// Result of [`execute_insert_this`].
#[derive(Debug, Clone)]
pub struct InsertThisRun {
    pub response: InsertThisResponse,
    pub before: String,
    pub after: String,
}

/// Options from the config file with command-line overrides applied.
///
/// `config` is an explicit file (which must exist); without one,
/// `thisify.toml` in `dir` is used when present.
pub fn load_options(
    config: Option<&Path>,
    dir: &Path,
    class_boundary: Option<ClassBoundary>,
) -> Result<InsertThisOptions, ThisifyError> {
    let config = match config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_dir(dir)?,
    };
    let mut options = config.insert_this;
    if let Some(boundary) = class_boundary {
        options.class_boundary = boundary;
    }
    Ok(options)
}

/// Run the command on the file named by `request.at`.
///
/// The file is written back only when it changed and `dry_run` is off.
#[tracing::instrument(skip_all, fields(at = %request.at))]
pub fn execute_insert_this(request: &InsertThisRequest) -> Result<InsertThisRun, ThisifyError> {
    let location = Location::parse(&request.at).ok_or_else(|| {
        ThisifyError::invalid_args(format!(
            "invalid location format '{}', expected path:line:col",
            request.at
        ))
    })?;
    if location.line == 0 || location.col == 0 {
        return Err(ThisifyError::invalid_args(format!(
            "invalid location '{}': line and column are 1-based",
            request.at
        )));
    }

    let before = read_source(&location.file)?;
    let mut session = EditorSession::new();
    let file = session.open(location.file.as_str(), &before)?;

    let mut index = JavaReferenceIndex::new();
    for path in &request.project_files {
        let path = path.display().to_string();
        let source = read_source(&path)?;
        let other = session.open(path.as_str(), &source)?;
        if let Some(tree) = session.tree(other) {
            index.add_file(other, tree.clone());
        }
    }
    debug!(project_files = index.file_count(), "reference index ready");

    let caret = session
        .select_position(file, location.line, location.col)
        .ok_or_else(|| ThisifyError::internal("opened document is missing"))?;
    debug!(caret, "caret placed");

    let host = RecordingHost::new();
    let outcome = insert_this(
        ProjectContext::new(&mut session, &index, &host),
        &request.options,
    )?;

    let after = session
        .text(file)
        .ok_or_else(|| ThisifyError::internal("opened document is missing"))?;
    let before_hash = ContentHash::compute(before.as_bytes());
    let after_hash = ContentHash::compute(after.as_bytes());

    let mut response = match &outcome {
        InsertThisOutcome::Skipped(cause) => {
            info!(cause = %cause, "nothing to do");
            InsertThisResponse::skipped(location.clone(), cause.as_str(), before_hash)
        }
        InsertThisOutcome::Applied(report) => {
            let mut response = InsertThisResponse::applied(
                location.clone(),
                report.class_name.as_str(),
                before_hash,
                after_hash,
            );
            response.members = report
                .members
                .iter()
                .map(|m| MemberSummary {
                    kind: m.kind,
                    name: m.name.clone(),
                    rewritten: m.rewritten,
                })
                .collect();
            response.rewritten = report.rewritten;
            response.skipped_sites = report
                .skipped
                .iter()
                .map(|(reason, count)| (reason.as_str().to_string(), *count))
                .collect();
            response
        }
    };

    if response.changed() && !request.dry_run {
        fs::write(&location.file, &after).map_err(|err| {
            ThisifyError::apply(format!("failed to write file: {err}"), location.file.as_str())
        })?;
        response.written = true;
        info!(path = %location.file, rewritten = response.rewritten, "file written");
    }

    Ok(InsertThisRun {
        response,
        before,
        after,
    })
}

/// Run the command and render its output in `request.format`.
pub fn run_insert_this(request: &InsertThisRequest) -> Result<String, ThisifyError> {
    let run = execute_insert_this(request)?;
    render(request, &run)
}

fn render(request: &InsertThisRequest, run: &InsertThisRun) -> Result<String, ThisifyError> {
    let response = &run.response;
    match request.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(response)
                .map_err(|e| ThisifyError::internal(format!("failed to serialize response: {e}")))?;
            Ok(format!("{json}\n"))
        }
        OutputFormat::Diff => Ok(unified_diff(
            &response.location.file,
            &run.before,
            &run.after,
        )),
        OutputFormat::Text if request.dry_run => Ok(run.after.clone()),
        OutputFormat::Text => Ok(summary(response)),
    }
}

fn summary(response: &InsertThisResponse) -> String {
    if let Some(cause) = &response.skip_cause {
        return format!("nothing to do: {cause}\n");
    }
    let class_name = response.class_name.as_deref().unwrap_or_default();
    let mut out = format!(
        "{}: qualified {} reference(s) in class {}\n",
        response.location.file, response.rewritten, class_name
    );
    for member in response.members.iter().filter(|m| m.rewritten > 0) {
        out.push_str(&format!(
            "  {} {}: {}\n",
            member.kind, member.name, member.rewritten
        ));
    }
    out
}

fn read_source(path: &str) -> Result<String, ThisifyError> {
    fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => ThisifyError::file_not_found(path),
        _ => ThisifyError::internal(format!("failed to read {path}: {err}")),
    })
}
