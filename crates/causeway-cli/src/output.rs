//! Shared output layer for human/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: readable text for terminals, stable JSON for scripts. Reports
//! go to stdout; errors and diagnostics go to stderr in the same two shapes.

use causeway_core::{CausewayError, Diagnostic};
use serde::Serialize;
use std::io::{self, Write};

/// The two output modes supported by the CLI, selected by `--json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// A structured error with optional suggestion and error code.
///
/// Pipeline failures carry registry codes (`E1001`..) through
/// [`Diagnostic`]; errors invented by the CLI layer itself (bad `--dot`
/// selection and the like) use snake_case codes local to this layer.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (e.g. "E2003", "unknown_label").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    /// Create a simple error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    /// Create an error with a suggestion and error code.
    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
        }
    }
}

/// Convert a pipeline error into the CLI error contract.
impl From<&CausewayError> for CliError {
    fn from(err: &CausewayError) -> Self {
        let diagnostic = err.diagnostic();
        Self {
            message: diagnostic.message,
            suggestion: diagnostic.hint,
            error_code: Some(diagnostic.code.to_string()),
        }
    }
}

/// Render a serializable value to stdout in the requested format.
///
/// In JSON mode, the value is serialized with `serde_json`. In human mode,
/// the provided `human_fn` closure produces the text output.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Human => {
            human_fn(value, &mut out)?;
        }
    }
    Ok(())
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Human => {
            writeln!(out, "error: {}", error.message)?;
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

/// JSON envelope tying a diagnostic to the execution it came from.
#[derive(Serialize)]
struct DiagnosticEnvelope<'a> {
    execution: &'a str,
    #[serde(flatten)]
    diagnostic: &'a Diagnostic,
}

/// Render a pipeline [`Diagnostic`] to stderr with full context: code,
/// message, offending events, and hint.
pub fn render_diagnostic(
    mode: OutputMode,
    label: &str,
    diagnostic: &Diagnostic,
) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": DiagnosticEnvelope {
                    execution: label,
                    diagnostic,
                },
            });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Human => {
            write_diagnostic_human(&mut out, label, diagnostic)?;
        }
    }
    Ok(())
}

fn write_diagnostic_human(
    w: &mut dyn Write,
    label: &str,
    diagnostic: &Diagnostic,
) -> io::Result<()> {
    if label.is_empty() {
        writeln!(w, "error: [{}] {}", diagnostic.code, diagnostic.message)?;
    } else {
        writeln!(
            w,
            "error: execution {label:?}: [{}] {}",
            diagnostic.code, diagnostic.message
        )?;
    }
    for event in &diagnostic.events {
        writeln!(w, "  event: {event}")?;
    }
    if let Some(ref hint) = diagnostic.hint {
        writeln!(w, "  hint: {hint}")?;
    }
    Ok(())
}
