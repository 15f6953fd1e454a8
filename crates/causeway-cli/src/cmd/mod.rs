//! Command implementations, one module per subcommand, plus the argument
//! surface and report pieces they share.

pub mod check;
pub mod graph;
pub mod parse;

use anyhow::Context;
use causeway_core::{CausewayError, Diagnostic, EventSource, LogParser, ParseError};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

/// Log source selection shared by every subcommand.
///
/// Exactly one of `--pattern` and `--structured` must be given.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Event regex with named capture groups `host`, `clock`, and `event`.
    #[arg(
        long,
        value_name = "REGEX",
        conflicts_with = "structured",
        required_unless_present = "structured"
    )]
    pub pattern: Option<String>,

    /// Treat each non-empty line as a JSON object with `processId`,
    /// `message`, and `VCString` keys.
    #[arg(long)]
    pub structured: bool,

    /// Regex splitting the input into executions; a named `trace` group
    /// labels the chunk following each match.
    #[arg(long, value_name = "REGEX", allow_hyphen_values = true)]
    pub delimiter: Option<String>,
}

impl SourceArgs {
    /// Build the log parser this invocation asked for.
    ///
    /// # Errors
    ///
    /// Returns an error if the event pattern or delimiter fails to compile
    /// or lacks a required capture group.
    pub fn to_parser(&self) -> Result<LogParser, CausewayError> {
        let source = match self.pattern.as_deref() {
            Some(pattern) => EventSource::pattern(pattern).map_err(ParseError::from)?,
            None => EventSource::structured_lines(),
        };
        let parser = LogParser::new(source);
        match self.delimiter.as_deref() {
            Some(delimiter) => Ok(parser.with_delimiter(delimiter).map_err(ParseError::from)?),
            None => Ok(parser),
        }
    }
}

/// Read a log file into memory with a path-bearing error message.
///
/// # Errors
///
/// Returns an error when the file does not exist or is not valid UTF-8.
pub fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Quote a label for human output; the empty label reads as `(unlabeled)`.
#[must_use]
pub fn display_label(label: &str) -> String {
    if label.is_empty() {
        "(unlabeled)".to_owned()
    } else {
        format!("{label:?}")
    }
}

/// One failed execution as it appears in `parse` and `graph` reports.
#[derive(Debug, Serialize)]
pub struct FailureReport {
    pub label: String,
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
}

impl FailureReport {
    pub fn new(label: impl Into<String>, error: &CausewayError) -> Self {
        Self {
            label: label.into(),
            diagnostic: error.diagnostic(),
        }
    }

    /// One-line human rendering plus an optional hint line.
    pub fn write_human(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "failed {} [{}]: {}",
            display_label(&self.label),
            self.diagnostic.code,
            self.diagnostic.message
        )?;
        if let Some(ref hint) = self.diagnostic.hint {
            writeln!(w, "  hint: {hint}")?;
        }
        Ok(())
    }
}
