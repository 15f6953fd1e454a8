//! `cwy parse`: split a log into executions and parse events, without
//! building graphs.
//!
//! Useful to preview what a pattern extracts before running `graph` or
//! `check`, and to list execution labels for `graph --dot`.

use crate::cmd::{FailureReport, SourceArgs, display_label, read_input};
use crate::output::{CliError, OutputMode, render, render_error};
use causeway_core::{CausewayError, Execution, LogEvent};
use clap::Args;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Log file to parse.
    pub file: PathBuf,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Per-execution summary in `parse` output.
#[derive(Debug, Serialize)]
pub struct ExecutionSummary {
    pub label: String,
    pub events: usize,
    pub hosts: usize,
}

/// Whole-log report for `parse`.
#[derive(Debug, Serialize)]
pub struct ParseReport {
    pub executions: Vec<ExecutionSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureReport>,
    pub ok: bool,
}

fn summarize(execution: &Execution) -> ExecutionSummary {
    let hosts: BTreeSet<&str> = execution.events().iter().map(LogEvent::host).collect();
    ExecutionSummary {
        label: execution.label().to_owned(),
        events: execution.event_count(),
        hosts: hosts.len(),
    }
}

/// Execute `cwy parse <FILE>`.
///
/// # Errors
///
/// Returns an error when the file cannot be read, a pattern is unusable, or
/// the log cannot be split into executions. Per-execution parse failures are
/// part of the report, not errors.
pub fn run_parse(args: &ParseArgs, output: OutputMode) -> anyhow::Result<()> {
    let parser = match args.source.to_parser() {
        Ok(parser) => parser,
        Err(err) => {
            render_error(output, &CliError::from(&err))?;
            anyhow::bail!("{err}");
        }
    };

    let raw = read_input(&args.file)?;
    let parsed = match parser.parse(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            let err = CausewayError::from(err);
            render_error(output, &CliError::from(&err))?;
            anyhow::bail!("{err}");
        }
    };

    for failure in parsed.failures() {
        warn!(
            execution = %display_label(&failure.label),
            error = %failure.error,
            "execution failed to parse"
        );
    }

    let report = ParseReport {
        executions: parsed.executions().iter().map(summarize).collect(),
        failures: parsed
            .failures()
            .iter()
            .map(|failure| {
                FailureReport::new(
                    failure.label.clone(),
                    &CausewayError::from(failure.error.clone()),
                )
            })
            .collect(),
        ok: parsed.is_clean(),
    };

    render(output, &report, |report, w| render_parse_human(report, w))
}

fn render_parse_human(report: &ParseReport, w: &mut dyn Write) -> std::io::Result<()> {
    for execution in &report.executions {
        writeln!(
            w,
            "execution {}: {} events across {} hosts",
            display_label(&execution.label),
            execution.events,
            execution.hosts
        )?;
    }
    for failure in &report.failures {
        failure.write_human(w)?;
    }
    if report.executions.is_empty() && report.failures.is_empty() {
        writeln!(w, "no executions found")?;
    }
    Ok(())
}
