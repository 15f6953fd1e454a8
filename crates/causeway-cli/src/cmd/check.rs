//! `cwy check`: end-to-end log validation with diagnostics and exit codes.
//!
//! Parses, builds, and verifies every execution. Human mode is silent when
//! the log is clean and prints one diagnostic block per failed execution to
//! stderr; JSON mode always writes a full report to stdout. The process
//! exits 1 when any execution fails.

use crate::cmd::{SourceArgs, display_label, read_input};
use crate::output::{CliError, OutputMode, render_diagnostic, render_error};
use causeway_core::{CausewayError, Diagnostic, GraphBuilder};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::warn;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Log file to validate.
    pub file: PathBuf,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Fail when a clock references a host with no events in the log.
    #[arg(long)]
    pub strict: bool,
}

/// Outcome for one execution in `check --json` output.
#[derive(Debug, Serialize)]
pub struct CheckOutcome {
    pub label: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
}

/// Whole-log report for `check --json`.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub ok: bool,
    pub executions: Vec<CheckOutcome>,
}

/// Execute `cwy check <FILE>`.
///
/// # Errors
///
/// Returns an error when the file cannot be read, a pattern is unusable, the
/// log cannot be split into executions, or any execution fails validation.
pub fn run_check(args: &CheckArgs, output: OutputMode) -> anyhow::Result<()> {
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

    let builder = GraphBuilder::new().strict_hosts(args.strict);

    let mut outcomes = Vec::new();
    for failure in parsed.failures() {
        let error = CausewayError::from(failure.error.clone());
        warn!(
            execution = %display_label(&failure.label),
            code = error.error_code().code(),
            "execution failed to parse"
        );
        outcomes.push(CheckOutcome {
            label: failure.label.clone(),
            ok: false,
            diagnostic: Some(error.diagnostic()),
        });
    }
    for execution in parsed.executions() {
        let outcome = match builder.build(execution.events()) {
            Ok(_) => CheckOutcome {
                label: execution.label().to_owned(),
                ok: true,
                diagnostic: None,
            },
            Err(err) => {
                let error = CausewayError::from(err);
                warn!(
                    execution = %display_label(execution.label()),
                    code = error.error_code().code(),
                    "execution failed validation"
                );
                CheckOutcome {
                    label: execution.label().to_owned(),
                    ok: false,
                    diagnostic: Some(error.diagnostic()),
                }
            }
        };
        outcomes.push(outcome);
    }

    let failed = outcomes.iter().filter(|outcome| !outcome.ok).count();
    let report = CheckReport {
        ok: failed == 0,
        executions: outcomes,
    };

    if output.is_json() {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        for outcome in &report.executions {
            if let Some(ref diagnostic) = outcome.diagnostic {
                render_diagnostic(output, &outcome.label, diagnostic)?;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!(
            "{failed} of {} executions failed validation",
            report.executions.len()
        );
    }
    Ok(())
}
