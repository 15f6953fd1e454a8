#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::{env, io};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "causeway: causal graphs from vector-clock logs",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Parse a log into executions without building graphs",
        long_about = "Split a log into executions and parse their events. Reports per-execution \
                      event and host counts plus any parse failures; no graphs are built.",
        after_help = "EXAMPLES:\n    # Summarize a pattern-based log\n    cwy parse app.log --pattern '(?m)^(?<host>\\S+) (?<clock>\\{.*?\\}) (?<event>.*)$'\n\n    # Structured JSON lines, one execution per trace marker\n    cwy parse app.log --structured --delimiter '--- run (?<trace>\\w+) ---\\n'\n\n    # Emit machine-readable output\n    cwy parse app.log --structured --json"
    )]
    Parse(cmd::parse::ParseArgs),

    #[command(
        about = "Build and verify causal graphs",
        long_about = "Parse the log, build a causal graph per execution, and verify that every \
                      vector clock is reproduced by the graph structure. With --dot, emits \
                      Graphviz DOT for a single execution instead of the summary (DOT is plain \
                      text; --json does not apply to it).",
        after_help = "EXAMPLES:\n    # Summarize every execution\n    cwy graph app.log --pattern '(?m)^(?<host>\\S+) (?<clock>\\{.*?\\}) (?<event>.*)$'\n\n    # Export the only execution as Graphviz DOT\n    cwy graph app.log --structured --dot | dot -Tsvg > app.svg\n\n    # Pick a delimited execution by label\n    cwy graph app.log --structured --delimiter '--- run (?<trace>\\w+) ---\\n' --dot two"
    )]
    Graph(cmd::graph::GraphArgs),

    #[command(
        about = "Validate a log end to end",
        long_about = "Validate the whole log: event parsing, per-host clock increments, \
                      cross-host references, and clock verification. Prints a diagnostic for \
                      every failed execution and exits 1 when any execution fails; silent on \
                      success.",
        after_help = "EXAMPLES:\n    # Gate a log in CI; exits 1 on any inconsistency\n    cwy check app.log --structured\n\n    # Treat references to unknown hosts as errors\n    cwy check app.log --structured --strict\n\n    # Emit a machine-readable report\n    cwy check app.log --structured --json"
    )]
    Check(cmd::check::CheckArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CAUSEWAY_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "causeway_core=debug,causeway_cli=debug,cwy=debug,info"
        } else {
            "info"
        })
    });

    let format = env::var("CAUSEWAY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries only command output.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("verbose logging enabled");
    }

    let output = cli.output_mode();

    match cli.command {
        Commands::Parse(ref args) => cmd::parse::run_parse(args, output),
        Commands::Graph(ref args) => cmd::graph::run_graph(args, output),
        Commands::Check(ref args) => cmd::check::run_check(args, output),
    }
}
