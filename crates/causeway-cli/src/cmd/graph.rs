//! `cwy graph`: build and verify causal graphs, with optional DOT export.
//!
//! The default output is a per-execution summary (hosts, events, inferred
//! cross edges). `--dot` switches to Graphviz DOT for a single execution:
//! one box per event named `host@time`, solid intra-host chain edges, dashed
//! cross-host communication edges.

use crate::cmd::{FailureReport, SourceArgs, display_label, read_input};
use crate::output::{CliError, OutputMode, render, render_diagnostic, render_error};
use causeway_core::{CausalGraph, CausewayError, GraphBuilder, LogEvent, NodeId, ParsedLog};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::warn;

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Log file to analyze.
    pub file: PathBuf,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Fail when a clock references a host with no events in the log.
    #[arg(long)]
    pub strict: bool,

    /// Emit Graphviz DOT for one execution instead of the summary. The label
    /// may be omitted when the log holds a single execution.
    #[arg(long, value_name = "LABEL")]
    pub dot: Option<Option<String>>,
}

/// Per-execution summary in `graph` output.
#[derive(Debug, Serialize)]
pub struct GraphSummary {
    pub label: String,
    pub hosts: Vec<String>,
    pub events: usize,
    pub cross_edges: usize,
}

/// Whole-log report for `graph`.
#[derive(Debug, Serialize)]
pub struct GraphReport {
    pub executions: Vec<GraphSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureReport>,
    pub ok: bool,
}

fn summarize(label: &str, graph: &CausalGraph) -> GraphSummary {
    let stats = graph.stats();
    GraphSummary {
        label: label.to_owned(),
        hosts: graph.hosts().to_vec(),
        events: stats.events,
        cross_edges: stats.cross_edges,
    }
}

/// Execute `cwy graph <FILE>`.
///
/// # Errors
///
/// Returns an error when the file cannot be read, a pattern is unusable, the
/// log cannot be split into executions, or a `--dot` selection cannot be
/// satisfied. Per-execution parse and build failures are part of the summary
/// report, not errors.
pub fn run_graph(args: &GraphArgs, output: OutputMode) -> anyhow::Result<()> {
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

    let builder = GraphBuilder::new().strict_hosts(args.strict);

    if let Some(ref selector) = args.dot {
        return emit_dot(&parsed, selector.as_deref(), builder, output);
    }

    let mut summaries = Vec::new();
    let mut failures: Vec<FailureReport> = parsed
        .failures()
        .iter()
        .map(|failure| {
            FailureReport::new(
                failure.label.clone(),
                &CausewayError::from(failure.error.clone()),
            )
        })
        .collect();

    for execution in parsed.executions() {
        match builder.build(execution.events()) {
            Ok(graph) => summaries.push(summarize(execution.label(), &graph)),
            Err(err) => {
                let err = CausewayError::from(err);
                warn!(
                    execution = %display_label(execution.label()),
                    code = err.error_code().code(),
                    "graph build failed"
                );
                failures.push(FailureReport::new(execution.label(), &err));
            }
        }
    }

    let report = GraphReport {
        ok: failures.is_empty(),
        executions: summaries,
        failures,
    };

    render(output, &report, |report, w| render_graph_human(report, w))
}

fn render_graph_human(report: &GraphReport, w: &mut dyn Write) -> io::Result<()> {
    for summary in &report.executions {
        writeln!(
            w,
            "execution {}: hosts [{}], {} events, {} cross edges",
            display_label(&summary.label),
            summary.hosts.join(", "),
            summary.events,
            summary.cross_edges
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

// ---------------------------------------------------------------------------
// DOT export
// ---------------------------------------------------------------------------

fn emit_dot(
    parsed: &ParsedLog,
    selector: Option<&str>,
    builder: GraphBuilder,
    output: OutputMode,
) -> anyhow::Result<()> {
    let executions = parsed.executions();
    let execution = match selector {
        Some(label) => executions.iter().find(|e| e.label() == label),
        None if executions.len() == 1 => executions.first(),
        None => None,
    };

    let Some(execution) = execution else {
        let error = if executions.is_empty() {
            CliError::with_details(
                "no execution could be parsed from the input",
                "inspect per-execution failures with `cwy parse`",
                "no_executions",
            )
        } else if let Some(label) = selector {
            CliError::with_details(
                format!("no execution labeled {label:?}"),
                "run `cwy parse` on the same input to list execution labels",
                "unknown_label",
            )
        } else {
            CliError::with_details(
                format!("log contains {} executions", executions.len()),
                "pass `--dot <LABEL>` to pick one",
                "ambiguous_execution",
            )
        };
        render_error(output, &error)?;
        anyhow::bail!("{}", error.message);
    };

    let graph = match builder.build(execution.events()) {
        Ok(graph) => graph,
        Err(err) => {
            let err = CausewayError::from(err);
            render_diagnostic(output, execution.label(), &err.diagnostic())?;
            anyhow::bail!("{err}");
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_dot(&graph, execution.label(), &mut out)?;
    Ok(())
}

/// Write one execution's graph in Graphviz DOT form.
fn write_dot(graph: &CausalGraph, label: &str, w: &mut dyn Write) -> io::Result<()> {
    let name = if label.is_empty() { "execution" } else { label };
    writeln!(w, "digraph {} {{", dot_quoted(name))?;
    writeln!(w, "    rankdir=TB;")?;
    writeln!(w, "    node [shape=box];")?;

    for host in graph.hosts() {
        for id in graph.nodes(host) {
            let Some(event) = graph.event(id) else {
                continue;
            };
            writeln!(
                w,
                "    {} [label=\"{}@{}\\n{}\"];",
                node_name(host, event.local_time()),
                dot_escaped(host),
                event.local_time(),
                dot_escaped(&truncated(&event.text))
            )?;
        }
    }

    for host in graph.hosts() {
        let chain: Vec<NodeId> = graph.nodes(host).collect();
        for pair in chain.windows(2) {
            if let [from, to] = pair {
                writeln!(w, "    {} -> {};", endpoint(graph, *from), endpoint(graph, *to))?;
            }
        }
    }

    for (parent, child) in graph.cross_edges() {
        writeln!(
            w,
            "    {} -> {} [style=dashed];",
            endpoint(graph, parent),
            endpoint(graph, child)
        )?;
    }

    writeln!(w, "}}")
}

fn endpoint(graph: &CausalGraph, id: NodeId) -> String {
    let time = graph.event(id).map_or(0, LogEvent::local_time);
    node_name(graph.host_of(id), time)
}

fn node_name(host: &str, time: u64) -> String {
    dot_quoted(&format!("{host}@{time}"))
}

fn dot_escaped(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn dot_quoted(text: &str) -> String {
    format!("\"{}\"", dot_escaped(text))
}

/// Cap label text so DOT nodes stay readable for long log lines.
fn truncated(text: &str) -> String {
    const MAX_CHARS: usize = 48;
    if text.chars().count() <= MAX_CHARS {
        text.to_owned()
    } else {
        let mut cut: String = text.chars().take(MAX_CHARS).collect();
        cut.push_str("...");
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_core::{EventSource, LogParser};

    const PATTERN: &str = r"(?m)^(?<host>\S+) (?<clock>\{.*?\}) (?<event>.*)$";

    const EXCHANGE: &str = "\
api {\"api\":1} send ping
api {\"api\":2,\"relay\":1} got pong
relay {\"relay\":1} pong
";

    fn graph_fixture(raw: &str) -> CausalGraph {
        let parsed = LogParser::new(EventSource::pattern(PATTERN).expect("pattern"))
            .parse(raw)
            .expect("parse");
        GraphBuilder::new()
            .build(parsed.executions()[0].events())
            .expect("build")
    }

    // -----------------------------------------------------------------------
    // Arg parsing
    // -----------------------------------------------------------------------

    #[test]
    fn graph_args_parse_dot_selector() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: GraphArgs,
        }

        let w = Wrapper::parse_from(["test", "app.log", "--structured"]);
        assert!(w.args.dot.is_none());
        assert!(!w.args.strict);

        let w = Wrapper::parse_from(["test", "app.log", "--structured", "--dot"]);
        assert_eq!(w.args.dot, Some(None));

        let w = Wrapper::parse_from(["test", "app.log", "--structured", "--dot", "run-2"]);
        assert_eq!(w.args.dot, Some(Some("run-2".to_owned())));

        let w = Wrapper::parse_from(["test", "app.log", "--structured", "--strict"]);
        assert!(w.args.strict);
    }

    // -----------------------------------------------------------------------
    // Summaries
    // -----------------------------------------------------------------------

    #[test]
    fn summarize_reports_hosts_and_edges() {
        let graph = graph_fixture(EXCHANGE);
        let summary = summarize("run-1", &graph);
        assert_eq!(summary.label, "run-1");
        assert_eq!(summary.hosts, vec!["api".to_owned(), "relay".to_owned()]);
        assert_eq!(summary.events, 3);
        assert_eq!(summary.cross_edges, 1);
    }

    #[test]
    fn human_summary_line_is_complete() {
        let graph = graph_fixture(EXCHANGE);
        let report = GraphReport {
            executions: vec![summarize("", &graph)],
            failures: vec![],
            ok: true,
        };
        let mut buf = Vec::new();
        render_graph_human(&report, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("execution (unlabeled): hosts [api, relay], 3 events, 1 cross edges"));
    }

    // -----------------------------------------------------------------------
    // DOT rendering
    // -----------------------------------------------------------------------

    #[test]
    fn dot_lists_nodes_chain_edges_and_dashed_cross_edges() {
        let graph = graph_fixture(EXCHANGE);
        let mut buf = Vec::new();
        write_dot(&graph, "run-1", &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();

        assert!(out.starts_with("digraph \"run-1\" {"));
        assert!(out.contains("\"api@1\" [label=\"api@1\\nsend ping\"];"));
        assert!(out.contains("\"relay@1\" [label=\"relay@1\\npong\"];"));
        assert!(out.contains("\"api@1\" -> \"api@2\";"));
        assert!(out.contains("\"relay@1\" -> \"api@2\" [style=dashed];"));
        assert!(out.trim_end().ends_with('}'));
    }

    #[test]
    fn dot_uses_fallback_name_for_empty_label() {
        let graph = graph_fixture("solo {\"solo\":1} only event\n");
        let mut buf = Vec::new();
        write_dot(&graph, "", &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.starts_with("digraph \"execution\" {"));
    }

    #[test]
    fn dot_escaping_handles_quotes_and_backslashes() {
        assert_eq!(dot_escaped(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(dot_escaped(r"a\b"), r"a\\b");
    }

    #[test]
    fn truncated_caps_long_text() {
        let long = "x".repeat(80);
        let cut = truncated(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 51);
        assert_eq!(truncated("short"), "short");
    }

    // -----------------------------------------------------------------------
    // run_graph against temp files
    // -----------------------------------------------------------------------

    fn args_for(path: &std::path::Path) -> GraphArgs {
        GraphArgs {
            file: path.to_path_buf(),
            source: SourceArgs {
                pattern: Some(PATTERN.to_owned()),
                structured: false,
                delimiter: None,
            },
            strict: false,
            dot: None,
        }
    }

    #[test]
    fn run_graph_summarizes_clean_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("app.log");
        std::fs::write(&path, EXCHANGE).unwrap();
        assert!(run_graph(&args_for(&path), OutputMode::Human).is_ok());
    }

    #[test]
    fn run_graph_dot_with_unknown_label_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("app.log");
        std::fs::write(&path, EXCHANGE).unwrap();
        let mut args = args_for(&path);
        args.dot = Some(Some("ghost".to_owned()));
        let err = run_graph(&args, OutputMode::Human).expect_err("unknown label");
        assert!(err.to_string().contains("no execution labeled"));
    }

    #[test]
    fn run_graph_dot_single_execution_needs_no_label() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("app.log");
        std::fs::write(&path, EXCHANGE).unwrap();
        let mut args = args_for(&path);
        args.dot = Some(None);
        assert!(run_graph(&args, OutputMode::Human).is_ok());
    }
}
