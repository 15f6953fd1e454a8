//! Splitting a raw log into labeled executions and parsing each one.
//!
//! Without a delimiter the whole input is one execution labeled with the
//! empty string. With one, the input is cut at every delimiter match; an
//! optional `trace` capture group on the delimiter names the chunk that
//! follows it. Labels must be unique (except the empty label), and one
//! chunk's parse failure never stops its siblings.

use std::borrow::Cow;
use std::collections::HashSet;

use regex::Regex;

use super::ParseError;
use super::execution::parse_execution;
use super::pattern::{EventSource, GROUP_TRACE, PatternError};
use crate::event::LogEvent;

/// One successfully parsed execution: a label and its ordered events.
#[derive(Debug, Clone)]
pub struct Execution {
    label: String,
    events: Vec<LogEvent>,
}

impl Execution {
    /// The execution's trace label; empty for unlabeled executions.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The execution's events in parse order.
    #[must_use]
    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    /// Number of events parsed.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

/// A chunk that failed to parse, recorded against its label.
#[derive(Debug)]
pub struct ExecutionFailure {
    /// Label of the failed execution.
    pub label: String,
    /// What went wrong.
    pub error: ParseError,
}

/// Result of parsing a whole log: executions in encounter order plus any
/// per-execution failures.
#[derive(Debug, Default)]
pub struct ParsedLog {
    executions: Vec<Execution>,
    failures: Vec<ExecutionFailure>,
}

impl ParsedLog {
    /// Labels of the successfully parsed executions, in encounter order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.executions.iter().map(Execution::label)
    }

    /// Events of the first execution with the given label, or `None` for an
    /// unknown label.
    #[must_use]
    pub fn events_for(&self, label: &str) -> Option<&[LogEvent]> {
        self.executions
            .iter()
            .find(|execution| execution.label == label)
            .map(Execution::events)
    }

    /// The successfully parsed executions.
    #[must_use]
    pub fn executions(&self) -> &[Execution] {
        &self.executions
    }

    /// Chunks that failed to parse, with their labels.
    #[must_use]
    pub fn failures(&self) -> &[ExecutionFailure] {
        &self.failures
    }

    /// True when every chunk parsed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Parses raw log text into a [`ParsedLog`].
#[derive(Debug, Clone)]
pub struct LogParser {
    source: EventSource,
    delimiter: Option<Regex>,
}

impl LogParser {
    /// A parser with no delimiter: the whole input is one unlabeled
    /// execution.
    #[must_use]
    pub const fn new(source: EventSource) -> Self {
        Self {
            source,
            delimiter: None,
        }
    }

    /// Adds a delimiter pattern, optionally containing a named `trace`
    /// capture group that labels the execution following each match.
    ///
    /// # Errors
    ///
    /// [`PatternError::Invalid`] when the delimiter regex does not compile.
    pub fn with_delimiter(mut self, pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(pattern).map_err(|source| PatternError::Invalid {
            pattern: pattern.to_owned(),
            source,
        })?;
        self.delimiter = Some(regex);
        Ok(self)
    }

    /// Splits `raw` into executions and parses each one.
    ///
    /// CRLF line endings are normalized to LF before anything else so that
    /// line counting and byte offsets agree across platforms.
    ///
    /// # Errors
    ///
    /// [`ParseError::DuplicateExecutionLabel`] when two chunks share a
    /// non-empty label. Per-chunk failures are *not* errors here; they are
    /// reported in [`ParsedLog::failures`].
    pub fn parse(&self, raw: &str) -> Result<ParsedLog, ParseError> {
        let text = normalize_newlines(raw);
        let chunks = self.split(&text)?;

        let mut log = ParsedLog::default();
        for (label, chunk) in chunks {
            match parse_execution(&self.source, chunk, &label) {
                Ok(events) => log.executions.push(Execution { label, events }),
                Err(error) => log.failures.push(ExecutionFailure { label, error }),
            }
        }
        Ok(log)
    }

    /// Cuts the text into labeled chunks, validating label uniqueness.
    fn split<'a>(&self, text: &'a str) -> Result<Vec<(String, &'a str)>, ParseError> {
        let Some(delimiter) = &self.delimiter else {
            return Ok(vec![(String::new(), text)]);
        };

        let mut cuts = Vec::new();
        for caps in delimiter.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let label = caps
                .name(GROUP_TRACE)
                .map_or_else(String::new, |m| m.as_str().to_owned());
            cuts.push((whole.start(), whole.end(), label));
        }
        if cuts.is_empty() {
            return Ok(vec![(String::new(), text)]);
        }

        let mut chunks = Vec::new();
        let head = &text[..cuts[0].0];
        if !head.trim().is_empty() {
            chunks.push((String::new(), head));
        }
        for (i, (_, end, label)) in cuts.iter().enumerate() {
            let chunk_end = cuts.get(i + 1).map_or(text.len(), |next| next.0);
            let chunk = &text[*end..chunk_end];
            if chunk.trim().is_empty() {
                continue;
            }
            chunks.push((label.clone(), chunk));
        }

        let mut seen = HashSet::new();
        for (label, _) in &chunks {
            if !label.is_empty() && !seen.insert(label.as_str()) {
                return Err(ParseError::DuplicateExecutionLabel {
                    label: label.clone(),
                });
            }
        }
        Ok(chunks)
    }
}

fn normalize_newlines(raw: &str) -> Cow<'_, str> {
    if raw.contains("\r\n") {
        Cow::Owned(raw.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(raw)
    }
}
