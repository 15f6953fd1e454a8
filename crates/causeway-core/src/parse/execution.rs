//! Extracting clock-annotated events from one execution's chunk of text.
//!
//! The pattern strategy runs a compiled regex over the whole chunk and turns
//! every match into an event; line numbers come from counting newlines before
//! the match. The structured strategy treats the chunk as one JSON object per
//! line and additionally tracks each line's byte offset within the chunk.
//!
//! Malformed structured records and matches whose required capture groups did
//! not participate are skipped with a [`tracing`] warning rather than
//! aborting the execution; a clock string that is present but unparsable is
//! always fatal. If nothing at all survives, the execution fails with
//! [`ParseError::NoEventsParsed`].

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use super::ParseError;
use super::pattern::{EventPattern, EventSource, GROUP_CLOCK, GROUP_EVENT, GROUP_HOST};
use crate::clock::parse_timestamp;
use crate::event::LogEvent;

// ---------------------------------------------------------------------------
// Structured-line field names
// ---------------------------------------------------------------------------

/// JSON key holding the host id in structured lines.
pub const FIELD_HOST: &str = "processId";
/// JSON key holding the event text in structured lines.
pub const FIELD_TEXT: &str = "message";
/// JSON key holding the raw clock string in structured lines.
pub const FIELD_CLOCK: &str = "VCString";

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parses one execution's chunk into events, in input order.
///
/// `label` identifies the execution in errors; it is the empty string for
/// unlabeled logs.
///
/// # Errors
///
/// [`ParseError::Timestamp`] on the first unparsable clock string, or
/// [`ParseError::NoEventsParsed`] when the whole chunk yields nothing.
pub fn parse_execution(
    source: &EventSource,
    chunk: &str,
    label: &str,
) -> Result<Vec<LogEvent>, ParseError> {
    let events = match source {
        EventSource::Pattern(pattern) => pattern_events(pattern, chunk)?,
        EventSource::StructuredLines => structured_events(chunk)?,
    };
    if events.is_empty() {
        return Err(ParseError::NoEventsParsed {
            label: label.to_owned(),
        });
    }
    Ok(events)
}

// ---------------------------------------------------------------------------
// Pattern strategy
// ---------------------------------------------------------------------------

fn pattern_events(pattern: &EventPattern, chunk: &str) -> Result<Vec<LogEvent>, ParseError> {
    let mut events = Vec::new();
    for caps in pattern.regex().captures_iter(chunk) {
        let start = caps.get(0).map_or(0, |m| m.start());
        let line = line_number_at(chunk, start);

        let (Some(host), Some(clock_raw), Some(text)) = (
            caps.name(GROUP_HOST),
            caps.name(GROUP_CLOCK),
            caps.name(GROUP_EVENT),
        ) else {
            // A required group can fail to participate when the user made it
            // optional. Treat the match as noise.
            warn!(line, "skipping match with a non-participating required capture group");
            continue;
        };

        let clock = parse_timestamp(clock_raw.as_str(), host.as_str(), line)?;

        let mut fields = BTreeMap::new();
        for name in pattern.field_groups() {
            if let Some(capture) = caps.name(name) {
                fields.insert(name.to_owned(), capture.as_str().to_owned());
            }
        }

        events.push(LogEvent {
            text: text.as_str().to_owned(),
            clock,
            line,
            byte_offset: None,
            fields,
        });
    }
    Ok(events)
}

/// 1-based line number of the byte at `offset`.
fn line_number_at(chunk: &str, offset: usize) -> usize {
    chunk
        .as_bytes()
        .iter()
        .take(offset)
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

// ---------------------------------------------------------------------------
// Structured-lines strategy
// ---------------------------------------------------------------------------

fn structured_events(chunk: &str) -> Result<Vec<LogEvent>, ParseError> {
    let mut events = Vec::new();
    let mut offset = 0usize;

    for (i, line) in chunk.split('\n').enumerate() {
        let line_no = i + 1;
        let line_start = offset;
        offset += line.len() + 1; // the '\n' the line was split on

        if line.trim().is_empty() {
            continue;
        }

        let Ok(Value::Object(record)) = serde_json::from_str::<Value>(line) else {
            warn!(line = line_no, "skipping structured line that is not a JSON object");
            continue;
        };

        let (Some(host), Some(text), Some(clock_raw)) = (
            record.get(FIELD_HOST).and_then(Value::as_str),
            record.get(FIELD_TEXT).and_then(Value::as_str),
            record.get(FIELD_CLOCK).and_then(Value::as_str),
        ) else {
            warn!(
                line = line_no,
                "skipping structured line missing {FIELD_HOST}/{FIELD_TEXT}/{FIELD_CLOCK}"
            );
            continue;
        };

        let clock = parse_timestamp(clock_raw, host, line_no)?;

        let mut fields = BTreeMap::new();
        for (key, value) in &record {
            if key == FIELD_HOST || key == FIELD_TEXT || key == FIELD_CLOCK {
                continue;
            }
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            fields.insert(key.clone(), rendered);
        }

        events.push(LogEvent {
            text: text.to_owned(),
            clock,
            line: line_no,
            byte_offset: Some(line_start),
            fields,
        });
    }
    Ok(events)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
