//! Log events: one parsed, clock-annotated line of a distributed log.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::clock::VectorTimestamp;

/// A single logged event, created once by an execution parser and never
/// mutated afterwards.
///
/// The host the event happened on is not stored separately: it is the owner
/// of the event's vector timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    /// Human-readable event text as captured from the log.
    pub text: String,
    /// The vector timestamp recorded alongside the event.
    pub clock: VectorTimestamp,
    /// 1-based line number within the execution's chunk of the input.
    pub line: usize,
    /// Byte offset of the event's line within the chunk, when the parsing
    /// strategy tracks offsets (only the structured-lines adapter does).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_offset: Option<usize>,
    /// Free-form named captures beyond host, clock, and text.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl LogEvent {
    /// Builds an event with no extra fields and no byte offset.
    #[must_use]
    pub const fn new(text: String, clock: VectorTimestamp, line: usize) -> Self {
        Self {
            text,
            clock,
            line,
            byte_offset: None,
            fields: BTreeMap::new(),
        }
    }

    /// Host the event happened on (the clock's owner).
    #[must_use]
    pub fn host(&self) -> &str {
        self.clock.owner()
    }

    /// The event's own local time on its host.
    #[must_use]
    pub fn local_time(&self) -> u64 {
        self.clock.own_time()
    }

    /// Looks up a free-form field captured by the parser.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} [{}] {}", self.line, self.host(), self.text)
    }
}
