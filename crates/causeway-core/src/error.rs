use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::event::LogEvent;
use crate::graph::BuildError;
use crate::parse::{ParseError, PatternError};

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidPattern,
    MissingCaptureGroup,
    TimestampFormat,
    NoEventsParsed,
    DuplicateExecutionLabel,
    ClockIncrement,
    OutOfBoundsTime,
    UnrecognizedHost,
    Intransitivity,
    ImpermissibleClock,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidPattern => "E1001",
            Self::MissingCaptureGroup => "E1002",
            Self::TimestampFormat => "E2001",
            Self::NoEventsParsed => "E2002",
            Self::DuplicateExecutionLabel => "E2003",
            Self::ClockIncrement => "E3001",
            Self::OutOfBoundsTime => "E3002",
            Self::UnrecognizedHost => "E3003",
            Self::Intransitivity => "E3004",
            Self::ImpermissibleClock => "E3005",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidPattern => "Invalid parser pattern",
            Self::MissingCaptureGroup => "Pattern missing required capture group",
            Self::TimestampFormat => "Malformed vector timestamp",
            Self::NoEventsParsed => "No events parsed",
            Self::DuplicateExecutionLabel => "Duplicate execution label",
            Self::ClockIncrement => "Clock increment violation",
            Self::OutOfBoundsTime => "Referenced time out of bounds",
            Self::UnrecognizedHost => "Unrecognized host in clock",
            Self::Intransitivity => "Causal order is cyclic",
            Self::ImpermissibleClock => "Clock not derivable from history",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidPattern => Some("Fix the regular expression syntax in the parser pattern."),
            Self::MissingCaptureGroup => {
                Some("Define (?<event>), (?<host>), and (?<clock>) capture groups in the pattern.")
            }
            Self::TimestampFormat => {
                Some("Clocks must be JSON objects mapping host names to positive integers.")
            }
            Self::NoEventsParsed => {
                Some("Check that the pattern (or structured field names) matches the log lines.")
            }
            Self::DuplicateExecutionLabel => {
                Some("Give every delimited execution a unique trace label.")
            }
            Self::ClockIncrement => {
                Some("Look for dropped, duplicated, or reordered lines from the named host.")
            }
            Self::OutOfBoundsTime => Some("Look for truncated logs from the referenced host."),
            Self::UnrecognizedHost => {
                Some("Include the referenced host's log, or drop --strict to skip the reference.")
            }
            Self::Intransitivity => {
                Some("Look for edited or duplicated clock values; the reported order has a cycle.")
            }
            Self::ImpermissibleClock => Some(
                "Compare the event's clock against its predecessors; a message may be missing from the log.",
            ),
        }
    }

    /// Whether the full error message is safe to show to end users as-is.
    ///
    /// Pattern compilation failures embed library internals, so callers
    /// should prefer the registry [`message`](Self::message) for those.
    #[must_use]
    pub const fn user_safe(self) -> bool {
        !matches!(self, Self::InvalidPattern)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

// =============================================================================
// Event references
// =============================================================================

/// A lightweight reference to a parsed event, attached to errors so that
/// reports can point at the offending log lines without owning the events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRef {
    pub host: String,
    pub line: usize,
    pub text: String,
    /// Rendered clock, e.g. `{h1=2, h2=1}`.
    pub clock: String,
}

impl EventRef {
    #[must_use]
    pub fn of(event: &LogEvent) -> Self {
        Self {
            host: event.host().to_owned(),
            line: event.line,
            text: event.text.clone(),
            clock: event.clock.to_string(),
        }
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" (line {}, host {})", self.text, self.line, self.host)
    }
}

// =============================================================================
// Aggregate error and diagnostics
// =============================================================================

/// Any failure the parsing or graph-building pipeline can report.
#[derive(Debug, Clone, Error)]
pub enum CausewayError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

impl CausewayError {
    /// The registry code for this failure.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Parse(err) => match err {
                ParseError::Pattern(PatternError::Invalid { .. }) => ErrorCode::InvalidPattern,
                ParseError::Pattern(PatternError::MissingCaptureGroup { .. }) => {
                    ErrorCode::MissingCaptureGroup
                }
                ParseError::Timestamp(_) => ErrorCode::TimestampFormat,
                ParseError::NoEventsParsed { .. } => ErrorCode::NoEventsParsed,
                ParseError::DuplicateExecutionLabel { .. } => ErrorCode::DuplicateExecutionLabel,
            },
            Self::Build(err) => match err {
                BuildError::ClockIncrement { .. } => ErrorCode::ClockIncrement,
                BuildError::OutOfBoundsTime { .. } => ErrorCode::OutOfBoundsTime,
                BuildError::UnrecognizedHost { .. } => ErrorCode::UnrecognizedHost,
                BuildError::Intransitivity { .. } => ErrorCode::Intransitivity,
                BuildError::ImpermissibleClock { .. } => ErrorCode::ImpermissibleClock,
            },
        }
    }

    /// Structured report: code, rendered message, and the offending events.
    #[must_use]
    pub fn diagnostic(&self) -> Diagnostic {
        let code = self.error_code();
        Diagnostic {
            code,
            message: self.to_string(),
            hint: code.hint().map(str::to_owned),
            events: self.offending_events(),
            user_safe: code.user_safe(),
        }
    }

    fn offending_events(&self) -> Vec<EventRef> {
        match self {
            Self::Build(BuildError::ClockIncrement { first, second, .. }) => {
                vec![first.clone(), second.clone()]
            }
            Self::Build(
                BuildError::OutOfBoundsTime { event, .. }
                | BuildError::UnrecognizedHost { event, .. }
                | BuildError::ImpermissibleClock { event, .. },
            ) => vec![event.clone()],
            Self::Parse(_) | Self::Build(BuildError::Intransitivity { .. }) => Vec::new(),
        }
    }
}

/// Serializable error report for terminal and JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Offending events, at most two.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventRef>,
    /// Whether `message` is safe to show to end users verbatim.
    pub user_safe: bool,
}
