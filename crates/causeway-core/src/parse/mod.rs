//! Turning raw log text into per-execution event sequences.
//!
//! A log file holds one or more *executions* (independent runs of the traced
//! system), optionally separated by a delimiter pattern. Each execution's
//! chunk of text is scanned by an [`EventSource`] strategy into a sequence of
//! [`LogEvent`]s, ready for the graph builder.
//!
//! [`LogEvent`]: crate::event::LogEvent

pub mod execution;
pub mod log;
pub mod pattern;

pub use execution::parse_execution;
pub use log::{Execution, ExecutionFailure, LogParser, ParsedLog};
pub use pattern::{EventPattern, EventSource, PatternError};

use crate::clock::TimestampFormatError;

/// Errors raised while parsing a log into executions and events.
///
/// Failures of one execution are recorded in
/// [`ParsedLog::failures`](log::ParsedLog::failures) rather than propagated,
/// so sibling executions still parse; only structural problems (bad patterns,
/// duplicate labels) fail the whole parse.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    /// An event or delimiter pattern was unusable.
    #[error(transparent)]
    Pattern(#[from] PatternError),
    /// A clock string failed to parse.
    #[error(transparent)]
    Timestamp(#[from] TimestampFormatError),
    /// An execution's chunk produced no events at all.
    ///
    /// Usually the pattern does not match the log text, or a delimiter
    /// carved out a chunk with nothing in it.
    #[error("no events parsed from execution \"{label}\": the parsing strategy matched nothing")]
    NoEventsParsed {
        /// Label of the empty execution.
        label: String,
    },
    /// Two executions carried the same non-empty trace label.
    #[error("duplicate execution label \"{label}\": trace labels must be unique within a log")]
    DuplicateExecutionLabel {
        /// The colliding label.
        label: String,
    },
}
