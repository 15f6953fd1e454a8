//! Event source strategies: how raw log text maps to events.
//!
//! A log either matches a user-supplied regular expression with named capture
//! groups, or it is already line-oriented JSON. The two strategies are a
//! closed set; parsing code matches on [`EventSource`] rather than on any
//! runtime capability probing.

use regex::Regex;

/// Named capture group that must yield the event's vector clock text.
pub const GROUP_CLOCK: &str = "clock";
/// Named capture group that must yield the host id.
pub const GROUP_HOST: &str = "host";
/// Named capture group that must yield the event text.
pub const GROUP_EVENT: &str = "event";

/// Optional named capture group on delimiters that labels the execution.
pub const GROUP_TRACE: &str = "trace";

/// The three capture groups every event pattern must define.
pub const REQUIRED_GROUPS: [&str; 3] = [GROUP_HOST, GROUP_CLOCK, GROUP_EVENT];

/// A pattern that could not be used.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    /// The regular expression failed to compile.
    ///
    /// The wrapped diagnostic comes straight from the regex engine and is
    /// meant for logs, not end users.
    #[error("invalid pattern `{pattern}`: {source}")]
    Invalid {
        /// The pattern as supplied.
        pattern: String,
        /// Compiler diagnostic.
        #[source]
        source: regex::Error,
    },
    /// A required named capture group is not defined by the pattern.
    #[error("pattern is missing the required named capture group `{name}`")]
    MissingCaptureGroup {
        /// The absent group.
        name: &'static str,
    },
}

/// A compiled event pattern, guaranteed to define the `host`, `clock`, and
/// `event` named capture groups.
///
/// Any further named groups are free-form: each match's captures for them
/// become entries in the event's `fields` map.
#[derive(Debug, Clone)]
pub struct EventPattern {
    regex: Regex,
}

impl EventPattern {
    /// Compiles `pattern` and checks the required named groups.
    ///
    /// # Errors
    ///
    /// [`PatternError::Invalid`] when the regex does not compile,
    /// [`PatternError::MissingCaptureGroup`] when `host`, `clock`, or
    /// `event` is not defined.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(pattern).map_err(|source| PatternError::Invalid {
            pattern: pattern.to_owned(),
            source,
        })?;
        for required in REQUIRED_GROUPS {
            let defined = regex
                .capture_names()
                .flatten()
                .any(|name| name == required);
            if !defined {
                return Err(PatternError::MissingCaptureGroup { name: required });
            }
        }
        Ok(Self { regex })
    }

    /// The compiled regex.
    #[must_use]
    pub const fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Names of the free-form capture groups (everything beyond the required
    /// three), in pattern order.
    pub fn field_groups(&self) -> impl Iterator<Item = &str> {
        self.regex
            .capture_names()
            .flatten()
            .filter(|name| !REQUIRED_GROUPS.contains(name))
    }
}

/// How events are extracted from an execution's chunk of text.
#[derive(Debug, Clone)]
pub enum EventSource {
    /// Regex with named `host`/`clock`/`event` capture groups, run over the
    /// whole chunk in match order.
    Pattern(EventPattern),
    /// One JSON object per line with `processId`/`message`/`VCString` keys.
    StructuredLines,
}

impl EventSource {
    /// Builds the pattern strategy from a regex string.
    ///
    /// # Errors
    ///
    /// Same conditions as [`EventPattern::new`].
    pub fn pattern(pattern: &str) -> Result<Self, PatternError> {
        Ok(Self::Pattern(EventPattern::new(pattern)?))
    }

    /// The structured line-oriented strategy.
    #[must_use]
    pub const fn structured_lines() -> Self {
        Self::StructuredLines
    }
}
