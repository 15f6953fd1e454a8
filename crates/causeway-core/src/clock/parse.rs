//! Parsing vector timestamps out of raw clock text.
//!
//! Clock annotations arrive as JSON objects mapping host id to a positive
//! integer, e.g. `{"alice": 3, "bob": 1}`. Logs that went through another
//! serialization layer often carry the object with escaped quotes
//! (`{\"alice\": 3}`), so a failed parse is retried once after un-escaping
//! backslash-escaped quotes. Anything else is a format error.

use std::collections::BTreeMap;

use super::vector::VectorTimestamp;

/// A clock string that could not be turned into a [`VectorTimestamp`].
///
/// Carries the 1-based line number the clock was read from, the raw clock
/// text, and the underlying diagnostic so the failing substring can be shown
/// to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid vector clock on line {line}: {reason} in `{raw}`")]
pub struct TimestampFormatError {
    /// 1-based line number within the execution's chunk.
    pub line: usize,
    /// The raw clock text as it appeared in the log.
    pub raw: String,
    /// Underlying parser diagnostic.
    pub reason: String,
}

/// Parses `raw` as the vector timestamp recorded by `owner`.
///
/// `line` is the 1-based line the clock was read from and is carried into
/// any error.
///
/// # Errors
///
/// Returns [`TimestampFormatError`] when the text is not a JSON object of
/// positive integers (after the un-escape retry), or when `owner` has no
/// entry.
pub fn parse_timestamp(
    raw: &str,
    owner: &str,
    line: usize,
) -> Result<VectorTimestamp, TimestampFormatError> {
    let entries = parse_entries(raw, line)?;
    VectorTimestamp::new(owner, entries).map_err(|invalid| TimestampFormatError {
        line,
        raw: raw.to_owned(),
        reason: invalid.to_string(),
    })
}

/// Parses the raw JSON object, retrying once with `\"` un-escaped to `"`.
fn parse_entries(raw: &str, line: usize) -> Result<BTreeMap<String, u64>, TimestampFormatError> {
    match serde_json::from_str::<BTreeMap<String, u64>>(raw) {
        Ok(entries) => Ok(entries),
        Err(first_err) => {
            let unescaped = raw.replace("\\\"", "\"");
            serde_json::from_str::<BTreeMap<String, u64>>(&unescaped).map_err(|_| {
                // Report the diagnostic for the text the user actually wrote.
                TimestampFormatError {
                    line,
                    raw: raw.to_owned(),
                    reason: first_err.to_string(),
                }
            })
        }
    }
}
