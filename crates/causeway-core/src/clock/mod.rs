//! Vector timestamps: representation, comparison, merging, and parsing.

pub mod parse;
pub mod vector;

pub use parse::{TimestampFormatError, parse_timestamp};
pub use vector::{CausalOrder, InvalidTimestamp, VectorTimestamp};
