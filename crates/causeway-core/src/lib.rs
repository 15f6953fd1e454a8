//! causeway-core: reconstruct verified causal graphs from distributed logs.
//!
//! The pipeline has three stages:
//!
//! 1. [`parse`]: split raw text into executions and extract events carrying
//!    vector timestamps, either through a regular expression with named
//!    capture groups or a structured JSON-lines reader.
//! 2. [`graph`]: order each host's events by its clock, infer cross-host
//!    communication edges, and verify that replaying the graph reproduces
//!    the parsed clocks exactly.
//! 3. Read the verified [`CausalGraph`] through its chain and edge API.
//!
//! Failures at every stage map to stable registry codes in [`error`].
//!
//! # Conventions
//!
//! - **Errors**: library types return structured errors; binaries may wrap
//!   them in `anyhow::Result`.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `error!`,
//!   `debug!`, `trace!`).

pub mod clock;
pub mod error;
pub mod event;
pub mod graph;
pub mod parse;

pub use clock::{CausalOrder, TimestampFormatError, VectorTimestamp};
pub use error::{CausewayError, Diagnostic, ErrorCode, EventRef};
pub use event::LogEvent;
pub use graph::{BuildError, CausalGraph, GraphBuilder, GraphStats, NodeId};
pub use parse::{
    EventPattern, EventSource, Execution, ExecutionFailure, LogParser, ParseError, ParsedLog,
};
