//! Graph construction.
//!
//! Events are bucketed by host and sorted by their own clock entry, the
//! per-host chains are checked for exactly-by-one increments, and cross-host
//! edges are inferred by walking each chain with a running map of the last
//! known time per foreign host: a clock entry that advances past that map is
//! a communication the chain just learned about. Candidate edges already
//! implied by another candidate in the same clock are dropped, so each node
//! keeps at most one parent per host.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::warn;

use crate::error::EventRef;
use crate::event::LogEvent;

use super::verify::verify;
use super::{CausalGraph, Node, NodeId, NodeKind};

/// A structural inconsistency between the parsed clocks and a well-formed
/// causal order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Consecutive events on one host whose own clock entries do not differ
    /// by exactly one.
    #[error(
        "events on host `{host}` advance the clock from {first_time} to {second_time}, expected an increase of one: {first} then {second}"
    )]
    ClockIncrement {
        host: String,
        first_time: u64,
        second_time: u64,
        first: EventRef,
        second: EventRef,
    },

    /// A clock entry points at a local time the referenced host never
    /// reached inside the parsed window.
    #[error(
        "{event} references host `{referenced}` at time {time}, outside its observed range {min}..={max}"
    )]
    OutOfBoundsTime {
        event: EventRef,
        referenced: String,
        time: u64,
        min: u64,
        max: u64,
    },

    /// A clock entry names a host with no events of its own. Only reported
    /// when strict host checking is enabled; otherwise the entry is skipped.
    #[error("{event} references host `{referenced}`, which has no events in this execution")]
    UnrecognizedHost { event: EventRef, referenced: String },

    /// The inferred ordering contains a cycle, so the clocks do not describe
    /// a partial order.
    #[error("causal order is cyclic: {remaining} events cannot be ordered")]
    Intransitivity { remaining: usize },

    /// Replaying the graph derives a different clock than the event reports.
    #[error("{event} carries clock {actual}, but its causal history derives {derived}")]
    ImpermissibleClock {
        event: EventRef,
        actual: String,
        derived: String,
    },
}

/// Builds verified [`CausalGraph`]s from parsed events.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder {
    strict_hosts: bool,
}

impl GraphBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            strict_hosts: false,
        }
    }

    /// Fail with [`BuildError::UnrecognizedHost`] instead of skipping clock
    /// entries that reference hosts absent from the execution.
    #[must_use]
    pub const fn strict_hosts(mut self, strict: bool) -> Self {
        self.strict_hosts = strict;
        self
    }

    /// Builds the causal graph for one execution and verifies it against the
    /// parsed clocks.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] when the clocks violate the increment rule,
    /// reference times outside a host's observed window, reference unknown
    /// hosts under [`strict_hosts`](Self::strict_hosts), or fail
    /// verification.
    pub fn build(&self, events: &[LogEvent]) -> Result<CausalGraph, BuildError> {
        let mut graph = CausalGraph::default();
        let mut chains: HashMap<String, Vec<NodeId>> = HashMap::new();
        let mut spans: HashMap<String, (u64, u64)> = HashMap::new();

        for (host, mut host_events) in bucket_by_host(events) {
            host_events.sort_by(|a, b| a.clock.compare_local(&b.clock));
            check_increments(&host, &host_events)?;

            let (Some(first), Some(last)) = (host_events.first(), host_events.last()) else {
                continue;
            };
            let span = (first.local_time(), last.local_time());

            let head = graph.push_node(Node::sentinel(host.clone(), NodeKind::Head));
            let mut ids = Vec::with_capacity(host_events.len());
            let mut prev = head;
            for event in host_events {
                let id = graph.push_node(Node::interior(host.clone(), event));
                graph.link(prev, id);
                ids.push(id);
                prev = id;
            }
            let tail = graph.push_node(Node::sentinel(host.clone(), NodeKind::Tail));
            graph.link(prev, tail);

            graph.register_host(host.clone(), head, tail);
            spans.insert(host.clone(), span);
            chains.insert(host, ids);
        }

        for (parent, child) in self.infer_cross_edges(&graph, &chains, &spans)? {
            graph.add_cross_edge(parent, child);
        }

        verify(&graph)?;
        Ok(graph)
    }

    fn infer_cross_edges(
        &self,
        graph: &CausalGraph,
        chains: &HashMap<String, Vec<NodeId>>,
        spans: &HashMap<String, (u64, u64)>,
    ) -> Result<Vec<(NodeId, NodeId)>, BuildError> {
        let mut edges = Vec::new();
        for host in graph.hosts() {
            let Some(ids) = chains.get(host) else {
                continue;
            };
            // Last known local time per foreign host, advanced by every clock
            // entry whether or not it becomes an edge.
            let mut known: BTreeMap<String, u64> = BTreeMap::new();
            for &id in ids {
                let Some(event) = graph.event(id) else {
                    continue;
                };
                let mut parents: Vec<(NodeId, String, u64)> = Vec::new();
                for (referenced, time) in event.clock.iter() {
                    if referenced == host.as_str() {
                        continue;
                    }
                    if known.get(referenced).copied().unwrap_or(0) >= time {
                        continue;
                    }
                    known.insert(referenced.to_owned(), time);
                    let Some(parent) =
                        self.resolve_reference(chains, spans, event, referenced, time)?
                    else {
                        continue;
                    };
                    parents.push((parent, referenced.to_owned(), time));
                }
                // A candidate is dominated when another candidate's clock
                // already carries its host at or past the referenced time.
                for (parent, referenced, time) in &parents {
                    let dominated = parents.iter().any(|(other, other_host, _)| {
                        other_host != referenced
                            && graph
                                .event(*other)
                                .is_some_and(|other_event| other_event.clock.get(referenced) >= *time)
                    });
                    if !dominated {
                        edges.push((*parent, id));
                    }
                }
            }
        }
        Ok(edges)
    }

    fn resolve_reference(
        &self,
        chains: &HashMap<String, Vec<NodeId>>,
        spans: &HashMap<String, (u64, u64)>,
        event: &LogEvent,
        referenced: &str,
        time: u64,
    ) -> Result<Option<NodeId>, BuildError> {
        let (Some(ids), Some(&(start, last))) = (chains.get(referenced), spans.get(referenced))
        else {
            if self.strict_hosts {
                return Err(BuildError::UnrecognizedHost {
                    event: EventRef::of(event),
                    referenced: referenced.to_owned(),
                });
            }
            warn!(host = referenced, time, "skipping clock reference to unknown host");
            return Ok(None);
        };

        let out_of_bounds = || BuildError::OutOfBoundsTime {
            event: EventRef::of(event),
            referenced: referenced.to_owned(),
            time,
            min: start,
            max: last,
        };
        if time < start || time > last {
            return Err(out_of_bounds());
        }
        usize::try_from(time - start)
            .ok()
            .and_then(|offset| ids.get(offset).copied())
            .ok_or_else(out_of_bounds)
            .map(Some)
    }
}

/// Groups events per host, preserving first-appearance order of hosts.
fn bucket_by_host(events: &[LogEvent]) -> Vec<(String, Vec<LogEvent>)> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<LogEvent>> = HashMap::new();
    for event in events {
        let host = event.host();
        if !buckets.contains_key(host) {
            order.push(host.to_owned());
        }
        buckets
            .entry(host.to_owned())
            .or_default()
            .push(event.clone());
    }
    order
        .into_iter()
        .map(|host| {
            let events = buckets.remove(&host).unwrap_or_default();
            (host, events)
        })
        .collect()
}

fn check_increments(host: &str, events: &[LogEvent]) -> Result<(), BuildError> {
    for pair in events.windows(2) {
        let (first, second) = (&pair[0], &pair[1]);
        if second.local_time() != first.local_time() + 1 {
            return Err(BuildError::ClockIncrement {
                host: host.to_owned(),
                first_time: first.local_time(),
                second_time: second.local_time(),
                first: EventRef::of(first),
                second: EventRef::of(second),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VectorTimestamp;

    fn ev(host: &str, pairs: &[(&str, u64)], text: &str, line: usize) -> LogEvent {
        let clock = VectorTimestamp::from_pairs(host, pairs).expect("valid clock");
        LogEvent::new(text.to_owned(), clock, line)
    }

    #[test]
    fn no_events_builds_an_empty_graph() {
        let graph = GraphBuilder::new().build(&[]).expect("empty build");
        assert_eq!(graph.host_count(), 0);
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn single_host_yields_a_linear_chain() {
        let events = vec![
            ev("solo", &[("solo", 1)], "first", 1),
            ev("solo", &[("solo", 2)], "second", 2),
            ev("solo", &[("solo", 3)], "third", 3),
        ];
        let graph = GraphBuilder::new().build(&events).expect("builds");
        assert_eq!(graph.host_count(), 1);
        assert_eq!(graph.cross_edge_count(), 0);
        let texts: Vec<_> = graph
            .nodes("solo")
            .filter_map(|id| graph.event(id).map(|e| e.text.clone()))
            .collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[test]
    fn events_are_ordered_by_local_time_not_input_order() {
        let events = vec![
            ev("h", &[("h", 2)], "middle", 1),
            ev("h", &[("h", 3)], "last", 2),
            ev("h", &[("h", 1)], "start", 3),
        ];
        let graph = GraphBuilder::new().build(&events).expect("builds");
        let texts: Vec<_> = graph
            .nodes("h")
            .filter_map(|id| graph.event(id).map(|e| e.text.clone()))
            .collect();
        assert_eq!(texts, ["start", "middle", "last"]);
    }

    #[test]
    fn message_exchange_produces_cross_edges() {
        let events = vec![
            ev("h1", &[("h1", 1)], "local work", 1),
            ev("h1", &[("h1", 2), ("h2", 1)], "got m1", 2),
            ev("h2", &[("h2", 1)], "sent m1", 3),
            ev("h2", &[("h2", 2), ("h1", 2)], "got m2", 4),
        ];
        let graph = GraphBuilder::new().build(&events).expect("builds");

        let receive_m1 = graph.last("h1").expect("h1 has events");
        let send_m1 = graph.first("h2").expect("h2 has events");
        let receive_m2 = graph.last("h2").expect("h2 has events");

        assert_eq!(graph.parents(receive_m1), [send_m1]);
        assert_eq!(graph.parents(receive_m2), [receive_m1]);
        assert_eq!(graph.children(receive_m1), [receive_m2]);
        assert_eq!(graph.cross_edge_count(), 2);
    }

    #[test]
    fn window_start_above_one_is_accepted() {
        let events = vec![
            ev("h1", &[("h1", 5)], "resumed", 1),
            ev("h1", &[("h1", 6)], "working", 2),
            ev("h1", &[("h1", 7)], "done", 3),
        ];
        let graph = GraphBuilder::new().build(&events).expect("builds");
        let first = graph.first("h1").expect("first node");
        assert_eq!(graph.event(first).map(LogEvent::local_time), Some(5));
    }

    #[test]
    fn clock_gap_is_an_increment_error() {
        let events = vec![
            ev("h1", &[("h1", 5)], "resumed", 1),
            ev("h1", &[("h1", 7)], "skipped one", 2),
            ev("h1", &[("h1", 8)], "more", 3),
        ];
        let err = GraphBuilder::new().build(&events).expect_err("gap");
        match err {
            BuildError::ClockIncrement {
                host,
                first_time,
                second_time,
                first,
                second,
            } => {
                assert_eq!(host, "h1");
                assert_eq!((first_time, second_time), (5, 7));
                assert_eq!(first.line, 1);
                assert_eq!(second.line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_local_times_are_increment_errors() {
        let events = vec![
            ev("h1", &[("h1", 3)], "one", 1),
            ev("h1", &[("h1", 3)], "again", 2),
        ];
        let err = GraphBuilder::new().build(&events).expect_err("duplicate");
        assert!(matches!(
            err,
            BuildError::ClockIncrement {
                first_time: 3,
                second_time: 3,
                ..
            }
        ));
    }

    #[test]
    fn dominated_references_do_not_become_edges() {
        // a hears about c only through b, so a gets exactly one parent
        let events = vec![
            ev("c", &[("c", 1)], "origin", 1),
            ev("b", &[("b", 1), ("c", 1)], "relay", 2),
            ev("a", &[("a", 1), ("b", 1), ("c", 1)], "sink", 3),
        ];
        let graph = GraphBuilder::new().build(&events).expect("builds");
        let sink = graph.first("a").expect("a has events");
        let parents = graph.parents(sink);
        assert_eq!(parents.len(), 1);
        assert_eq!(graph.host_of(parents[0]), "b");
    }

    #[test]
    fn repeated_references_produce_one_edge() {
        let events = vec![
            ev("h1", &[("h1", 1)], "sent", 1),
            ev("h2", &[("h2", 1), ("h1", 1)], "received", 2),
            ev("h2", &[("h2", 2), ("h1", 1)], "still knows h1", 3),
        ];
        let graph = GraphBuilder::new().build(&events).expect("builds");
        let received = graph.first("h2").expect("h2 has events");
        let later = graph.last("h2").expect("h2 has events");
        assert_eq!(graph.parents(received).len(), 1);
        assert!(graph.parents(later).is_empty());
        assert_eq!(graph.cross_edge_count(), 1);
    }

    #[test]
    fn unknown_host_references_are_skipped_by_default() {
        let events = vec![
            ev("h1", &[("h1", 1)], "start", 1),
            ev("h1", &[("h1", 2), ("ghost", 4)], "mentions ghost", 2),
        ];
        let graph = GraphBuilder::new().build(&events).expect("lenient build");
        assert_eq!(graph.host_count(), 1);
        assert_eq!(graph.cross_edge_count(), 0);
    }

    #[test]
    fn strict_mode_rejects_unknown_hosts() {
        let events = vec![
            ev("h1", &[("h1", 1)], "start", 1),
            ev("h1", &[("h1", 2), ("ghost", 4)], "mentions ghost", 2),
        ];
        let err = GraphBuilder::new()
            .strict_hosts(true)
            .build(&events)
            .expect_err("strict");
        match err {
            BuildError::UnrecognizedHost { event, referenced } => {
                assert_eq!(referenced, "ghost");
                assert_eq!(event.line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reference_below_the_observed_window_is_out_of_bounds() {
        let events = vec![
            ev("h1", &[("h1", 5)], "late start", 1),
            ev("h1", &[("h1", 6)], "more", 2),
            ev("h2", &[("h2", 1), ("h1", 2)], "stale reference", 3),
        ];
        let err = GraphBuilder::new().build(&events).expect_err("below window");
        match err {
            BuildError::OutOfBoundsTime {
                referenced,
                time,
                min,
                max,
                ..
            } => {
                assert_eq!(referenced, "h1");
                assert_eq!(time, 2);
                assert_eq!((min, max), (5, 6));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reference_past_the_observed_window_is_out_of_bounds() {
        let events = vec![
            ev("h1", &[("h1", 1)], "only event", 1),
            ev("h2", &[("h2", 1), ("h1", 3)], "from the future", 2),
        ];
        let err = GraphBuilder::new().build(&events).expect_err("past window");
        assert!(matches!(
            err,
            BuildError::OutOfBoundsTime { time: 3, max: 1, .. }
        ));
    }
}
