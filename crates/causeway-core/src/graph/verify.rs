//! Graph verification.
//!
//! A well-formed graph must be able to reproduce the clocks it was built
//! from: walk the nodes in topological order, carry each host's state
//! forward along its chain, merge in the state of every cross-host parent,
//! and bump the host's own entry once per event. If the walk stalls the
//! order has a cycle; if a replayed clock differs from the parsed one, the
//! log's clocks are internally inconsistent.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::error::EventRef;
use crate::event::LogEvent;

use super::build::BuildError;
use super::{CausalGraph, NodeId, NodeKind};

/// Replays the graph and returns the derived clock for every event node.
///
/// Head sentinels seed each host just before its first observed time, so
/// executions whose window starts above one replay correctly.
///
/// # Errors
///
/// Returns [`BuildError::Intransitivity`] when the walk cannot order every
/// node, i.e. the edges contain a cycle.
pub fn derive_clocks(
    graph: &CausalGraph,
) -> Result<HashMap<NodeId, BTreeMap<String, u64>>, BuildError> {
    let total = graph.arena_len();
    let mut indegree: Vec<usize> = (0..total)
        .map(|index| {
            let node = graph.node(NodeId::new(index));
            usize::from(node.prev.is_some()) + node.parents.len()
        })
        .collect();

    let mut derived: HashMap<NodeId, BTreeMap<String, u64>> = HashMap::with_capacity(total);
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    for host in graph.hosts() {
        let Some(head) = graph.head(host) else {
            continue;
        };
        let first_time = graph
            .first(host)
            .and_then(|id| graph.event(id))
            .map(LogEvent::local_time);
        if let Some(first_time) = first_time {
            derived.insert(
                head,
                BTreeMap::from([(host.clone(), first_time.saturating_sub(1))]),
            );
        }
        queue.push_back(head);
    }

    let mut visited = 0_usize;
    while let Some(id) = queue.pop_front() {
        visited += 1;
        let node = graph.node(id);
        if node.kind == NodeKind::Interior {
            let mut clock = node
                .prev
                .and_then(|prev| derived.get(&prev))
                .cloned()
                .unwrap_or_default();
            for parent in &node.parents {
                if let Some(parent_clock) = derived.get(parent) {
                    for (host, &time) in parent_clock {
                        let entry = clock.entry(host.clone()).or_insert(0);
                        *entry = (*entry).max(time);
                    }
                }
            }
            *clock.entry(node.host.clone()).or_insert(0) += 1;
            derived.insert(id, clock);
        }
        for successor in node.next.into_iter().chain(node.children.iter().copied()) {
            let slot = &mut indegree[successor.index()];
            *slot -= 1;
            if *slot == 0 {
                queue.push_back(successor);
            }
        }
    }

    if visited != total {
        let remaining = graph
            .iter_nodes()
            .filter(|id| !derived.contains_key(id))
            .count();
        return Err(BuildError::Intransitivity { remaining });
    }
    derived.retain(|id, _| !graph.is_sentinel(*id));
    Ok(derived)
}

/// Checks that replaying the graph reproduces every event's clock exactly.
///
/// Clock entries naming hosts absent from the graph are ignored, matching
/// the builder's lenient treatment of unknown hosts.
///
/// # Errors
///
/// Returns [`BuildError::Intransitivity`] for cyclic orders and
/// [`BuildError::ImpermissibleClock`] for the first event whose replayed
/// clock differs from the parsed one.
pub fn verify(graph: &CausalGraph) -> Result<(), BuildError> {
    let derived = derive_clocks(graph)?;
    for host in graph.hosts() {
        for id in graph.nodes(host) {
            let Some(event) = graph.event(id) else {
                continue;
            };
            let Some(derived_clock) = derived.get(&id) else {
                continue;
            };
            let logged: BTreeMap<String, u64> = event
                .clock
                .iter()
                .filter(|&(entry_host, _)| graph.head(entry_host).is_some())
                .map(|(entry_host, time)| (entry_host.to_owned(), time))
                .collect();
            if *derived_clock != logged {
                return Err(BuildError::ImpermissibleClock {
                    event: EventRef::of(event),
                    actual: event.clock.to_string(),
                    derived: format_clock(derived_clock),
                });
            }
        }
    }
    Ok(())
}

fn format_clock(entries: &BTreeMap<String, u64>) -> String {
    let body = entries
        .iter()
        .map(|(host, time)| format!("{host}={time}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}
