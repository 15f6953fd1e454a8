//! The causal graph: per-host event chains joined by inferred cross-host
//! communication edges.
//!
//! Nodes live in an arena (`Vec`) and are addressed by copyable [`NodeId`]
//! handles, so the doubly linked chains and the parent/child edge lists never
//! fight over ownership. Each host's chain runs from a head sentinel through
//! its events in local-time order to a tail sentinel; cross-host edges
//! connect interior nodes only.
//!
//! A graph is immutable once built: it is only ever produced by
//! [`GraphBuilder`], which verifies the structure against the parsed clocks
//! before handing it out. `Clone` produces a fully independent copy (the
//! arena owns everything), with the same `NodeId`s valid in the copy.
//!
//! `NodeId`s are only meaningful for the graph (or clone) that produced them.

pub mod build;
pub mod verify;

pub use build::{BuildError, GraphBuilder};
pub use verify::{derive_clocks, verify};

use std::collections::HashMap;

use serde::Serialize;

use crate::event::LogEvent;

/// Handle to a node in a [`CausalGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Head,
    Interior,
    Tail,
}

/// Arena payload. Interior nodes carry events; sentinels carry none.
///
/// A node's event list is a coalesced group: the builder always produces one
/// event per interior node, but the read API exposes a slice so that callers
/// collapsing chains can keep the same shape.
#[derive(Debug, Clone)]
struct Node {
    host: String,
    kind: NodeKind,
    events: Vec<LogEvent>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn sentinel(host: String, kind: NodeKind) -> Self {
        Self {
            host,
            kind,
            events: Vec::new(),
            prev: None,
            next: None,
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    fn interior(host: String, event: LogEvent) -> Self {
        Self {
            host,
            kind: NodeKind::Interior,
            events: vec![event],
            prev: None,
            next: None,
            parents: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Summary counts for one verified graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Hosts with at least one event.
    pub hosts: usize,
    /// Total events across all nodes.
    pub events: usize,
    /// Inferred cross-host communication edges.
    pub cross_edges: usize,
}

/// A verified causal graph for one execution.
#[derive(Debug, Clone, Default)]
pub struct CausalGraph {
    nodes: Vec<Node>,
    /// Hosts in order of first appearance in the parsed event sequence.
    hosts: Vec<String>,
    heads: HashMap<String, NodeId>,
    tails: HashMap<String, NodeId>,
}

impl CausalGraph {
    /// Builds and verifies a graph with default options.
    ///
    /// # Errors
    ///
    /// See [`GraphBuilder::build`].
    pub fn from_events(events: &[LogEvent]) -> Result<Self, BuildError> {
        GraphBuilder::new().build(events)
    }

    // =========================================================================
    // Read API
    // =========================================================================

    /// Hosts in first-appearance order.
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Number of hosts.
    #[must_use]
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Number of interior (event-carrying) nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.kind == NodeKind::Interior)
            .count()
    }

    /// Total events across all nodes.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.nodes.iter().map(|node| node.events.len()).sum()
    }

    /// The head sentinel of `host`'s chain.
    #[must_use]
    pub fn head(&self, host: &str) -> Option<NodeId> {
        self.heads.get(host).copied()
    }

    /// The tail sentinel of `host`'s chain.
    #[must_use]
    pub fn tail(&self, host: &str) -> Option<NodeId> {
        self.tails.get(host).copied()
    }

    /// `host`'s earliest event node.
    #[must_use]
    pub fn first(&self, host: &str) -> Option<NodeId> {
        self.head(host).and_then(|head| self.next(head))
    }

    /// `host`'s latest event node.
    #[must_use]
    pub fn last(&self, host: &str) -> Option<NodeId> {
        self.tail(host).and_then(|tail| self.prev(tail))
    }

    /// The next interior node on the same host chain, `None` at the end.
    #[must_use]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        let next = self.node(id).next?;
        (self.node(next).kind == NodeKind::Interior).then_some(next)
    }

    /// The previous interior node on the same host chain, `None` at the
    /// start.
    #[must_use]
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        let prev = self.node(id).prev?;
        (self.node(prev).kind == NodeKind::Interior).then_some(prev)
    }

    /// Cross-host parents of `id` (nodes it directly learned from).
    #[must_use]
    pub fn parents(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).parents
    }

    /// Cross-host children of `id` (nodes that directly learned from it).
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Host the node belongs to.
    #[must_use]
    pub fn host_of(&self, id: NodeId) -> &str {
        &self.node(id).host
    }

    /// Events carried by the node; empty for sentinels.
    #[must_use]
    pub fn events(&self, id: NodeId) -> &[LogEvent] {
        &self.node(id).events
    }

    /// The node's first event, `None` for sentinels.
    #[must_use]
    pub fn event(&self, id: NodeId) -> Option<&LogEvent> {
        self.node(id).events.first()
    }

    /// True for head and tail sentinels.
    #[must_use]
    pub fn is_sentinel(&self, id: NodeId) -> bool {
        self.node(id).kind != NodeKind::Interior
    }

    /// Walks `host`'s interior chain in local-time order.
    pub fn nodes(&self, host: &str) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.first(host), move |&id| self.next(id))
    }

    /// All interior nodes, in arena order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len())
            .map(NodeId::new)
            .filter(move |&id| self.node(id).kind == NodeKind::Interior)
    }

    /// All cross-host edges as `(parent, child)` pairs.
    pub fn cross_edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.iter_nodes().flat_map(move |parent| {
            self.children(parent)
                .iter()
                .map(move |&child| (parent, child))
        })
    }

    /// Number of cross-host edges.
    #[must_use]
    pub fn cross_edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.children.len()).sum()
    }

    /// Summary counts.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            hosts: self.host_count(),
            events: self.event_count(),
            cross_edges: self.cross_edge_count(),
        }
    }

    // =========================================================================
    // Construction (builder-internal)
    // =========================================================================

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn link(&mut self, prev: NodeId, next: NodeId) {
        self.nodes[prev.index()].next = Some(next);
        self.nodes[next.index()].prev = Some(prev);
    }

    fn add_cross_edge(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parents.push(parent);
    }

    fn register_host(&mut self, host: String, head: NodeId, tail: NodeId) {
        self.heads.insert(host.clone(), head);
        self.tails.insert(host.clone(), tail);
        self.hosts.push(host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VectorTimestamp;

    fn ev(host: &str, pairs: &[(&str, u64)], text: &str, line: usize) -> LogEvent {
        let clock = VectorTimestamp::from_pairs(host, pairs).expect("valid clock");
        LogEvent::new(text.to_owned(), clock, line)
    }

    /// Two hosts, one message each way.
    fn two_host_events() -> Vec<LogEvent> {
        vec![
            ev("h1", &[("h1", 1)], "local work", 1),
            ev("h1", &[("h1", 2), ("h2", 1)], "got m1", 2),
            ev("h2", &[("h2", 1)], "sent m1", 3),
            ev("h2", &[("h2", 2), ("h1", 2)], "got m2", 4),
        ]
    }

    #[test]
    fn empty_graph_default() {
        let g = CausalGraph::default();
        assert_eq!(g.host_count(), 0);
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.cross_edge_count(), 0);
        assert!(g.head("anything").is_none());
    }

    #[test]
    fn hosts_follow_first_appearance_order() {
        let events = vec![
            ev("zeta", &[("zeta", 1)], "z1", 1),
            ev("alpha", &[("alpha", 1)], "a1", 2),
            ev("zeta", &[("zeta", 2)], "z2", 3),
        ];
        let g = CausalGraph::from_events(&events).expect("graph should build");
        assert_eq!(g.hosts(), ["zeta".to_owned(), "alpha".to_owned()]);
    }

    #[test]
    fn chain_traversal_skips_sentinels() {
        let events = two_host_events();
        let g = CausalGraph::from_events(&events).expect("graph should build");

        let head = g.head("h1").expect("head exists");
        let tail = g.tail("h1").expect("tail exists");
        assert!(g.is_sentinel(head));
        assert!(g.is_sentinel(tail));
        assert!(g.events(head).is_empty());

        let first = g.first("h1").expect("first event node");
        let second = g.next(first).expect("second event node");
        assert_eq!(g.event(first).map(|e| e.text.as_str()), Some("local work"));
        assert_eq!(g.event(second).map(|e| e.text.as_str()), Some("got m1"));
        assert!(g.next(second).is_none());
        assert_eq!(g.prev(second), Some(first));
        assert!(g.prev(first).is_none());
        assert_eq!(g.last("h1"), Some(second));
    }

    #[test]
    fn nodes_iterator_walks_one_host_chain() {
        let events = two_host_events();
        let g = CausalGraph::from_events(&events).expect("graph should build");
        let texts: Vec<_> = g
            .nodes("h2")
            .filter_map(|id| g.event(id).map(|e| e.text.clone()))
            .collect();
        assert_eq!(texts, vec!["sent m1", "got m2"]);
    }

    #[test]
    fn stats_count_hosts_events_edges() {
        let events = two_host_events();
        let g = CausalGraph::from_events(&events).expect("graph should build");
        assert_eq!(
            g.stats(),
            GraphStats {
                hosts: 2,
                events: 4,
                cross_edges: 2,
            }
        );
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.cross_edges().count(), 2);
    }

    #[test]
    fn clone_is_structurally_equal_and_disjoint() {
        let events = two_host_events();
        let g = CausalGraph::from_events(&events).expect("graph should build");
        let copy = g.clone();

        assert_eq!(copy.node_count(), g.node_count());
        assert_eq!(copy.hosts(), g.hosts());
        let original_edges: Vec<_> = g.cross_edges().collect();
        let copied_edges: Vec<_> = copy.cross_edges().collect();
        assert_eq!(original_edges, copied_edges);

        // Same NodeIds resolve in the copy, but to distinct storage.
        let first = g.first("h1").expect("first node");
        assert_eq!(g.events(first), copy.events(first));
        assert_ne!(g.events(first).as_ptr(), copy.events(first).as_ptr());
    }
}
