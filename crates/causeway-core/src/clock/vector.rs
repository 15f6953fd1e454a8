//! Vector timestamps attached to parsed log events.
//!
//! A vector timestamp maps host ids to logical counters and names the host
//! that produced it. It captures the causal partial order of a distributed
//! execution: two events are either ordered (happened-before) or concurrent,
//! and no false total order is imposed.
//!
//! Unlike a live clock that gets incremented as a process runs, these values
//! are reconstructed from log text. Every entry is therefore at least 1 (a
//! host that has done nothing simply has no entry) and the owning host always
//! carries its own entry. The graph builder re-derives each timestamp from
//! graph structure during verification, so no mutating API is offered here.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

/// Result of comparing two vector timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CausalOrder {
    /// `self` happened strictly before `other`.
    Before,
    /// `self` happened strictly after `other`.
    After,
    /// The two entry maps are identical.
    Equal,
    /// Neither happened before the other.
    Concurrent,
}

/// Invariant violations caught at construction time.
///
/// Parsing wraps these in a line-annotated error; see [`super::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTimestamp {
    /// The owning host has no entry in its own clock.
    #[error("host '{owner}' has no entry in its own clock")]
    MissingOwnerEntry {
        /// Host that should have carried an entry.
        owner: String,
    },
    /// An entry was zero. Logical times start at 1.
    #[error("clock entry for host '{host}' must be a positive integer")]
    NonPositiveEntry {
        /// Host whose entry was invalid.
        host: String,
    },
}

/// An immutable vector timestamp: host id → last known local time, plus the
/// host that recorded it.
///
/// The partial order is the usual one:
/// - `a <= b` iff every component of `a` is `<=` the matching component of `b`
///   (missing components count as 0)
/// - `a` happened-before `b` iff `a <= b` and the maps differ
/// - `a` and `b` are concurrent iff neither `a <= b` nor `b <= a`
///
/// Equality, and therefore [`CausalOrder::Equal`], is over the entry maps
/// only. The owner is provenance: it says which host's log line the value was
/// read from, not anything causal.
#[derive(Debug, Clone, Eq, Serialize)]
pub struct VectorTimestamp {
    /// Host that recorded this timestamp.
    owner: String,
    /// Host id → that host's local time as last known by the owner.
    /// BTreeMap for deterministic iteration and rendering.
    entries: BTreeMap<String, u64>,
}

impl VectorTimestamp {
    /// Builds a timestamp from an owner and a complete entry map.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTimestamp`] if any entry is zero or the owner has no
    /// entry.
    pub fn new(
        owner: impl Into<String>,
        entries: BTreeMap<String, u64>,
    ) -> Result<Self, InvalidTimestamp> {
        let owner = owner.into();
        for (host, &time) in &entries {
            if time == 0 {
                return Err(InvalidTimestamp::NonPositiveEntry { host: host.clone() });
            }
        }
        if !entries.contains_key(&owner) {
            return Err(InvalidTimestamp::MissingOwnerEntry { owner });
        }
        Ok(Self { owner, entries })
    }

    /// Convenience constructor from `(host, time)` pairs.
    ///
    /// # Errors
    ///
    /// Same conditions as [`VectorTimestamp::new`].
    pub fn from_pairs(owner: &str, pairs: &[(&str, u64)]) -> Result<Self, InvalidTimestamp> {
        let entries = pairs
            .iter()
            .map(|&(host, time)| (host.to_owned(), time))
            .collect();
        Self::new(owner, entries)
    }

    /// Host that recorded this timestamp.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The owner's own local time.
    #[must_use]
    pub fn own_time(&self) -> u64 {
        // Constructor guarantees the owner entry exists.
        self.entries.get(&self.owner).copied().unwrap_or(0)
    }

    /// Last known time for `host`, 0 if the host has no entry.
    #[must_use]
    pub fn get(&self, host: &str) -> u64 {
        self.entries.get(host).copied().unwrap_or(0)
    }

    /// Whether `host` has an entry.
    #[must_use]
    pub fn contains(&self, host: &str) -> bool {
        self.entries.contains_key(host)
    }

    /// Number of hosts with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the map is empty. Cannot occur for parsed timestamps, which
    /// always carry the owner entry, but merge targets built in tests may be
    /// constructed empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(host, time)` pairs in host order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(host, &time)| (host.as_str(), time))
    }

    /// The raw entry map.
    #[must_use]
    pub const fn entries(&self) -> &BTreeMap<String, u64> {
        &self.entries
    }

    // =========================================================================
    // Comparison
    // =========================================================================

    /// Compares two timestamps under the causal partial order.
    ///
    /// `causal_order(a, b)` and `causal_order(b, a)` are always inverses of
    /// one another, and `causal_order(a, a)` is [`CausalOrder::Equal`].
    #[must_use]
    pub fn causal_order(&self, other: &Self) -> CausalOrder {
        let mut self_leq_other = true;
        let mut other_leq_self = true;

        let all_hosts: BTreeSet<&String> =
            self.entries.keys().chain(other.entries.keys()).collect();

        for host in all_hosts {
            let a = self.get(host);
            let b = other.get(host);
            if a > b {
                self_leq_other = false;
            }
            if b > a {
                other_leq_self = false;
            }
            if !self_leq_other && !other_leq_self {
                return CausalOrder::Concurrent;
            }
        }

        match (self_leq_other, other_leq_self) {
            (true, true) => CausalOrder::Equal,
            (true, false) => CausalOrder::Before,
            (false, true) => CausalOrder::After,
            (false, false) => CausalOrder::Concurrent,
        }
    }

    /// Compares only the own-host components of two timestamps.
    ///
    /// This is the order used to sequence events of a single host: for two
    /// timestamps recorded by the same host, the one with the smaller own
    /// time came first. Foreign entries are ignored entirely.
    #[must_use]
    pub fn compare_local(&self, other: &Self) -> Ordering {
        self.own_time().cmp(&other.own_time())
    }

    /// True if `self` happened strictly before `other`.
    #[must_use]
    pub fn happened_before(&self, other: &Self) -> bool {
        self.causal_order(other) == CausalOrder::Before
    }

    /// True if neither timestamp happened before the other.
    #[must_use]
    pub fn is_concurrent_with(&self, other: &Self) -> bool {
        self.causal_order(other) == CausalOrder::Concurrent
    }

    // =========================================================================
    // Merge
    // =========================================================================

    /// Returns the pointwise maximum of the two entry maps.
    ///
    /// This is the least upper bound of the partial order. The owner stays
    /// `self.owner`, and the owner's component comes out as the larger of the
    /// two owner times. The +1 increments that accompany real message
    /// receives happen in the graph builder, never here.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (host, &time) in &other.entries {
            let entry = merged.entries.entry(host.clone()).or_insert(0);
            if time > *entry {
                *entry = time;
            }
        }
        merged
    }
}

/// Equality is over the entry maps only; see the type-level docs.
impl PartialEq for VectorTimestamp {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

/// The causal partial order. Answers `None` when the timestamps are
/// concurrent (incomparable).
impl PartialOrd for VectorTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.causal_order(other) {
            CausalOrder::Before => Some(Ordering::Less),
            CausalOrder::After => Some(Ordering::Greater),
            CausalOrder::Equal => Some(Ordering::Equal),
            CausalOrder::Concurrent => None,
        }
    }
}

impl fmt::Display for VectorTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (host, time)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{host}={time}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(owner: &str, pairs: &[(&str, u64)]) -> VectorTimestamp {
        VectorTimestamp::from_pairs(owner, pairs).expect("valid timestamp")
    }

    #[test]
    fn new_rejects_zero_entry() {
        let err = VectorTimestamp::from_pairs("a", &[("a", 1), ("b", 0)]).unwrap_err();
        assert_eq!(err, InvalidTimestamp::NonPositiveEntry { host: "b".into() });
    }

    #[test]
    fn new_rejects_missing_owner() {
        let err = VectorTimestamp::from_pairs("a", &[("b", 2)]).unwrap_err();
        assert_eq!(err, InvalidTimestamp::MissingOwnerEntry { owner: "a".into() });
    }

    #[test]
    fn own_time_reads_owner_entry() {
        let t = ts("node-1", &[("node-1", 4), ("node-2", 2)]);
        assert_eq!(t.owner(), "node-1");
        assert_eq!(t.own_time(), 4);
        assert_eq!(t.get("node-2"), 2);
        assert_eq!(t.get("node-3"), 0);
        assert!(t.contains("node-2"));
        assert!(!t.contains("node-3"));
    }

    #[test]
    fn identical_maps_compare_equal() {
        let a = ts("a", &[("a", 1), ("b", 2)]);
        let b = ts("b", &[("a", 1), ("b", 2)]);
        // Same map, different owner: causally equal.
        assert_eq!(a.causal_order(&b), CausalOrder::Equal);
        assert_eq!(a, b);
        assert_eq!(a.partial_cmp(&b), Some(Ordering::Equal));
    }

    #[test]
    fn strict_dominance_is_before() {
        let early = ts("a", &[("a", 1)]);
        let late = ts("a", &[("a", 2), ("b", 1)]);
        assert_eq!(early.causal_order(&late), CausalOrder::Before);
        assert_eq!(late.causal_order(&early), CausalOrder::After);
        assert!(early.happened_before(&late));
        assert_eq!(early.partial_cmp(&late), Some(Ordering::Less));
    }

    #[test]
    fn concurrent_detection() {
        let a = ts("a", &[("a", 2), ("b", 1)]);
        let b = ts("b", &[("a", 1), ("b", 2)]);
        assert_eq!(a.causal_order(&b), CausalOrder::Concurrent);
        assert!(a.is_concurrent_with(&b));
        assert_eq!(a.partial_cmp(&b), None);
    }

    #[test]
    fn missing_entries_count_as_zero() {
        let a = ts("a", &[("a", 1)]);
        let b = ts("b", &[("a", 1), ("b", 1)]);
        assert_eq!(a.causal_order(&b), CausalOrder::Before);
    }

    #[test]
    fn compare_is_inverse_of_swapped_compare() {
        let cases = [
            (ts("a", &[("a", 1)]), ts("a", &[("a", 2)])),
            (ts("a", &[("a", 2), ("b", 1)]), ts("b", &[("b", 2)])),
            (ts("a", &[("a", 3)]), ts("b", &[("a", 3)])),
        ];
        for (x, y) in cases {
            let expected = match x.causal_order(&y) {
                CausalOrder::Before => CausalOrder::After,
                CausalOrder::After => CausalOrder::Before,
                order @ (CausalOrder::Equal | CausalOrder::Concurrent) => order,
            };
            assert_eq!(y.causal_order(&x), expected);
        }
    }

    #[test]
    fn compare_local_ignores_foreign_entries() {
        let a = ts("h", &[("h", 2)]);
        let b = ts("h", &[("h", 1), ("x", 99)]);
        // Causally concurrent, but locally ordered by own time.
        assert_eq!(a.compare_local(&b), Ordering::Greater);
        assert_eq!(b.compare_local(&a), Ordering::Less);
        assert_eq!(a.compare_local(&a), Ordering::Equal);
    }

    #[test]
    fn merge_is_pointwise_max() {
        let a = ts("a", &[("a", 2), ("c", 5)]);
        let b = ts("b", &[("a", 1), ("b", 3), ("c", 7)]);
        let m = a.merge(&b);
        assert_eq!(m.owner(), "a");
        assert_eq!(m.get("a"), 2);
        assert_eq!(m.get("b"), 3);
        assert_eq!(m.get("c"), 7);
        // Both inputs precede or equal the merge.
        assert_ne!(a.causal_order(&m), CausalOrder::After);
        assert_ne!(b.causal_order(&m), CausalOrder::After);
    }

    #[test]
    fn merge_keeps_larger_owner_time() {
        let a = ts("a", &[("a", 1)]);
        let b = ts("b", &[("a", 4), ("b", 1)]);
        let m = a.merge(&b);
        assert_eq!(m.owner(), "a");
        assert_eq!(m.own_time(), 4);
    }

    #[test]
    fn display_renders_sorted_entries() {
        let t = ts("b", &[("b", 2), ("a", 1)]);
        assert_eq!(t.to_string(), "{a=1, b=2}");
    }
}
