//! Local stemma: per-unit DAG of reading priority with closure query.
//!
//! The stemma is authored by the editor and arrives as a vertex list plus
//! directed prior→posterior edges. Construction applies three
//! transformations — trivial collapse, split merge, dropped-reading
//! removal — and then materializes the reflexive-transitive closure, so
//! that [`LocalStemma::is_equal_or_prior`] is a constant-time probe for
//! every consumer on the hot path.

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

use crate::dot;
use crate::error::CbgmError;
use crate::types::ReadingId;

/// A directed priority edge: `prior` is the source of `posterior`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StemmaEdge {
    /// The prior (ancestral) reading.
    pub prior: ReadingId,
    /// The posterior (derived) reading.
    pub posterior: ReadingId,
}

/// Per-unit priority DAG over readings, with its reflexive-transitive
/// closure materialized at construction.
///
/// The closure is stored as one reachability bitmap per vertex over dense
/// vertex indices; `(a, b)` is in the closure iff reading `a` is equal or
/// prior to reading `b`. Dropped readings never enter the closure.
#[derive(Debug, Clone)]
pub struct LocalStemma {
    label: String,
    vertices: Vec<ReadingId>,
    edges: Vec<StemmaEdge>,
    index: BTreeMap<ReadingId, u32>,
    closure: Vec<RoaringBitmap>,
}

impl LocalStemma {
    /// Build a stemma from a parsed graph.
    ///
    /// `trivial` maps sub-variant readings to their canonical forms; edge
    /// endpoints are rewritten through it and resulting self-loops are
    /// discarded. `split_pairs` gain bidirectional edges so each member is
    /// equal-or-prior to the other. Edges touching `dropped` readings are
    /// discarded before collapse.
    ///
    /// Returns `InputMalformed` if an edge references a reading absent
    /// from the vertex list.
    pub fn new(
        label: impl Into<String>,
        vertices: &[ReadingId],
        edges: &[(ReadingId, ReadingId)],
        trivial: &BTreeMap<ReadingId, ReadingId>,
        split_pairs: &BTreeSet<(ReadingId, ReadingId)>,
        dropped: &BTreeSet<ReadingId>,
    ) -> Result<Self, CbgmError> {
        let label = label.into();

        // Chase the trivial map to a canonical form, bounded so a
        // malformed cyclic map cannot hang.
        let resolve = |r: &ReadingId| -> ReadingId {
            let mut current = r.clone();
            for _ in 0..=trivial.len() {
                match trivial.get(&current) {
                    Some(next) => current = next.clone(),
                    None => break,
                }
            }
            current
        };

        let mut collapsed_vertices: Vec<ReadingId> = Vec::new();
        let mut index: BTreeMap<ReadingId, u32> = BTreeMap::new();
        for vertex in vertices {
            if dropped.contains(vertex) {
                continue;
            }
            let canonical = resolve(vertex);
            if !index.contains_key(&canonical) {
                index.insert(canonical.clone(), collapsed_vertices.len() as u32);
                collapsed_vertices.push(canonical);
            }
        }

        let mut collapsed_edges: Vec<StemmaEdge> = Vec::new();
        let mut seen_edges: BTreeSet<(ReadingId, ReadingId)> = BTreeSet::new();
        let mut push_edge = |prior: ReadingId,
                             posterior: ReadingId,
                             collapsed_edges: &mut Vec<StemmaEdge>|
         -> Result<(), CbgmError> {
            if prior == posterior {
                return Ok(());
            }
            for endpoint in [&prior, &posterior] {
                if !index.contains_key(endpoint) {
                    return Err(CbgmError::InputMalformed(format!(
                        "stemma edge of unit {:?} references unknown reading {}",
                        label, endpoint
                    )));
                }
            }
            if seen_edges.insert((prior.clone(), posterior.clone())) {
                collapsed_edges.push(StemmaEdge { prior, posterior });
            }
            Ok(())
        };

        for (prior, posterior) in edges {
            if dropped.contains(prior) || dropped.contains(posterior) {
                continue;
            }
            push_edge(resolve(prior), resolve(posterior), &mut collapsed_edges)?;
        }
        for (left, right) in split_pairs {
            if dropped.contains(left) || dropped.contains(right) {
                continue;
            }
            let (left, right) = (resolve(left), resolve(right));
            push_edge(left.clone(), right.clone(), &mut collapsed_edges)?;
            push_edge(right, left, &mut collapsed_edges)?;
        }

        let closure = compute_closure(collapsed_vertices.len(), &collapsed_edges, &index);

        Ok(Self {
            label,
            vertices: collapsed_vertices,
            edges: collapsed_edges,
            index,
            closure,
        })
    }

    /// The display label of this stemma.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Collapsed, non-dropped vertices in insertion order.
    pub fn vertices(&self) -> &[ReadingId] {
        &self.vertices
    }

    /// Collapsed edges in insertion order.
    pub fn edges(&self) -> &[StemmaEdge] {
        &self.edges
    }

    /// Whether a reading survived collapse and drop.
    pub fn contains(&self, reading: &str) -> bool {
        self.index.contains_key(reading)
    }

    /// True iff reading `a` is equal or prior to reading `b`.
    ///
    /// Readings outside the collapsed vertex set (dropped or unknown) are
    /// never equal-or-prior to anything.
    pub fn is_equal_or_prior(&self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => self.closure[ia as usize].contains(ib),
            _ => false,
        }
    }

    /// Write the stemma as a labeled digraph in DOT syntax.
    pub fn to_dot(&self, out: &mut impl Write) -> io::Result<()> {
        dot::open_digraph(out, "local_stemma", &self.label)?;
        for (i, vertex) in self.vertices.iter().enumerate() {
            writeln!(out, "\t{} [label=\"{}\"];", i, dot::escape(vertex.as_str()))?;
        }
        for edge in &self.edges {
            let prior = self.index[&edge.prior];
            let posterior = self.index[&edge.posterior];
            writeln!(out, "\t{} -> {};", prior, posterior)?;
        }
        dot::close_digraph(out)
    }
}

/// Reflexive-transitive closure by bounded fixpoint.
///
/// Each pass propagates every edge's posterior reachability into its
/// prior; the longest path has fewer vertices than the graph, so the loop
/// is bounded by the vertex count even on (malformed) cyclic input.
fn compute_closure(
    n: usize,
    edges: &[StemmaEdge],
    index: &BTreeMap<ReadingId, u32>,
) -> Vec<RoaringBitmap> {
    let mut closure: Vec<RoaringBitmap> = (0..n)
        .map(|i| {
            let mut bits = RoaringBitmap::new();
            bits.insert(i as u32);
            bits
        })
        .collect();

    let edge_indices: Vec<(u32, u32)> = edges
        .iter()
        .map(|e| (index[&e.prior], index[&e.posterior]))
        .collect();

    for _ in 0..n {
        let mut changed = false;
        for &(prior, posterior) in &edge_indices {
            let reachable = closure[posterior as usize].clone();
            let before = closure[prior as usize].len();
            closure[prior as usize] |= reachable;
            if closure[prior as usize].len() != before {
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    closure
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rids(ids: &[&str]) -> Vec<ReadingId> {
        ids.iter().map(|s| ReadingId::from(*s)).collect()
    }

    fn edges(pairs: &[(&str, &str)]) -> Vec<(ReadingId, ReadingId)> {
        pairs
            .iter()
            .map(|(a, b)| (ReadingId::from(*a), ReadingId::from(*b)))
            .collect()
    }

    fn no_trivial() -> BTreeMap<ReadingId, ReadingId> {
        BTreeMap::new()
    }

    fn no_splits() -> BTreeSet<(ReadingId, ReadingId)> {
        BTreeSet::new()
    }

    fn no_dropped() -> BTreeSet<ReadingId> {
        BTreeSet::new()
    }

    #[test]
    fn test_reflexive_and_transitive() {
        let stemma = LocalStemma::new(
            "u1",
            &rids(&["a", "b", "c"]),
            &edges(&[("a", "b"), ("b", "c")]),
            &no_trivial(),
            &no_splits(),
            &no_dropped(),
        )
        .unwrap();

        assert!(stemma.is_equal_or_prior("a", "a"));
        assert!(stemma.is_equal_or_prior("a", "b"));
        assert!(stemma.is_equal_or_prior("a", "c"));
        assert!(stemma.is_equal_or_prior("b", "c"));
        assert!(!stemma.is_equal_or_prior("c", "a"));
        assert!(!stemma.is_equal_or_prior("b", "a"));
    }

    #[test]
    fn test_trivial_collapse() {
        // Vertices {a, b, bf, c, co}, edges {a→b, a→c, b→bf, c→co},
        // collapse {bf↦b, co↦c} leaves {a, b, c} with {a→b, a→c}.
        let mut trivial = BTreeMap::new();
        trivial.insert(ReadingId::from("bf"), ReadingId::from("b"));
        trivial.insert(ReadingId::from("co"), ReadingId::from("c"));

        let stemma = LocalStemma::new(
            "u2",
            &rids(&["a", "b", "bf", "c", "co"]),
            &edges(&[("a", "b"), ("a", "c"), ("b", "bf"), ("c", "co")]),
            &trivial,
            &no_splits(),
            &no_dropped(),
        )
        .unwrap();

        assert_eq!(stemma.vertices(), &rids(&["a", "b", "c"])[..]);
        assert_eq!(stemma.edges().len(), 2);
        assert!(stemma.is_equal_or_prior("a", "b"));
        assert!(stemma.is_equal_or_prior("a", "a"));
        assert!(!stemma.is_equal_or_prior("b", "c"));
        assert!(!stemma.is_equal_or_prior("bf", "bf"));
    }

    #[test]
    fn test_chained_trivial_collapse() {
        let mut trivial = BTreeMap::new();
        trivial.insert(ReadingId::from("b2"), ReadingId::from("b1"));
        trivial.insert(ReadingId::from("b1"), ReadingId::from("b"));

        let stemma = LocalStemma::new(
            "u3",
            &rids(&["a", "b", "b1", "b2"]),
            &edges(&[("a", "b"), ("b", "b1"), ("b1", "b2")]),
            &trivial,
            &no_splits(),
            &no_dropped(),
        )
        .unwrap();

        assert_eq!(stemma.vertices(), &rids(&["a", "b"])[..]);
        assert_eq!(stemma.edges().len(), 1);
    }

    #[test]
    fn test_split_merge() {
        let mut splits = BTreeSet::new();
        splits.insert((ReadingId::from("c1"), ReadingId::from("c2")));

        let stemma = LocalStemma::new(
            "u4",
            &rids(&["a", "c1", "c2"]),
            &edges(&[("a", "c1"), ("a", "c2")]),
            &no_trivial(),
            &splits,
            &no_dropped(),
        )
        .unwrap();

        assert!(stemma.is_equal_or_prior("c1", "c2"));
        assert!(stemma.is_equal_or_prior("c2", "c1"));
        assert!(!stemma.is_equal_or_prior("c1", "a"));
    }

    #[test]
    fn test_dropped_readings_excluded() {
        let mut dropped = BTreeSet::new();
        dropped.insert(ReadingId::from("zw"));

        let stemma = LocalStemma::new(
            "u5",
            &rids(&["a", "b", "zw"]),
            &edges(&[("a", "b"), ("a", "zw")]),
            &no_trivial(),
            &no_splits(),
            &dropped,
        )
        .unwrap();

        assert!(!stemma.contains("zw"));
        assert!(!stemma.is_equal_or_prior("a", "zw"));
        assert!(!stemma.is_equal_or_prior("zw", "zw"));
        assert_eq!(stemma.edges().len(), 1);
    }

    #[test]
    fn test_unknown_edge_endpoint_is_malformed() {
        let result = LocalStemma::new(
            "u6",
            &rids(&["a", "b"]),
            &edges(&[("a", "nope")]),
            &no_trivial(),
            &no_splits(),
            &no_dropped(),
        );
        assert!(matches!(result, Err(CbgmError::InputMalformed(_))));
    }

    #[test]
    fn test_multiple_roots_allowed() {
        // No unique-root assumption: two sources, one shared posterior.
        let stemma = LocalStemma::new(
            "u7",
            &rids(&["a", "b", "c"]),
            &edges(&[("a", "c"), ("b", "c")]),
            &no_trivial(),
            &no_splits(),
            &no_dropped(),
        )
        .unwrap();

        assert!(stemma.is_equal_or_prior("a", "c"));
        assert!(stemma.is_equal_or_prior("b", "c"));
        assert!(!stemma.is_equal_or_prior("a", "b"));
    }

    #[test]
    fn test_to_dot_deterministic() {
        let stemma = LocalStemma::new(
            "Test 0:0/2",
            &rids(&["a", "b"]),
            &edges(&[("a", "b")]),
            &no_trivial(),
            &no_splits(),
            &no_dropped(),
        )
        .unwrap();

        let mut first = Vec::new();
        let mut second = Vec::new();
        stemma.to_dot(&mut first).unwrap();
        stemma.to_dot(&mut second).unwrap();
        assert_eq!(first, second);
        let text = String::from_utf8(first).unwrap();
        assert!(text.contains("0 -> 1;"));
    }
}
