//! Global stemma: the union of all optimized substemmata.
//!
//! One vertex per witness, one edge per chosen stemma ancestor. The
//! kernel performs no further simplification (no transitive reduction);
//! what the substemma optimizer chose is what the diagram shows.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::dot;
use crate::types::WitnessId;
use crate::witness::Witness;

/// A witness vertex of the global stemma.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalVertex {
    /// The witness.
    pub id: WitnessId,
    /// Whether the witness's substemma is a partial cover (some extant
    /// units unexplained); such vertices are styled as questionable.
    pub partial: bool,
}

/// An edge of the global stemma: `ancestor` is in `descendant`'s
/// optimized substemma.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalEdge {
    /// The stemmatic ancestor.
    pub ancestor: WitnessId,
    /// The descendant witness.
    pub descendant: WitnessId,
}

/// The assembled global stemma graph.
#[derive(Debug, Clone)]
pub struct GlobalStemma {
    vertices: Vec<GlobalVertex>,
    edges: Vec<GlobalEdge>,
}

impl GlobalStemma {
    /// Assemble the graph from witnesses with finalized substemmata.
    /// Vertices keep the witnesses' order; edges are grouped by
    /// descendant, in each substemma's rank order.
    pub fn new(witnesses: &[Witness]) -> Self {
        let mut vertices = Vec::with_capacity(witnesses.len());
        let mut edges = Vec::new();
        for witness in witnesses {
            let covered = witness
                .stemma_ancestors()
                .iter()
                .fold(roaring::RoaringBitmap::new(), |mut acc, ancestor| {
                    if let Some(bits) = witness.explained_by(ancestor) {
                        acc |= bits;
                    }
                    acc
                });
            let partial = !witness.potential_ancestors().is_empty()
                && !(witness.extant() - &covered).is_empty();
            vertices.push(GlobalVertex {
                id: witness.id().clone(),
                partial,
            });
            for ancestor in witness.stemma_ancestors() {
                edges.push(GlobalEdge {
                    ancestor: ancestor.clone(),
                    descendant: witness.id().clone(),
                });
            }
        }
        Self { vertices, edges }
    }

    /// All vertices, in witness order.
    pub fn vertices(&self) -> &[GlobalVertex] {
        &self.vertices
    }

    /// All edges, grouped by descendant.
    pub fn edges(&self) -> &[GlobalEdge] {
        &self.edges
    }

    /// Witnesses with no stemmatic ancestors (the initial-text layer).
    pub fn roots(&self) -> Vec<&WitnessId> {
        self.vertices
            .iter()
            .filter(|v| self.edges.iter().all(|e| e.descendant != v.id))
            .map(|v| &v.id)
            .collect()
    }

    /// Write the global stemma in DOT syntax.
    pub fn to_dot(&self, out: &mut impl Write) -> io::Result<()> {
        dot::open_digraph(out, "global_stemma", "Global Stemma")?;
        let index: std::collections::BTreeMap<&WitnessId, usize> = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (&v.id, i))
            .collect();
        for (i, vertex) in self.vertices.iter().enumerate() {
            if vertex.partial {
                writeln!(
                    out,
                    "\t{} [label=\"{}\", color=gray, style=dashed];",
                    i,
                    dot::escape(vertex.id.as_str())
                )?;
            } else {
                writeln!(out, "\t{} [label=\"{}\"];", i, dot::escape(vertex.id.as_str()))?;
            }
        }
        for edge in &self.edges {
            writeln!(
                out,
                "\t{} -> {};",
                index[&edge.ancestor], index[&edge.descendant]
            )?;
        }
        dot::close_digraph(out)
    }
}
