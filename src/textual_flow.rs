//! Textual flow: per-unit graph linking each witness to the source of its
//! reading.
//!
//! For every witness the construction walks its ranked potential-ancestor
//! list. An extant witness connects to the first ancestor within the
//! unit's connectivity bound that agrees with it; failing that (or when
//! the witness is lacunose) it connects to its first extant potential
//! ancestor regardless of the bound, and the edge records whether the
//! reading changed (CHANGE) or the text is simply lost (LOSS).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

use crate::dot;
use crate::types::{FlowType, ReadingId, WitnessId};
use crate::variation_unit::VariationUnit;
use crate::witness::Witness;

/// A witness vertex with its attested readings at this unit (empty when
/// lacunose).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowVertex {
    /// The witness.
    pub id: WitnessId,
    /// Readings attested at this unit, in canonical order.
    pub readings: Vec<ReadingId>,
}

impl FlowVertex {
    /// Whether the witness is lacunose at this unit.
    pub fn is_lacunose(&self) -> bool {
        self.readings.is_empty()
    }

    /// Whether the attestation is ambiguous (more than one reading).
    pub fn is_ambiguous(&self) -> bool {
        self.readings.len() > 1
    }
}

/// A flow edge from an ancestor to its descendant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    /// The textual-flow ancestor.
    pub ancestor: WitnessId,
    /// The descendant witness.
    pub descendant: WitnessId,
    /// Zero-based rank of the ancestor in the descendant's potential-
    /// ancestor list at the moment it was chosen.
    pub rank: usize,
    /// Flow classification.
    pub ty: FlowType,
}

/// Textual flow diagram of one variation unit.
#[derive(Debug, Clone)]
pub struct TextualFlow {
    label: String,
    connectivity: usize,
    vertices: Vec<FlowVertex>,
    edges: Vec<FlowEdge>,
}

impl TextualFlow {
    /// Build the flow for a unit from witnesses whose potential-ancestor
    /// lists have been ranked.
    pub fn new(unit: &VariationUnit, witnesses: &[Witness]) -> Self {
        let connectivity = unit.connectivity();
        let mut vertices = Vec::with_capacity(witnesses.len());
        let mut edges = Vec::new();

        for witness in witnesses {
            let readings: Vec<ReadingId> = unit
                .support(witness.id())
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();
            let extant = !readings.is_empty();
            vertices.push(FlowVertex {
                id: witness.id().clone(),
                readings: readings.clone(),
            });

            // A witness with no potential ancestors has the priority of
            // the initial text; it is a source, not a descendant.
            let ancestors = witness.potential_ancestors();
            if ancestors.is_empty() {
                continue;
            }

            let mut chosen: Option<(WitnessId, usize, FlowType)> = None;
            if extant {
                let mut con = 0usize;
                for ancestor in ancestors {
                    if con == connectivity {
                        break;
                    }
                    let agrees = unit
                        .support(ancestor)
                        .map(|s| readings.iter().any(|r| s.contains(r)))
                        .unwrap_or(false);
                    if agrees {
                        let ty = if readings.len() > 1 {
                            FlowType::Ambiguous
                        } else {
                            FlowType::Equal
                        };
                        chosen = Some((ancestor.clone(), con, ty));
                        break;
                    }
                    con += 1;
                }
            }

            // Fallback: the first extant potential ancestor, past the
            // connectivity bound if need be.
            if chosen.is_none() {
                let mut con = 0usize;
                for ancestor in ancestors {
                    if unit.is_extant(ancestor) {
                        let ty = if extant { FlowType::Change } else { FlowType::Loss };
                        chosen = Some((ancestor.clone(), con, ty));
                        break;
                    }
                    con += 1;
                }
            }

            // No extant ancestor at all: leave the witness unattached
            // rather than emit a dangling edge.
            if let Some((ancestor, rank, ty)) = chosen {
                edges.push(FlowEdge {
                    ancestor,
                    descendant: witness.id().clone(),
                    rank,
                    ty,
                });
            }
        }

        Self {
            label: unit.label().to_string(),
            connectivity,
            vertices,
            edges,
        }
    }

    /// The unit label this flow was built from.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The unit's connectivity bound.
    pub fn connectivity(&self) -> usize {
        self.connectivity
    }

    /// All vertices, in witness order.
    pub fn vertices(&self) -> &[FlowVertex] {
        &self.vertices
    }

    /// All edges, in witness order of the descendant.
    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    /// Write the complete flow diagram in DOT syntax.
    pub fn to_dot(&self, out: &mut impl Write) -> io::Result<()> {
        let caption = format!(
            "{}\\nCon={}",
            self.label,
            dot::connectivity_label(self.connectivity)
        );
        dot::open_digraph(out, "textual_flow", &caption)?;
        let index = self.vertex_indices();
        for vertex in &self.vertices {
            write_vertex(out, index[&vertex.id], vertex)?;
        }
        for edge in &self.edges {
            write_edge(out, &index, edge)?;
        }
        dot::close_digraph(out)
    }

    /// Write the coherence-in-attestations diagram for one reading:
    /// witnesses attesting it, plus their flow ancestors with other
    /// readings, with edges only into the attesting set.
    pub fn coherence_in_attestations_to_dot(
        &self,
        reading: &ReadingId,
        out: &mut impl Write,
    ) -> io::Result<()> {
        let caption = format!(
            "{}{}\\nCon={}",
            self.label,
            reading,
            dot::connectivity_label(self.connectivity)
        );
        dot::open_digraph(out, "textual_flow", &caption)?;
        let index = self.vertex_indices();

        let primary: BTreeSet<&WitnessId> = self
            .vertices
            .iter()
            .filter(|v| v.readings.contains(reading))
            .map(|v| &v.id)
            .collect();
        for vertex in &self.vertices {
            if primary.contains(&vertex.id) {
                write_vertex(out, index[&vertex.id], vertex)?;
            }
        }

        // Ancestors outside the attesting set are drawn once, labeled
        // with their own readings.
        let mut secondary: BTreeSet<&WitnessId> = BTreeSet::new();
        for edge in &self.edges {
            if !primary.contains(&edge.descendant) || primary.contains(&edge.ancestor) {
                continue;
            }
            if !secondary.insert(&edge.ancestor) {
                continue;
            }
            let vertex = &self.vertices[index[&edge.ancestor]];
            let serialized = vertex
                .readings
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let shape = if vertex.is_ambiguous() {
                ", peripheries=2"
            } else {
                ""
            };
            writeln!(
                out,
                "\t{} [label=\"{}: {}\", color=blue, shape=ellipse, style=dashed{}];",
                index[&edge.ancestor],
                dot::escape(&serialized),
                dot::escape(vertex.id.as_str()),
                shape
            )?;
        }

        for edge in &self.edges {
            if primary.contains(&edge.descendant) {
                write_edge(out, &index, edge)?;
            }
        }
        dot::close_digraph(out)
    }

    /// Write the coherence-at-variant-passages diagram: witnesses grouped
    /// in clusters by reading, restricted to endpoints of CHANGE edges,
    /// with only the CHANGE edges drawn.
    pub fn coherence_in_variant_passages_to_dot(&self, out: &mut impl Write) -> io::Result<()> {
        let caption = format!(
            "{}\\nCon={}",
            self.label,
            dot::connectivity_label(self.connectivity)
        );
        dot::open_digraph(out, "textual_flow", &caption)?;
        let index = self.vertex_indices();

        let change_wits: BTreeSet<&WitnessId> = self
            .edges
            .iter()
            .filter(|e| e.ty == FlowType::Change)
            .flat_map(|e| [&e.ancestor, &e.descendant])
            .collect();

        let mut clusters: BTreeMap<&ReadingId, Vec<&FlowVertex>> = BTreeMap::new();
        for vertex in &self.vertices {
            for reading in &vertex.readings {
                clusters.entry(reading).or_default().push(vertex);
            }
        }

        for (reading, members) in &clusters {
            writeln!(out, "\tsubgraph cluster_{} {{", reading)?;
            writeln!(out, "\t\tlabeljust=\"c\";")?;
            writeln!(out, "\t\tlabel=\"{}\";", dot::escape(reading.as_str()))?;
            for vertex in members {
                if !change_wits.contains(&vertex.id) {
                    continue;
                }
                let shape = if vertex.is_ambiguous() {
                    ", shape=ellipse, peripheries=2"
                } else {
                    ""
                };
                writeln!(
                    out,
                    "\t\t{} [label=\"{}\"{}];",
                    index[&vertex.id],
                    dot::escape(vertex.id.as_str()),
                    shape
                )?;
            }
            writeln!(out, "\t}}")?;
        }

        for edge in &self.edges {
            if edge.ty == FlowType::Change {
                write_edge(out, &index, edge)?;
            }
        }
        dot::close_digraph(out)
    }

    fn vertex_indices(&self) -> BTreeMap<WitnessId, usize> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (v.id.clone(), i))
            .collect()
    }
}

fn write_vertex(out: &mut impl Write, index: usize, vertex: &FlowVertex) -> io::Result<()> {
    let label = dot::escape(vertex.id.as_str());
    if vertex.is_lacunose() {
        writeln!(
            out,
            "\t{} [label=\"{}\", color=gray, shape=ellipse, style=dashed];",
            index, label
        )
    } else if vertex.is_ambiguous() {
        writeln!(
            out,
            "\t{} [label=\"{}\", shape=ellipse, peripheries=2];",
            index, label
        )
    } else {
        writeln!(out, "\t{} [label=\"{}\"];", index, label)
    }
}

fn write_edge(
    out: &mut impl Write,
    index: &BTreeMap<WitnessId, usize>,
    edge: &FlowEdge,
) -> io::Result<()> {
    let mut attrs: Vec<String> = Vec::new();
    if edge.rank > 0 {
        // Ranks display one-based; direct descent carries no label.
        attrs.push(format!("label=\"{}\", fontsize=10", edge.rank + 1));
    }
    match edge.ty {
        FlowType::Change => attrs.push("color=blue".to_string()),
        FlowType::Loss => attrs.push("color=gray, style=dashed".to_string()),
        FlowType::Ambiguous => attrs.push("color=black, style=bold".to_string()),
        _ => attrs.push("color=black".to_string()),
    }
    writeln!(
        out,
        "\t{} -> {} [{}];",
        index[&edge.ancestor],
        index[&edge.descendant],
        attrs.join(", ")
    )
}
