//! Parsed collation model.
//!
//! The kernel does not parse collation documents; an external parser hands
//! it these records, one per variation unit, already stripped of markup.
//! Construction of [`crate::VariationUnit`] from a record applies the
//! configured reading-type transformations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{ReadingId, WitnessId};

/// One reading of a variation unit, as parsed from the collation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollationReading {
    /// Reading identifier, unique within the unit.
    pub id: ReadingId,
    /// Surface text of the reading. Used only to pair split attestations.
    pub text: String,
    /// Type tags, e.g. "substantive", "split", "orthographic",
    /// "defective", "ambiguous". Empty for plain substantive readings.
    pub kinds: BTreeSet<String>,
    /// Witnesses attesting this reading.
    pub wits: Vec<WitnessId>,
}

impl CollationReading {
    /// Create a plain substantive reading.
    pub fn new(id: impl Into<ReadingId>, text: impl Into<String>, wits: Vec<WitnessId>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kinds: BTreeSet::new(),
            wits,
        }
    }

    /// Attach a type tag.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kinds.insert(kind.into());
        self
    }
}

/// One variation unit of the collation: readings, their support, the
/// connectivity bound, and the local-stemma edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollationUnit {
    /// Unit identifier, unique in the apparatus.
    pub id: String,
    /// Display label; the ID stands in when absent.
    pub label: Option<String>,
    /// Ordered readings present at this unit.
    pub readings: Vec<CollationReading>,
    /// Connectivity bound for textual flow; `None` means unbounded.
    pub connectivity: Option<usize>,
    /// Local-stemma edges as (prior, posterior) pairs over reading IDs.
    pub stemma_edges: Vec<(ReadingId, ReadingId)>,
}

impl CollationUnit {
    /// Create a unit with no readings or edges.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            readings: Vec::new(),
            connectivity: None,
            stemma_edges: Vec::new(),
        }
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the connectivity bound.
    pub fn with_connectivity(mut self, connectivity: usize) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Append a reading.
    pub fn with_reading(mut self, reading: CollationReading) -> Self {
        self.readings.push(reading);
        self
    }

    /// Append a local-stemma edge.
    pub fn with_edge(mut self, prior: impl Into<ReadingId>, posterior: impl Into<ReadingId>) -> Self {
        self.stemma_edges.push((prior.into(), posterior.into()));
        self
    }
}
