//! Variation unit: readings, witness support, connectivity, local stemma.
//!
//! Construction from a [`CollationUnit`] applies the configured
//! reading-type transformations: ambiguous readings may be dropped
//! (their witnesses become lacunose here), sub-variant readings outside
//! the distinct set are folded into their canonical parents, and split
//! attestations with identical text may be merged in the local stemma.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::AnalysisOptions;
use crate::error::CbgmError;
use crate::local_stemma::LocalStemma;
use crate::types::{CollationUnit, ReadingId, WitnessId, AMBIGUOUS_READING_TYPE};

/// Connectivity used when a unit specifies none: effectively unbounded.
pub const ABSOLUTE_CONNECTIVITY: usize = usize::MAX;

/// One variation unit, ready for analysis.
#[derive(Debug, Clone)]
pub struct VariationUnit {
    id: String,
    label: String,
    readings: Vec<ReadingId>,
    support: BTreeMap<WitnessId, BTreeSet<ReadingId>>,
    connectivity: usize,
    stemma: LocalStemma,
}

impl VariationUnit {
    /// Build a variation unit from a parsed collation record.
    ///
    /// Returns `InputMalformed` when the record's stemma references
    /// unknown readings or the connectivity bound is zero.
    pub fn new(record: &CollationUnit, options: &AnalysisOptions) -> Result<Self, CbgmError> {
        let label = record.label.clone().unwrap_or_else(|| record.id.clone());

        if record.connectivity == Some(0) {
            return Err(CbgmError::InputMalformed(format!(
                "unit {} has connectivity 0; the bound must be positive",
                record.id
            )));
        }
        let connectivity = record.connectivity.unwrap_or(ABSOLUTE_CONNECTIVITY);

        let trivial_types = options.trivial_reading_types();

        // First pass over the readings: find dropped readings, trivial
        // sub-variants, and the text map used to pair splits.
        let mut dropped: BTreeSet<ReadingId> = BTreeSet::new();
        let mut trivial_ids: BTreeSet<ReadingId> = BTreeSet::new();
        let mut split_folds: Vec<(ReadingId, &str)> = Vec::new();
        let mut reading_of_text: BTreeMap<&str, ReadingId> = BTreeMap::new();
        for reading in &record.readings {
            if options.drop_ambiguous && reading.kinds.contains(AMBIGUOUS_READING_TYPE) {
                dropped.insert(reading.id.clone());
                continue;
            }
            // A split attestation outside the distinct set folds onto the
            // non-split reading carrying identical text.
            if reading.kinds.contains("split") && trivial_types.contains("split") {
                split_folds.push((reading.id.clone(), reading.text.as_str()));
            }
            // Any other sub-variant is trivial when its remaining tags are
            // non-empty and all in the trivial set; it folds onto its
            // nearest non-trivial stemma ancestor.
            let mut kinds = reading.kinds.clone();
            kinds.remove("split");
            if !kinds.is_empty() && kinds.iter().all(|k| trivial_types.contains(k)) {
                trivial_ids.insert(reading.id.clone());
            }
            if !reading.kinds.contains("split") {
                reading_of_text.insert(reading.text.as_str(), reading.id.clone());
            }
        }

        let mut trivial: BTreeMap<ReadingId, ReadingId> = BTreeMap::new();
        for (id, text) in &split_folds {
            if let Some(partner) = reading_of_text.get(text) {
                if partner != id {
                    trivial.insert(id.clone(), partner.clone());
                    trivial_ids.insert(id.clone());
                }
            }
        }
        for id in &trivial_ids {
            if trivial.contains_key(id) {
                continue;
            }
            if let Some(parent) = chase_to_significant(id, &record.stemma_edges, &trivial_ids) {
                trivial.insert(id.clone(), parent);
            }
        }

        // Split pairs: a split-tagged reading pairs with the non-split
        // reading carrying identical text.
        let mut split_pairs: BTreeSet<(ReadingId, ReadingId)> = BTreeSet::new();
        if options.merge_splits {
            for reading in &record.readings {
                if dropped.contains(&reading.id) || !reading.kinds.contains("split") {
                    continue;
                }
                if let Some(partner) = reading_of_text.get(reading.text.as_str()) {
                    if *partner != reading.id {
                        split_pairs.insert((reading.id.clone(), partner.clone()));
                    }
                }
            }
        }

        let vertex_ids: Vec<ReadingId> = record.readings.iter().map(|r| r.id.clone()).collect();
        let stemma = LocalStemma::new(
            label.clone(),
            &vertex_ids,
            &record.stemma_edges,
            &trivial,
            &split_pairs,
            &dropped,
        )?;

        // Second pass: the surviving reading list and the support map,
        // with trivial attestations recorded under their canonical IDs.
        let mut readings: Vec<ReadingId> = Vec::new();
        let mut support: BTreeMap<WitnessId, BTreeSet<ReadingId>> = BTreeMap::new();
        for reading in &record.readings {
            if dropped.contains(&reading.id) {
                continue;
            }
            // Chase the map: a split can fold onto a reading that is
            // itself a trivial sub-variant.
            let mut canonical = reading.id.clone();
            for _ in 0..=trivial.len() {
                match trivial.get(&canonical) {
                    Some(next) => canonical = next.clone(),
                    None => break,
                }
            }
            if !stemma.contains(canonical.as_str()) {
                return Err(CbgmError::InternalInvariant(format!(
                    "unit {}: reading {} collapsed outside the stemma",
                    record.id, reading.id
                )));
            }
            if !readings.contains(&canonical) {
                readings.push(canonical.clone());
            }
            for wit in &reading.wits {
                support
                    .entry(wit.clone())
                    .or_default()
                    .insert(canonical.clone());
            }
        }

        Ok(Self {
            id: record.id.clone(),
            label,
            readings,
            support,
            connectivity,
            stemma,
        })
    }

    /// The unit identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The display label (the ID when the record carried none).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Surviving readings, in collation order.
    pub fn readings(&self) -> &[ReadingId] {
        &self.readings
    }

    /// The full support map.
    pub fn reading_support(&self) -> &BTreeMap<WitnessId, BTreeSet<ReadingId>> {
        &self.support
    }

    /// Readings attested by one witness; `None` when lacunose here.
    pub fn support(&self, witness: &WitnessId) -> Option<&BTreeSet<ReadingId>> {
        self.support.get(witness)
    }

    /// Whether a witness attests at least one reading at this unit.
    pub fn is_extant(&self, witness: &WitnessId) -> bool {
        self.support.contains_key(witness)
    }

    /// The connectivity bound for textual flow.
    pub fn connectivity(&self) -> usize {
        self.connectivity
    }

    /// The local stemma.
    pub fn stemma(&self) -> &LocalStemma {
        &self.stemma
    }
}

/// Follow in-edges from a trivial reading until a non-trivial reading is
/// reached. Bounded by the edge count; returns `None` for a trivial
/// reading with no in-edge (it stays as-is).
fn chase_to_significant(
    id: &ReadingId,
    edges: &[(ReadingId, ReadingId)],
    trivial_ids: &BTreeSet<ReadingId>,
) -> Option<ReadingId> {
    let mut current = id.clone();
    for _ in 0..=edges.len() {
        let parent = edges
            .iter()
            .find(|(_, posterior)| *posterior == current)
            .map(|(prior, _)| prior.clone())?;
        if !trivial_ids.contains(&parent) {
            return Some(parent);
        }
        current = parent;
    }
    None
}

/// Serializable export of a unit's support map, for boundary consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSupport {
    /// Unit identifier.
    pub unit: String,
    /// Witness → attested readings.
    pub support: BTreeMap<WitnessId, BTreeSet<ReadingId>>,
}

impl From<&VariationUnit> for UnitSupport {
    fn from(unit: &VariationUnit) -> Self {
        Self {
            unit: unit.id.to_string(),
            support: unit.support.clone(),
        }
    }
}
