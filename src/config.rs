//! Analysis options.
//!
//! All configuration the kernel recognizes threads through this one
//! record; nothing is read from the environment or from global state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::canonical::canonical_hash_hex;
use crate::types::SUBVARIANT_READING_TYPES;

/// Options controlling how an apparatus is built and analyzed.
///
/// ## Parameters
///
/// - `distinct_reading_types`: sub-variant types kept as distinct readings
/// - `drop_ambiguous`: exclude readings tagged "ambiguous"
/// - `merge_splits`: connect split attestations with identical text
/// - `extancy_threshold`: minimum extant units for a witness to be analyzed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Subset of {"split", "orthographic", "defective"} preserved as
    /// distinct readings. Types outside the set are folded into their
    /// canonical parents.
    pub distinct_reading_types: BTreeSet<String>,
    /// If true, readings tagged "ambiguous" are dropped and their
    /// witnesses treated as lacunose at that unit.
    pub drop_ambiguous: bool,
    /// If true, split readings with identical surface text are connected
    /// by bidirectional priority edges in the local stemma.
    pub merge_splits: bool,
    /// Witnesses extant at fewer units than this are excluded from
    /// analyses. Zero keeps every witness.
    pub extancy_threshold: usize,
}

impl AnalysisOptions {
    /// Options with the given distinct reading types.
    pub fn with_distinct_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            distinct_reading_types: types.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the extancy threshold.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.extancy_threshold = threshold;
        self
    }

    /// Set whether split attestations merge.
    pub fn with_merge_splits(mut self, merge: bool) -> Self {
        self.merge_splits = merge;
        self
    }

    /// Sub-variant types to be treated as trivial: the complement of the
    /// distinct set within the three recognized sub-variant types.
    pub fn trivial_reading_types(&self) -> BTreeSet<String> {
        SUBVARIANT_READING_TYPES
            .iter()
            .filter(|t| !self.distinct_reading_types.contains(**t))
            .map(|t| t.to_string())
            .collect()
    }

    /// Canonical hash of the option set, for provenance and cache keys.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            distinct_reading_types: BTreeSet::new(),
            drop_ambiguous: true,
            merge_splits: false,
            extancy_threshold: 0,
        }
    }
}
