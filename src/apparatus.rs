//! Apparatus: the whole collation, ready for genealogical analysis.
//!
//! Owns the canonical witness list and the VUI-indexed unit vector, and
//! precomputes per-witness extant-unit counts. Everything downstream
//! iterates witnesses in `list_wit` order and units in index order; that
//! single rule is what makes the kernel's output byte-reproducible.

use std::collections::BTreeMap;
use tracing::debug;

use crate::config::AnalysisOptions;
use crate::error::CbgmError;
use crate::types::{CollationUnit, WitnessId};
use crate::variation_unit::VariationUnit;

/// The collation: witnesses × variation units with readings.
#[derive(Debug, Clone)]
pub struct Apparatus {
    list_wit: Vec<WitnessId>,
    units: Vec<VariationUnit>,
    extant_counts: BTreeMap<WitnessId, usize>,
}

impl Apparatus {
    /// Build an apparatus from the canonical witness list and the parsed
    /// unit records, applying the configured reading transformations.
    ///
    /// Returns `InputMalformed` when a unit duplicates an ID, a record is
    /// structurally invalid, or a reading is attested by a witness absent
    /// from `list_wit`.
    pub fn new(
        list_wit: Vec<WitnessId>,
        records: &[CollationUnit],
        options: &AnalysisOptions,
    ) -> Result<Self, CbgmError> {
        let mut seen_wits = BTreeMap::new();
        for (i, wit) in list_wit.iter().enumerate() {
            if seen_wits.insert(wit.clone(), i).is_some() {
                return Err(CbgmError::InputMalformed(format!(
                    "witness {} appears twice in the witness list",
                    wit
                )));
            }
        }

        let mut units = Vec::with_capacity(records.len());
        let mut seen_units = BTreeMap::new();
        for (index, record) in records.iter().enumerate() {
            if seen_units.insert(record.id.clone(), index).is_some() {
                return Err(CbgmError::InputMalformed(format!(
                    "variation unit {} appears twice in the collation",
                    record.id
                )));
            }
            let unit = VariationUnit::new(record, options)?;
            for wit in unit.reading_support().keys() {
                if !seen_wits.contains_key(wit) {
                    return Err(CbgmError::InputMalformed(format!(
                        "unit {} is attested by witness {} missing from the witness list",
                        record.id, wit
                    )));
                }
            }
            units.push(unit);
        }

        let mut extant_counts: BTreeMap<WitnessId, usize> = BTreeMap::new();
        for wit in &list_wit {
            let count = units.iter().filter(|u| u.is_extant(wit)).count();
            extant_counts.insert(wit.clone(), count);
        }

        debug!(
            witnesses = list_wit.len(),
            units = units.len(),
            "apparatus constructed"
        );

        Ok(Self {
            list_wit,
            units,
            extant_counts,
        })
    }

    /// The canonical, ordered witness list.
    pub fn list_wit(&self) -> &[WitnessId] {
        &self.list_wit
    }

    /// The VUI-indexed unit vector.
    pub fn units(&self) -> &[VariationUnit] {
        &self.units
    }

    /// Number of units at which a witness is extant. Zero for witnesses
    /// not in the list.
    pub fn extant_count(&self, witness: &WitnessId) -> usize {
        self.extant_counts.get(witness).copied().unwrap_or(0)
    }

    /// Whether a witness is in the canonical list.
    pub fn contains_witness(&self, witness: &WitnessId) -> bool {
        self.extant_counts.contains_key(witness)
    }

    /// Witnesses meeting the extancy threshold, in `list_wit` order.
    pub fn witnesses_meeting(&self, threshold: usize) -> Vec<WitnessId> {
        self.list_wit
            .iter()
            .filter(|w| self.extant_count(w) >= threshold)
            .cloned()
            .collect()
    }

    /// Resolve a passage selector: an exact unit ID, an exact label, or a
    /// decimal VUI. Returns the index and the unit.
    pub fn find_unit(&self, selector: &str) -> Result<(usize, &VariationUnit), CbgmError> {
        if let Some(found) = self
            .units
            .iter()
            .enumerate()
            .find(|(_, u)| u.id() == selector)
        {
            return Ok(found);
        }
        if let Some(found) = self
            .units
            .iter()
            .enumerate()
            .find(|(_, u)| u.label() == selector)
        {
            return Ok(found);
        }
        if let Ok(index) = selector.parse::<usize>() {
            if let Some(unit) = self.units.get(index) {
                return Ok((index, unit));
            }
            return Err(CbgmError::UnknownSelector(format!(
                "passage index {} is out of range; the collation has {} units",
                index,
                self.units.len()
            )));
        }
        Err(CbgmError::UnknownSelector(format!(
            "no variation unit has ID or label {:?}",
            selector
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CollationReading;

    fn wid(s: &str) -> WitnessId {
        WitnessId::from(s)
    }

    fn make_records() -> Vec<CollationUnit> {
        vec![
            CollationUnit::new("u1")
                .with_label("Test 1:1/2")
                .with_reading(CollationReading::new("a", "x", vec![wid("A"), wid("B")]))
                .with_reading(CollationReading::new("b", "y", vec![wid("C")]))
                .with_edge("a", "b"),
            CollationUnit::new("u2")
                .with_reading(CollationReading::new("a", "x", vec![wid("A")]))
                .with_reading(CollationReading::new("b", "y", vec![wid("B")]))
                .with_edge("a", "b"),
        ]
    }

    fn make_apparatus() -> Apparatus {
        Apparatus::new(
            vec![wid("A"), wid("B"), wid("C")],
            &make_records(),
            &AnalysisOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_extant_counts() {
        let app = make_apparatus();
        assert_eq!(app.extant_count(&wid("A")), 2);
        assert_eq!(app.extant_count(&wid("B")), 2);
        assert_eq!(app.extant_count(&wid("C")), 1);
        assert_eq!(app.extant_count(&wid("Z")), 0);
    }

    #[test]
    fn test_find_unit_by_id_label_and_index() {
        let app = make_apparatus();
        assert_eq!(app.find_unit("u2").unwrap().0, 1);
        assert_eq!(app.find_unit("Test 1:1/2").unwrap().0, 0);
        assert_eq!(app.find_unit("1").unwrap().0, 1);
    }

    #[test]
    fn test_find_unit_unknown_selector() {
        let app = make_apparatus();
        assert!(matches!(
            app.find_unit("nope"),
            Err(CbgmError::UnknownSelector(_))
        ));
        assert!(matches!(
            app.find_unit("7"),
            Err(CbgmError::UnknownSelector(_))
        ));
    }

    #[test]
    fn test_threshold_filter() {
        let app = make_apparatus();
        assert_eq!(app.witnesses_meeting(2), vec![wid("A"), wid("B")]);
        assert_eq!(app.witnesses_meeting(0).len(), 3);
    }

    #[test]
    fn test_unlisted_witness_rejected() {
        let records = vec![CollationUnit::new("u1")
            .with_reading(CollationReading::new("a", "x", vec![wid("GHOST")]))];
        let result = Apparatus::new(vec![wid("A")], &records, &AnalysisOptions::default());
        assert!(matches!(result, Err(CbgmError::InputMalformed(_))));
    }

    #[test]
    fn test_duplicate_unit_rejected() {
        let records = vec![CollationUnit::new("u1"), CollationUnit::new("u1")];
        let result = Apparatus::new(vec![wid("A")], &records, &AnalysisOptions::default());
        assert!(matches!(result, Err(CbgmError::InputMalformed(_))));
    }
}
