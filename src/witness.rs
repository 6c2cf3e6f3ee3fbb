//! Witness: precomputed genealogical relations against every other witness.
//!
//! For a subject witness the kernel keeps two bitmaps per other witness
//! over variation-unit indices: where the two agree, and where the
//! subject's readings are explained by the other's (equal-or-prior in the
//! unit's local stemma). Extancy is encoded uniformly as self-explanation:
//! `explained_by[w]` for subject `w` is exactly its extant-unit bitmap.
//!
//! The lifecycle is two passes after construction: potential ancestors
//! are ranked from the pairwise metrics, then the minimal substemma is
//! chosen by weighted set cover. Neither list mutates afterwards.

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::apparatus::Apparatus;
use crate::error::{CbgmError, UncoverableSubstemma};
use crate::set_cover::{SetCoverRow, SetCoverSolver};
use crate::types::{Direction, WitnessId};

/// Pairwise comparison metrics between a subject and a secondary witness,
/// restricted to their mutually extant units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WitnessComparison {
    /// The secondary witness.
    pub id: WitnessId,
    /// Genealogical direction of the secondary relative to the subject.
    pub dir: Direction,
    /// Mutually extant units.
    pub pass: u64,
    /// Agreements.
    pub eq: u64,
    /// Units where the subject's reading explains the secondary's.
    pub prior: u64,
    /// Units where the secondary's reading explains the subject's.
    pub posterior: u64,
    /// Units where neither reading explains the other. Signed: a
    /// merged-split equivalence can explain in both directions without an
    /// agreement, counting one unit under both prior and posterior.
    pub norel: i64,
    /// Percentage of agreement over mutually extant units.
    pub perc: f64,
}

impl WitnessComparison {
    /// Exact perc ordering without floats: compares eq/pass ratios by
    /// cross-multiplication. Equal-pass zero cases order as equal.
    pub fn perc_cmp(&self, other: &Self) -> std::cmp::Ordering {
        let lhs = self.eq as u128 * other.pass as u128;
        let rhs = other.eq as u128 * self.pass as u128;
        lhs.cmp(&rhs)
    }
}

/// A witness with its precomputed relation bitmaps and, after the two
/// finalization passes, its ranked potential ancestors and optimized
/// substemma.
#[derive(Debug, Clone)]
pub struct Witness {
    id: WitnessId,
    agreements: BTreeMap<WitnessId, RoaringBitmap>,
    explained_by: BTreeMap<WitnessId, RoaringBitmap>,
    potential_ancestors: Vec<WitnessId>,
    stemma_ancestors: Vec<WitnessId>,
}

impl Witness {
    /// Precompute relation bitmaps for `id` against every witness in the
    /// apparatus (including itself).
    ///
    /// Returns `UnknownSelector` if the witness is not in `list_wit`.
    pub fn new(id: impl Into<WitnessId>, app: &Apparatus) -> Result<Self, CbgmError> {
        let id = id.into();
        if !app.contains_witness(&id) {
            return Err(CbgmError::UnknownSelector(format!(
                "witness {} is not in the witness list",
                id
            )));
        }

        let mut agreements: BTreeMap<WitnessId, RoaringBitmap> = BTreeMap::new();
        let mut explained_by: BTreeMap<WitnessId, RoaringBitmap> = BTreeMap::new();
        for other in app.list_wit() {
            agreements.insert(other.clone(), RoaringBitmap::new());
            explained_by.insert(other.clone(), RoaringBitmap::new());
        }

        for (i, unit) in app.units().iter().enumerate() {
            let index = i as u32;
            let own_support = match unit.support(&id) {
                Some(support) => support,
                None => continue,
            };
            let stemma = unit.stemma();
            for other in app.list_wit() {
                let other_support = match unit.support(other) {
                    Some(support) => support,
                    None => continue,
                };
                if own_support.iter().any(|r| other_support.contains(r)) {
                    agreements.get_mut(other).expect("prefilled").insert(index);
                }
                let explained = own_support.iter().all(|r| {
                    other_support
                        .iter()
                        .any(|r2| stemma.is_equal_or_prior(r2.as_str(), r.as_str()))
                });
                if explained {
                    explained_by.get_mut(other).expect("prefilled").insert(index);
                }
            }
        }

        debug!(witness = %id, "relation bitmaps computed");
        Ok(Self {
            id,
            agreements,
            explained_by,
            potential_ancestors: Vec::new(),
            stemma_ancestors: Vec::new(),
        })
    }

    /// The witness identifier.
    pub fn id(&self) -> &WitnessId {
        &self.id
    }

    /// Units at which this witness is extant (its self-explanation map).
    pub fn extant(&self) -> &RoaringBitmap {
        self.explained_by
            .get(&self.id)
            .expect("self entry is always present")
    }

    /// Agreement bitmap against another witness.
    pub fn agreements_with(&self, other: &WitnessId) -> Option<&RoaringBitmap> {
        self.agreements.get(other)
    }

    /// Units where this witness's readings are explained by `other`'s.
    pub fn explained_by(&self, other: &WitnessId) -> Option<&RoaringBitmap> {
        self.explained_by.get(other)
    }

    /// Ranked potential ancestors (empty until the ranking pass).
    pub fn potential_ancestors(&self) -> &[WitnessId] {
        &self.potential_ancestors
    }

    /// Optimized substemma (empty until the optimization pass).
    pub fn stemma_ancestors(&self) -> &[WitnessId] {
        &self.stemma_ancestors
    }

    /// Compare this witness against another, restricted to mutually
    /// extant units.
    pub fn compare(&self, other: &Witness) -> WitnessComparison {
        let mutually_extant = self.extant() & other.extant();
        let empty = RoaringBitmap::new();
        let agreements = self.agreements.get(other.id()).unwrap_or(&empty);
        let explained_by_other = self.explained_by.get(other.id()).unwrap_or(&empty);
        let explains_other = other.explained_by.get(self.id()).unwrap_or(&empty);

        let pass = mutually_extant.len();
        let eq = agreements.len();
        let posterior = (explained_by_other - agreements).len();
        let prior = (explains_other - agreements).len();
        let norel = pass as i64 - eq as i64 - prior as i64 - posterior as i64;
        let perc = if pass > 0 {
            100.0 * eq as f64 / pass as f64
        } else {
            0.0
        };

        WitnessComparison {
            id: other.id().clone(),
            dir: Direction::from_counts(prior, posterior),
            pass,
            eq,
            prior,
            posterior,
            norel,
            perc,
        }
    }

    /// Set the ranked potential-ancestor list. Part of the build
    /// lifecycle; see [`rank_potential_ancestors`].
    pub fn set_potential_ancestors(&mut self, ranked: Vec<WitnessId>) {
        self.potential_ancestors = ranked;
    }

    /// Set the optimized substemma. Part of the build lifecycle; see
    /// [`optimize_substemma`].
    pub fn set_stemma_ancestors(&mut self, ancestors: Vec<WitnessId>) {
        self.stemma_ancestors = ancestors;
    }
}

/// Rank the potential ancestors of `subject` among `witnesses`.
///
/// A witness qualifies when it explains the subject more often than the
/// reverse (`posterior > prior`). Sorting is by perc (exact ratio
/// comparison), then raw agreement count, and is stable over the input
/// order, which callers keep in canonical `list_wit` order.
pub fn rank_potential_ancestors(subject: &Witness, witnesses: &[Witness]) -> Vec<WitnessId> {
    let mut eligible: Vec<WitnessComparison> = witnesses
        .iter()
        .filter(|w| w.id() != subject.id())
        .map(|w| subject.compare(w))
        .filter(|c| c.dir == Direction::Ancestor)
        .collect();
    eligible.sort_by(|a, b| b.perc_cmp(a).then_with(|| b.eq.cmp(&a.eq)));
    eligible.into_iter().map(|c| c.id).collect()
}

/// Choose the minimum-cost substemma for `subject`.
///
/// One set-cover row per ranked potential ancestor: the units it explains
/// restricted to the subject's extancy, at a cost of its disagreements
/// with the subject. Returns the chosen ancestors (in rank order) and,
/// when extant units remain unexplained by every potential ancestor, an
/// [`UncoverableSubstemma`] diagnostic. A witness with no potential
/// ancestors is treated as initial text and yields an empty substemma
/// with no diagnostic.
pub fn optimize_substemma(
    subject: &Witness,
    witnesses: &[Witness],
) -> (Vec<WitnessId>, Option<UncoverableSubstemma>) {
    if subject.potential_ancestors().is_empty() {
        return (Vec::new(), None);
    }

    let by_id: BTreeMap<&WitnessId, &Witness> = witnesses.iter().map(|w| (w.id(), w)).collect();
    let mut rows: Vec<SetCoverRow> = Vec::new();
    for ancestor_id in subject.potential_ancestors() {
        let ancestor = match by_id.get(ancestor_id) {
            Some(w) => *w,
            None => continue,
        };
        let comparison = subject.compare(ancestor);
        let bits = match subject.explained_by(ancestor_id) {
            Some(bits) => bits & subject.extant(),
            None => continue,
        };
        rows.push(SetCoverRow::new(
            ancestor_id.clone(),
            bits,
            comparison.pass - comparison.eq,
        ));
    }

    let solver = SetCoverSolver::new(rows, subject.extant().clone());
    let result = solver.solve();

    let diagnostic = if result.uncovered.is_empty() {
        None
    } else {
        let diag = UncoverableSubstemma {
            witness: subject.id().clone(),
            uncovered: result.uncovered.iter().collect(),
        };
        warn!(%diag, "substemma is a partial cover");
        Some(diag)
    };

    (result.solution.row_ids(), diagnostic)
}

/// Build the full witness set for an apparatus: construct relation
/// bitmaps for every witness meeting the extancy threshold, rank
/// potential ancestors, and optimize substemmata.
///
/// Returns the witnesses in `list_wit` order together with any
/// uncoverable-substemma diagnostics (non-fatal).
pub fn build_witnesses(
    app: &Apparatus,
    threshold: usize,
) -> Result<(Vec<Witness>, Vec<UncoverableSubstemma>), CbgmError> {
    let mut witnesses: Vec<Witness> = Vec::new();
    for id in app.witnesses_meeting(threshold) {
        witnesses.push(Witness::new(id, app)?);
    }

    let ranked: Vec<Vec<WitnessId>> = witnesses
        .iter()
        .map(|w| rank_potential_ancestors(w, &witnesses))
        .collect();
    for (witness, ranks) in witnesses.iter_mut().zip(ranked) {
        witness.set_potential_ancestors(ranks);
    }

    let optimized: Vec<(Vec<WitnessId>, Option<UncoverableSubstemma>)> = witnesses
        .iter()
        .map(|w| optimize_substemma(w, &witnesses))
        .collect();
    let mut diagnostics = Vec::new();
    for (witness, (ancestors, diagnostic)) in witnesses.iter_mut().zip(optimized) {
        witness.set_stemma_ancestors(ancestors);
        diagnostics.extend(diagnostic);
    }

    debug!(
        witnesses = witnesses.len(),
        partial_covers = diagnostics.len(),
        "witness set built"
    );
    Ok((witnesses, diagnostics))
}
