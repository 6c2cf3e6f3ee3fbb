//! Weighted set-cover solver for substemma optimization.
//!
//! Rows are candidate ancestors: a bitmap of the variation units they
//! explain and a cost counting their disagreements with the subject. The
//! solver finds a minimum-cost subset of rows covering the target bitmap,
//! exactly: unique rows are committed first, a greedy pass (and any
//! trivial single-row cover) seeds the incumbent, and branch-and-bound
//! over the remaining rows proves optimality.
//!
//! Determinism: rows keep their given order (ancestor rank order when the
//! caller is [`crate::witness`]); the include-branch is explored first and
//! the incumbent is replaced only on strict improvement, so equal-cost
//! optima resolve to the earliest-rank row set.

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::WitnessId;

/// One candidate row: an ancestor, the units it explains, and its cost.
#[derive(Debug, Clone, PartialEq)]
pub struct SetCoverRow {
    /// The ancestor witness this row stands for.
    pub id: WitnessId,
    /// Unit indices explained by this ancestor.
    pub bits: RoaringBitmap,
    /// Number of disagreement units between ancestor and subject.
    pub cost: u64,
}

impl SetCoverRow {
    /// Create a row.
    pub fn new(id: impl Into<WitnessId>, bits: RoaringBitmap, cost: u64) -> Self {
        Self {
            id: id.into(),
            bits,
            cost,
        }
    }
}

/// A (possibly partial) cover: the chosen rows and their summed cost.
#[derive(Debug, Clone, Default)]
pub struct SetCoverSolution {
    /// Chosen rows, in the solver's row order.
    pub rows: Vec<SetCoverRow>,
    /// Total cost of the chosen rows.
    pub cost: u64,
}

impl SetCoverSolution {
    /// IDs of the chosen rows, in order.
    pub fn row_ids(&self) -> Vec<WitnessId> {
        self.rows.iter().map(|r| r.id.clone()).collect()
    }
}

/// Outcome of [`SetCoverSolver::solve`]: the best cover found plus any
/// target bits no row can cover (empty on full success).
#[derive(Debug, Clone)]
pub struct SetCoverResult {
    /// Minimum-cost cover of the coverable part of the target.
    pub solution: SetCoverSolution,
    /// Target bits outside the union of all rows.
    pub uncovered: RoaringBitmap,
}

/// Summary of a solver outcome, for logs and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCoverStats {
    /// Number of candidate rows.
    pub rows: usize,
    /// Rows in the chosen solution.
    pub chosen: usize,
    /// Cost of the chosen solution.
    pub cost: u64,
    /// Count of uncoverable target bits.
    pub uncovered: u64,
}

/// Weighted set-cover solver over a fixed row vector and target bitmap.
pub struct SetCoverSolver {
    rows: Vec<SetCoverRow>,
    target: RoaringBitmap,
}

impl SetCoverSolver {
    /// Create a solver. The row vector is consumed; rows are never
    /// mutated, and solutions carry owned clones.
    pub fn new(rows: Vec<SetCoverRow>, target: RoaringBitmap) -> Self {
        Self { rows, target }
    }

    /// The candidate rows, in their given order.
    pub fn rows(&self) -> &[SetCoverRow] {
        &self.rows
    }

    /// The target bitmap.
    pub fn target(&self) -> &RoaringBitmap {
        &self.target
    }

    /// Rows that cover a target bit no other row covers. Every feasible
    /// cover must contain all of them.
    pub fn unique_rows(&self) -> Vec<&SetCoverRow> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(i, row)| {
                let mut exclusive = &row.bits & &self.target;
                for (j, other) in self.rows.iter().enumerate() {
                    if *i != j {
                        exclusive -= &other.bits;
                    }
                    if exclusive.is_empty() {
                        break;
                    }
                }
                !exclusive.is_empty()
            })
            .map(|(_, row)| row)
            .collect()
    }

    /// The cheapest single row covering the whole target, if any covers
    /// it alone. Ties resolve to the earliest row.
    pub fn trivial_solution(&self) -> Option<SetCoverSolution> {
        self.rows
            .iter()
            .filter(|row| (&self.target - &row.bits).is_empty())
            .min_by_key(|row| row.cost)
            .map(|row| SetCoverSolution {
                rows: vec![row.clone()],
                cost: row.cost,
            })
    }

    /// Greedy cover: repeatedly take the row with the best
    /// newly-covered-per-cost ratio until the target is covered or no row
    /// adds coverage. May return a partial cover; used as the upper bound
    /// for the exact search.
    pub fn greedy_solution(&self) -> SetCoverSolution {
        let indices = greedy_indices(&self.rows, &self.target);
        self.solution_from_indices(&indices)
    }

    /// Exact minimum-cost cover via branch-and-bound.
    ///
    /// Unique rows are committed up front; the incumbent starts at the
    /// cheaper of the greedy extension and any trivial solution; subtrees
    /// are pruned when the running cost plus the cheapest remaining row
    /// cannot beat the incumbent. Uncoverable target bits are excluded
    /// from the search and reported in the result.
    pub fn solve(&self) -> SetCoverResult {
        let mut all_bits = RoaringBitmap::new();
        for row in &self.rows {
            all_bits |= &row.bits;
        }
        let uncovered = &self.target - &all_bits;
        let target = &self.target & &all_bits;

        if target.is_empty() {
            return SetCoverResult {
                solution: SetCoverSolution::default(),
                uncovered,
            };
        }

        // Commit the rows any feasible cover must contain.
        let unique: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(i, row)| {
                let mut exclusive = &row.bits & &target;
                for (j, other) in self.rows.iter().enumerate() {
                    if *i != j {
                        exclusive -= &other.bits;
                    }
                    if exclusive.is_empty() {
                        break;
                    }
                }
                !exclusive.is_empty()
            })
            .map(|(i, _)| i)
            .collect();

        let mut base_covered = RoaringBitmap::new();
        let mut base_cost = 0u64;
        for &i in &unique {
            base_covered |= &self.rows[i].bits;
            base_cost += self.rows[i].cost;
        }

        if (&target - &base_covered).is_empty() {
            let solution = self.solution_from_indices(&unique);
            debug!(cost = solution.cost, "set cover solved by unique rows");
            return SetCoverResult {
                solution,
                uncovered,
            };
        }

        let candidates: Vec<usize> = (0..self.rows.len())
            .filter(|i| !unique.contains(i))
            .collect();

        // Seed the incumbent: greedy extension of the committed rows, and
        // the trivial single-row cover when one exists.
        let remaining_target = &target - &base_covered;
        let candidate_rows: Vec<&SetCoverRow> =
            candidates.iter().map(|&i| &self.rows[i]).collect();
        let greedy_ext = greedy_ref_indices(&candidate_rows, &remaining_target);
        let mut best_indices: Vec<usize> = unique.clone();
        best_indices.extend(greedy_ext.iter().map(|&k| candidates[k]));
        let mut best_cost: u64 = best_indices.iter().map(|&i| self.rows[i].cost).sum();
        let mut best_complete = {
            let mut covered = RoaringBitmap::new();
            for &i in &best_indices {
                covered |= &self.rows[i].bits;
            }
            (&target - &covered).is_empty()
        };
        // A trivial row can only seed the incumbent when nothing was
        // committed: a unique row covering the whole target would have
        // returned above, and any other unique row contradicts a
        // full-cover row existing. At equal cost the single-row cover is
        // preferred over a multi-row one.
        if let Some(trivial) = self.trivial_solution().filter(|_| unique.is_empty()) {
            if !best_complete || trivial.cost <= best_cost {
                let index = self
                    .rows
                    .iter()
                    .position(|r| r.id == trivial.rows[0].id && r.cost == trivial.cost)
                    .unwrap_or(0);
                best_indices = vec![index];
                best_cost = trivial.cost;
                best_complete = true;
            }
        }

        // Suffix tables for the bound and the feasibility check.
        let n = candidates.len();
        let mut suffix_min_cost = vec![u64::MAX; n + 1];
        let mut suffix_union = vec![RoaringBitmap::new(); n + 1];
        for k in (0..n).rev() {
            let row = &self.rows[candidates[k]];
            suffix_min_cost[k] = suffix_min_cost[k + 1].min(row.cost);
            suffix_union[k] = suffix_union[k + 1].clone();
            suffix_union[k] |= &row.bits;
        }

        let mut chosen: Vec<usize> = Vec::new();
        branch(
            &self.rows,
            &candidates,
            &target,
            &suffix_min_cost,
            &suffix_union,
            0,
            base_covered,
            base_cost,
            &unique,
            &mut chosen,
            &mut best_indices,
            &mut best_cost,
            &mut best_complete,
        );

        let solution = self.solution_from_indices(&best_indices);
        debug!(
            cost = solution.cost,
            rows = solution.rows.len(),
            uncoverable = uncovered.len(),
            "set cover solved"
        );
        SetCoverResult {
            solution,
            uncovered,
        }
    }

    /// Summarize a result for diagnostics.
    pub fn stats(&self, result: &SetCoverResult) -> SetCoverStats {
        SetCoverStats {
            rows: self.rows.len(),
            chosen: result.solution.rows.len(),
            cost: result.solution.cost,
            uncovered: result.uncovered.len(),
        }
    }

    fn solution_from_indices(&self, indices: &[usize]) -> SetCoverSolution {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let rows: Vec<SetCoverRow> = sorted.iter().map(|&i| self.rows[i].clone()).collect();
        let cost = rows.iter().map(|r| r.cost).sum();
        SetCoverSolution { rows, cost }
    }
}

/// Greedy picks over owned rows; returns indices into `rows`.
fn greedy_indices(rows: &[SetCoverRow], target: &RoaringBitmap) -> Vec<usize> {
    let refs: Vec<&SetCoverRow> = rows.iter().collect();
    greedy_ref_indices(&refs, target)
}

/// Core greedy loop. Ratio comparison cross-multiplies so zero-cost rows
/// (perfect ancestors) order ahead of everything without division.
fn greedy_ref_indices(rows: &[&SetCoverRow], target: &RoaringBitmap) -> Vec<usize> {
    let mut picked: Vec<usize> = Vec::new();
    let mut remaining = target.clone();
    while !remaining.is_empty() {
        let mut best: Option<(usize, u64, u64)> = None; // (index, newly, cost)
        for (i, row) in rows.iter().enumerate() {
            if picked.contains(&i) {
                continue;
            }
            let newly = (&row.bits & &remaining).len();
            if newly == 0 {
                continue;
            }
            let better = match best {
                None => true,
                // a/b > c/d  ⟺  a·d > c·b, with ties broken by more
                // coverage, then lower cost, then earlier index.
                Some((_, b_newly, b_cost)) => {
                    let lhs = newly as u128 * b_cost as u128;
                    let rhs = b_newly as u128 * row.cost as u128;
                    lhs > rhs
                        || (lhs == rhs
                            && (newly > b_newly || (newly == b_newly && row.cost < b_cost)))
                }
            };
            if better {
                best = Some((i, newly, row.cost));
            }
        }
        match best {
            Some((i, _, _)) => {
                remaining -= &rows[i].bits;
                picked.push(i);
            }
            None => break,
        }
    }
    picked.sort_unstable();
    picked
}

#[allow(clippy::too_many_arguments)]
fn branch(
    rows: &[SetCoverRow],
    candidates: &[usize],
    target: &RoaringBitmap,
    suffix_min_cost: &[u64],
    suffix_union: &[RoaringBitmap],
    k: usize,
    covered: RoaringBitmap,
    cost: u64,
    base: &[usize],
    chosen: &mut Vec<usize>,
    best_indices: &mut Vec<usize>,
    best_cost: &mut u64,
    best_complete: &mut bool,
) {
    if (target - &covered).is_empty() {
        if !*best_complete || cost < *best_cost {
            let mut indices = base.to_vec();
            indices.extend(chosen.iter().copied());
            *best_indices = indices;
            *best_cost = cost;
            *best_complete = true;
        }
        return;
    }
    if k == candidates.len() {
        return;
    }
    // Infeasible: the remaining rows cannot close the gap.
    let mut reachable = covered.clone();
    reachable |= &suffix_union[k];
    if !(target - &reachable).is_empty() {
        return;
    }
    // Bound: at least one more row is needed.
    if *best_complete && cost.saturating_add(suffix_min_cost[k]) >= *best_cost {
        return;
    }

    let row = &rows[candidates[k]];
    // Include branch first so equal-cost optima keep the earliest rank.
    if !(&row.bits & &(target - &covered)).is_empty() {
        let mut next_covered = covered.clone();
        next_covered |= &row.bits;
        chosen.push(candidates[k]);
        branch(
            rows,
            candidates,
            target,
            suffix_min_cost,
            suffix_union,
            k + 1,
            next_covered,
            cost + row.cost,
            base,
            chosen,
            best_indices,
            best_cost,
            best_complete,
        );
        chosen.pop();
    }
    branch(
        rows,
        candidates,
        target,
        suffix_min_cost,
        suffix_union,
        k + 1,
        covered,
        cost,
        base,
        chosen,
        best_indices,
        best_cost,
        best_complete,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(values: &[u32]) -> RoaringBitmap {
        values.iter().copied().collect()
    }

    fn abc_rows() -> Vec<SetCoverRow> {
        vec![
            SetCoverRow::new("A", bits(&[0, 2, 3]), 3),
            SetCoverRow::new("B", bits(&[0, 3]), 2),
            SetCoverRow::new("C", bits(&[0, 1, 2, 3]), 4),
        ]
    }

    #[test]
    fn test_unique_rows() {
        // Bit 1 belongs to C alone, so C is in every feasible cover.
        let solver = SetCoverSolver::new(abc_rows(), bits(&[0, 1, 2, 3]));
        let unique = solver.unique_rows();
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].id.as_str(), "C");
    }

    #[test]
    fn test_trivial_solution() {
        let solver = SetCoverSolver::new(abc_rows(), bits(&[0, 1, 2, 3]));
        let trivial = solver.trivial_solution().unwrap();
        assert_eq!(trivial.rows.len(), 1);
        assert_eq!(trivial.rows[0].id.as_str(), "C");
        assert_eq!(trivial.cost, 4);
    }

    #[test]
    fn test_no_trivial_solution() {
        let rows = vec![
            SetCoverRow::new("A", bits(&[0, 1]), 1),
            SetCoverRow::new("B", bits(&[2, 3]), 1),
        ];
        let solver = SetCoverSolver::new(rows, bits(&[0, 1, 2, 3]));
        assert!(solver.trivial_solution().is_none());
    }

    #[test]
    fn test_greedy_solution() {
        // D has the best ratio (3 bits at cost 1); B closes bit 0 at a
        // better ratio than A.
        let rows = vec![
            SetCoverRow::new("A", bits(&[0, 2, 3]), 3),
            SetCoverRow::new("B", bits(&[0, 3]), 2),
            SetCoverRow::new("D", bits(&[1, 2, 3]), 1),
        ];
        let solver = SetCoverSolver::new(rows, bits(&[0, 1, 2, 3]));
        let greedy = solver.greedy_solution();
        assert_eq!(greedy.row_ids(), vec![WitnessId::from("B"), WitnessId::from("D")]);
        assert_eq!(greedy.cost, 3);
    }

    #[test]
    fn test_solve_exact_matches_greedy_here() {
        let rows = vec![
            SetCoverRow::new("A", bits(&[0, 2, 3]), 3),
            SetCoverRow::new("B", bits(&[0, 3]), 2),
            SetCoverRow::new("D", bits(&[1, 2, 3]), 1),
        ];
        let solver = SetCoverSolver::new(rows, bits(&[0, 1, 2, 3]));
        let result = solver.solve();
        assert!(result.uncovered.is_empty());
        assert_eq!(result.solution.cost, 3);
        assert_eq!(
            result.solution.row_ids(),
            vec![WitnessId::from("B"), WitnessId::from("D")]
        );
    }

    #[test]
    fn test_solve_trivial_beats_greedy() {
        // A full-cover row at cost 3 ties the two-row cover; the solver
        // keeps the single row it seeded as incumbent.
        let rows = vec![
            SetCoverRow::new("A", bits(&[0, 2, 3]), 3),
            SetCoverRow::new("B", bits(&[0, 3]), 2),
            SetCoverRow::new("C", bits(&[0, 1, 2, 3]), 3),
            SetCoverRow::new("D", bits(&[1, 2, 3]), 1),
        ];
        let solver = SetCoverSolver::new(rows, bits(&[0, 1, 2, 3]));
        let result = solver.solve();
        assert_eq!(result.solution.cost, 3);
        assert_eq!(result.solution.row_ids(), vec![WitnessId::from("C")]);
    }

    #[test]
    fn test_solve_exact_beats_greedy() {
        // Greedy takes E (ratio 3) then must add B (total 3); the exact
        // search finds {B} alone at cost 2.
        let rows = vec![
            SetCoverRow::new("E", bits(&[0, 1, 3]), 1),
            SetCoverRow::new("B", bits(&[0, 1, 2, 3]), 2),
            SetCoverRow::new("A", bits(&[0, 1, 2, 3]), 4),
        ];
        let solver = SetCoverSolver::new(rows, bits(&[0, 1, 2, 3]));
        let greedy = solver.greedy_solution();
        assert_eq!(greedy.cost, 3);
        let result = solver.solve();
        assert_eq!(result.solution.cost, 2);
        assert_eq!(result.solution.row_ids(), vec![WitnessId::from("B")]);
    }

    #[test]
    fn test_solve_uncoverable_reports_gap() {
        let rows = vec![SetCoverRow::new("A", bits(&[0, 1]), 1)];
        let solver = SetCoverSolver::new(rows, bits(&[0, 1, 5]));
        let result = solver.solve();
        assert_eq!(result.uncovered, bits(&[5]));
        assert_eq!(result.solution.row_ids(), vec![WitnessId::from("A")]);
        assert_eq!(result.solution.cost, 1);
    }

    #[test]
    fn test_solve_empty_target() {
        let solver = SetCoverSolver::new(abc_rows(), RoaringBitmap::new());
        let result = solver.solve();
        assert!(result.solution.rows.is_empty());
        assert_eq!(result.solution.cost, 0);
        assert!(result.uncovered.is_empty());
    }

    #[test]
    fn test_zero_cost_row_preferred() {
        let rows = vec![
            SetCoverRow::new("A", bits(&[0, 1]), 2),
            SetCoverRow::new("B", bits(&[0, 1]), 0),
        ];
        let solver = SetCoverSolver::new(rows, bits(&[0, 1]));
        let result = solver.solve();
        assert_eq!(result.solution.row_ids(), vec![WitnessId::from("B")]);
        assert_eq!(result.solution.cost, 0);
    }

    #[test]
    fn test_equal_cost_prefers_earlier_rank() {
        // Two disjoint pairs both cover at cost 2; the earlier-rank pair
        // must win.
        let rows = vec![
            SetCoverRow::new("A", bits(&[0]), 1),
            SetCoverRow::new("B", bits(&[1]), 1),
            SetCoverRow::new("C", bits(&[0]), 1),
            SetCoverRow::new("D", bits(&[1]), 1),
        ];
        let solver = SetCoverSolver::new(rows, bits(&[0, 1]));
        let result = solver.solve();
        assert_eq!(
            result.solution.row_ids(),
            vec![WitnessId::from("A"), WitnessId::from("B")]
        );
    }

    #[test]
    fn test_rows_not_mutated() {
        let rows = abc_rows();
        let solver = SetCoverSolver::new(rows.clone(), bits(&[0, 1, 2, 3]));
        let _ = solver.solve();
        assert_eq!(solver.rows(), &rows[..]);
    }
}
