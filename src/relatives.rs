//! Pairwise comparison report for a subject witness at one passage.
//!
//! Mirrors the classic find-relatives table: every other witness with its
//! genealogical direction, its rank as a potential ancestor, its readings
//! at the passage, and the full comparison metrics. Rows are plain data;
//! the fixed-width writer here is one rendering, and boundary crates can
//! format the same rows however they like.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::apparatus::Apparatus;
use crate::error::CbgmError;
use crate::types::{Direction, ReadingId, WitnessId};
use crate::witness::{Witness, WitnessComparison};

/// One row of the report: a secondary witness compared to the subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativesRow {
    /// Comparison metrics against the subject.
    #[serde(flatten)]
    pub comparison: WitnessComparison,
    /// One-based rank among the subject's potential ancestors; `None`
    /// for witnesses of equal or posterior priority.
    pub rank: Option<usize>,
    /// The secondary witness's readings at the passage (empty when
    /// lacunose).
    pub readings: Vec<ReadingId>,
}

/// The full report for a subject witness at one passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelativesReport {
    /// The subject witness.
    pub subject: WitnessId,
    /// Label of the passage.
    pub passage: String,
    /// The subject's readings at the passage (empty when lacunose).
    pub subject_readings: Vec<ReadingId>,
    /// Comparison rows, sorted by agreement percentage.
    pub rows: Vec<RelativesRow>,
}

/// Build the comparison report for `subject` at the passage named by
/// `selector` (unit ID, label, or decimal index).
///
/// `witnesses` must be the finalized witness set; `threshold` is only
/// used to phrase the error when the subject was excluded by it.
pub fn find_relatives(
    app: &Apparatus,
    witnesses: &[Witness],
    subject: &WitnessId,
    selector: &str,
    threshold: usize,
) -> Result<RelativesReport, CbgmError> {
    let (_, unit) = app.find_unit(selector)?;
    if !app.contains_witness(subject) {
        return Err(CbgmError::UnknownSelector(format!(
            "witness {} is not in the witness list",
            subject
        )));
    }
    let subject_wit = witnesses
        .iter()
        .find(|w| w.id() == subject)
        .ok_or_else(|| CbgmError::ThresholdExcludesSubject {
            witness: subject.clone(),
            extant: app.extant_count(subject),
            threshold,
        })?;

    let mut comparisons: Vec<WitnessComparison> = witnesses
        .iter()
        .filter(|w| w.id() != subject)
        .map(|w| subject_wit.compare(w))
        .collect();
    comparisons.sort_by(|a, b| b.perc_cmp(a));

    let mut rows = Vec::with_capacity(comparisons.len());
    let mut next_rank = 1usize;
    for comparison in comparisons {
        let rank = match comparison.dir {
            Direction::Ancestor => {
                let rank = next_rank;
                next_rank += 1;
                Some(rank)
            }
            _ => None,
        };
        let readings: Vec<ReadingId> = unit
            .support(&comparison.id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        rows.push(RelativesRow {
            comparison,
            rank,
            readings,
        });
    }

    Ok(RelativesReport {
        subject: subject.clone(),
        passage: unit.label().to_string(),
        subject_readings: unit
            .support(subject)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default(),
        rows,
    })
}

fn join_readings(readings: &[ReadingId]) -> String {
    if readings.is_empty() {
        "-".to_string()
    } else {
        readings
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Write the report as a fixed-width table. When `filter` names a
/// reading, only secondaries attesting it are listed.
pub fn write_relatives_table(
    out: &mut impl Write,
    report: &RelativesReport,
    filter: Option<&ReadingId>,
) -> io::Result<()> {
    if report.subject_readings.is_empty() {
        writeln!(
            out,
            "Relatives of W1 = {} at {} (W1 is lacunose):",
            report.subject, report.passage
        )?;
    } else {
        writeln!(
            out,
            "Relatives of W1 = {} at {} (W1 RDG = {}):",
            report.subject,
            report.passage,
            join_readings(&report.subject_readings)
        )?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "{:<8}{:<4}{:>8}    {:<8}{:>8}{:>12}{:>8}{:>8}{:>8}{:>8}",
        "W2", "DIR", "NR", "RDG", "PASS", "PERC", "EQ", "W1>W2", "W1<W2", "NOREL"
    )?;
    writeln!(out)?;
    for row in &report.rows {
        if let Some(wanted) = filter {
            if !row.readings.contains(wanted) {
                continue;
            }
        }
        let c = &row.comparison;
        writeln!(
            out,
            "{:<8}{:<4}{:>8}    {:<8}{:>8}{:>11.3}%{:>8}{:>8}{:>8}{:>8}",
            c.id.as_str(),
            c.dir.glyph(),
            row.rank.map(|r| r.to_string()).unwrap_or_default(),
            join_readings(&row.readings),
            c.pass,
            c.perc,
            c.eq,
            c.prior,
            c.posterior,
            c.norel
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisOptions;
    use crate::types::{CollationReading, CollationUnit};
    use crate::witness::build_witnesses;

    fn wid(s: &str) -> WitnessId {
        WitnessId::from(s)
    }

    fn rid(s: &str) -> ReadingId {
        ReadingId::from(s)
    }

    /// Same five-witness collation as the witness-module fixture.
    fn make_records() -> Vec<CollationUnit> {
        vec![
            CollationUnit::new("u1")
                .with_reading(CollationReading::new("a", "one", vec![wid("A"), wid("B"), wid("E")]))
                .with_reading(CollationReading::new("b", "two", vec![wid("C"), wid("D")]))
                .with_edge("a", "b"),
            CollationUnit::new("u2")
                .with_reading(CollationReading::new("a", "one", vec![wid("A")]))
                .with_reading(CollationReading::new("b", "two", vec![wid("B"), wid("C"), wid("E")]))
                .with_reading(CollationReading::new("c", "three", vec![wid("D")]))
                .with_edge("a", "b")
                .with_edge("a", "c"),
            CollationUnit::new("u3")
                .with_reading(CollationReading::new("a", "one", vec![wid("A"), wid("B")]))
                .with_reading(CollationReading::new("b", "two", vec![wid("C")]))
                .with_reading(CollationReading::new("d", "four", vec![wid("D")]))
                .with_edge("a", "b")
                .with_edge("b", "d"),
            CollationUnit::new("u4")
                .with_connectivity(10)
                .with_reading(CollationReading::new("a", "one", vec![wid("A")]))
                .with_reading(CollationReading::new(
                    "b",
                    "two",
                    vec![wid("B"), wid("C"), wid("D"), wid("E")],
                ))
                .with_reading(CollationReading::new("c", "three", vec![]))
                .with_edge("a", "b")
                .with_edge("a", "c"),
        ]
    }

    fn make_report(subject: &str, selector: &str) -> RelativesReport {
        let app = Apparatus::new(
            vec![wid("A"), wid("B"), wid("C"), wid("D"), wid("E")],
            &make_records(),
            &AnalysisOptions::default(),
        )
        .unwrap();
        let (witnesses, _) = build_witnesses(&app, 0).unwrap();
        find_relatives(&app, &witnesses, &wid(subject), selector, 0).unwrap()
    }

    #[test]
    fn test_rows_sorted_and_ranked() {
        let report = make_report("C", "u4");
        let order: Vec<&str> = report
            .rows
            .iter()
            .map(|r| r.comparison.id.as_str())
            .collect();
        // E leads on perc; B and D tie at 50 and keep canonical order;
        // only ancestors are ranked.
        assert_eq!(order, vec!["E", "B", "D", "A"]);
        assert_eq!(report.rows[0].rank, Some(1));
        assert_eq!(report.rows[1].rank, Some(2));
        assert_eq!(report.rows[2].rank, None);
        assert_eq!(report.rows[3].rank, Some(3));
    }

    #[test]
    fn test_subject_readings_and_row_readings() {
        let report = make_report("C", "u4");
        assert_eq!(report.subject_readings, vec![rid("b")]);
        let a_row = report
            .rows
            .iter()
            .find(|r| r.comparison.id.as_str() == "A")
            .unwrap();
        assert_eq!(a_row.readings, vec![rid("a")]);
    }

    #[test]
    fn test_lacunose_secondary_renders_dash() {
        let report = make_report("C", "u3");
        let e_row = report
            .rows
            .iter()
            .find(|r| r.comparison.id.as_str() == "E")
            .unwrap();
        assert!(e_row.readings.is_empty());

        let mut buf = Vec::new();
        write_relatives_table(&mut buf, &report, None).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Relatives of W1 = C at u3 (W1 RDG = b):"));
        assert!(text.lines().any(|l| l.starts_with("E") && l.contains("-")));
    }

    #[test]
    fn test_reading_filter() {
        let report = make_report("C", "u4");
        let mut buf = Vec::new();
        write_relatives_table(&mut buf, &report, Some(&rid("a"))).unwrap();
        let text = String::from_utf8(buf).unwrap();
        // Only A attests reading a at u4.
        assert!(text.lines().any(|l| l.starts_with("A")));
        assert!(!text.lines().any(|l| l.starts_with("B")));
    }

    #[test]
    fn test_unknown_passage_and_witness() {
        let app = Apparatus::new(
            vec![wid("A"), wid("B"), wid("C"), wid("D"), wid("E")],
            &make_records(),
            &AnalysisOptions::default(),
        )
        .unwrap();
        let (witnesses, _) = build_witnesses(&app, 0).unwrap();
        assert!(matches!(
            find_relatives(&app, &witnesses, &wid("C"), "nope", 0),
            Err(CbgmError::UnknownSelector(_))
        ));
        assert!(matches!(
            find_relatives(&app, &witnesses, &wid("GHOST"), "u4", 0),
            Err(CbgmError::UnknownSelector(_))
        ));
    }

    #[test]
    fn test_threshold_excluded_subject() {
        let app = Apparatus::new(
            vec![wid("A"), wid("B"), wid("C"), wid("D"), wid("E")],
            &make_records(),
            &AnalysisOptions::default(),
        )
        .unwrap();
        // E (extant at 3 of 4 units) misses the bar.
        let (witnesses, _) = build_witnesses(&app, 4).unwrap();
        let result = find_relatives(&app, &witnesses, &wid("E"), "u4", 4);
        assert!(matches!(
            result,
            Err(CbgmError::ThresholdExcludesSubject {
                extant: 3,
                threshold: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_table_deterministic() {
        let report = make_report("C", "u4");
        let mut first = Vec::new();
        let mut second = Vec::new();
        write_relatives_table(&mut first, &report, None).unwrap();
        write_relatives_table(&mut second, &report, None).unwrap();
        assert_eq!(first, second);
    }
}
