//! Outer-join of the four per-course metrics into the consolidated table
//! served by the JSON endpoints.

use std::collections::BTreeSet;

use crate::catalog;
use crate::metrics;
use crate::models::{CourseMetricRow, EventLogEntry};
use crate::selector::CohortSelector;

/// Round an approval rate into a percentage with two decimals.
fn as_percentage(rate: f64) -> f64 {
    (rate * 10_000.0).round() / 100.0
}

/// One row per course code appearing in *any* of the four metrics (union,
/// not intersection); missing cells are zero-filled, display names fall back
/// to the unknown sentinel. Rows come out sorted by course code.
pub fn consolidate(log: &[EventLogEntry], selector: CohortSelector) -> Vec<CourseMetricRow> {
    let bottlenecks = metrics::bottlenecks(log, selector);
    let approvals = metrics::approval_rates(log, selector);
    let suppressions = metrics::marker_counts(log, selector, catalog::SUPPRESSION_MARKER);
    let locks = metrics::marker_counts(log, selector, catalog::LOCK_MARKER);

    let codes: BTreeSet<&String> = bottlenecks
        .keys()
        .chain(approvals.keys())
        .chain(suppressions.keys())
        .chain(locks.keys())
        .collect();

    codes
        .into_iter()
        .map(|code| CourseMetricRow {
            code: code.clone(),
            name: catalog::course_name_or_unknown(code).to_string(),
            bottlenecks: bottlenecks.get(code).copied().unwrap_or(0),
            approval_rate: as_percentage(approvals.get(code).map(|t| t.rate()).unwrap_or(0.0)),
            suppressions: suppressions.get(code).copied().unwrap_or(0),
            locks: locks.get(code).copied().unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventlog::build_event_log;
    use crate::eventlog::tests::record;

    #[test]
    fn rows_cover_the_union_of_metric_keys() {
        let rows = vec![
            // QXD0001: approval data only.
            record("a1", "QXD0001", "APROVADO", "2018", "1"),
            // QXD0005: bottleneck only (failed, never approved).
            record("a1", "QXD0005", "REPROVADO", "2018", "2"),
            // QXD0010: suppression only.
            record("a1", "QXD0010", "SUPRIMIDO", "2019", "1"),
            // QXD0013: lock only.
            record("a1", "QXD0013", "TRANCADO", "2019", "2"),
        ];
        let table = consolidate(&build_event_log(&rows), CohortSelector::All);

        let codes: Vec<&str> = table.iter().map(|row| row.code.as_str()).collect();
        assert_eq!(codes, vec!["QXD0001", "QXD0005", "QXD0010", "QXD0013"]);

        for row in &table {
            assert!(row.approval_rate >= 0.0 && row.approval_rate <= 100.0);
            assert_ne!(row.name, "");
        }

        let qxd0001 = table.iter().find(|r| r.code == "QXD0001").unwrap();
        assert_eq!(qxd0001.approval_rate, 100.0);
        assert_eq!(qxd0001.bottlenecks, 0);

        let qxd0010 = table.iter().find(|r| r.code == "QXD0010").unwrap();
        assert_eq!(qxd0010.suppressions, 1);
        assert_eq!(qxd0010.locks, 0);
    }

    #[test]
    fn two_student_scenario_consolidates_as_expected() {
        // Student A approves both courses at the first graded attempt;
        // student B approves one and fails-then-approves the other.
        let rows = vec![
            record("a", "QXD0001", "APROVADO", "2020", "1"),
            record("a", "QXD0005", "APROVADO", "2020", "2"),
            record("b", "QXD0001", "APROVADO", "2020", "1"),
            record("b", "QXD0005", "REPROVADO", "2020", "2"),
            record("b", "QXD0005", "APROVADO", "2021", "1"),
        ];
        let log = build_event_log(&rows);
        let table = consolidate(&log, CohortSelector::Year(2020));

        let course1 = table.iter().find(|r| r.code == "QXD0001").unwrap();
        assert_eq!(course1.approval_rate, 100.0);

        // B's first graded attempt at QXD0005 was a failure; the later
        // approval is never inspected.
        let course2 = table.iter().find(|r| r.code == "QXD0005").unwrap();
        assert_eq!(course2.approval_rate, 50.0);

        // Neither student crosses the graduation threshold.
        let status = metrics::cohort_status(&log, CohortSelector::Year(2020));
        assert_eq!(status[0].count, 0, "nobody graduates in the toy scenario");
        let total: u64 = status.iter().map(|row| row.count).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn empty_cohort_yields_empty_table() {
        let rows = vec![record("a", "QXD0001", "APROVADO", "2020", "1")];
        let table = consolidate(&build_event_log(&rows), CohortSelector::Year(1999));
        assert!(table.is_empty());
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(as_percentage(1.0 / 3.0), 33.33);
        assert_eq!(as_percentage(0.0), 0.0);
        assert_eq!(as_percentage(1.0), 100.0);
    }
}
