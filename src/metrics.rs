//! Per-course aggregate metrics over the canonical event log. Every function
//! is pure: it takes the immutable log plus a selector and returns a fresh
//! course-keyed map. Absent courses mean zero, never an error.

use std::collections::{BTreeMap, HashSet};

use chrono::Datelike;

use crate::catalog;
use crate::models::{EventLogEntry, StatusRow};
use crate::selector::{cohort_students, period_events, CohortSelector};

/// Approval tally for one course: approvals over the students sampled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CourseApproval {
    pub approvals: u64,
    pub students: u64,
}

impl CourseApproval {
    /// Approval rate in [0, 1]; 0 when nothing was sampled.
    pub fn rate(&self) -> f64 {
        if self.students == 0 {
            0.0
        } else {
            self.approvals as f64 / self.students as f64
        }
    }
}

/// First-graded-attempt approval rate per course, cohort semantics.
///
/// For each (student, course) pair the *second* chronological non-marker
/// event is the first one carrying an outcome tag; pairs attempted only once
/// contribute no data point. Only students whose `Iniciou` year matches the
/// selector are considered.
pub fn approval_rates(
    log: &[EventLogEntry],
    selector: CohortSelector,
) -> BTreeMap<String, CourseApproval> {
    let members = cohort_students(log, selector);

    let mut occurrence: BTreeMap<(&str, &str), u32> = BTreeMap::new();
    let mut tally: BTreeMap<String, CourseApproval> = BTreeMap::new();

    // The log is sorted by (student, timestamp), so iteration order is
    // chronological within each (student, course) pair.
    for event in log {
        if event.is_marker() || !members.contains(&event.student) {
            continue;
        }
        let course = event.course_code();
        let seen = occurrence
            .entry((event.student.as_str(), course))
            .or_insert(0);
        *seen += 1;
        if *seen != 2 {
            continue;
        }
        let entry = tally.entry(course.to_string()).or_default();
        entry.students += 1;
        if event.activity.ends_with(catalog::APPROVED_MARKER) {
            entry.approvals += 1;
        }
    }

    tally
}

/// Approval tally per course, period semantics: approvals are the
/// outcome-tagged approval events inside the window, the denominator is the
/// distinct students active in that course inside the window.
pub fn approval_rates_by_period(
    log: &[EventLogEntry],
    selector: CohortSelector,
) -> BTreeMap<String, CourseApproval> {
    let mut approvals: BTreeMap<String, u64> = BTreeMap::new();
    let mut students: BTreeMap<String, HashSet<&str>> = BTreeMap::new();

    for event in period_events(log, selector) {
        if event.is_marker() {
            continue;
        }
        let course = event.course_code();
        students
            .entry(course.to_string())
            .or_default()
            .insert(event.student.as_str());
        if event.activity.ends_with(catalog::APPROVED_MARKER) {
            *approvals.entry(course.to_string()).or_default() += 1;
        }
    }

    students
        .into_iter()
        .map(|(course, ids)| {
            let tally = CourseApproval {
                approvals: approvals.get(&course).copied().unwrap_or(0),
                students: ids.len() as u64,
            };
            (course, tally)
        })
        .collect()
}

/// Students holding a `verificador` event anywhere in the log.
pub fn graduated_students(log: &[EventLogEntry]) -> HashSet<&str> {
    log.iter()
        .filter(|e| e.activity == catalog::GRADUATION_ACTIVITY)
        .map(|e| e.student.as_str())
        .collect()
}

/// Per-course count of non-graduated cohort members who attempted the
/// course without ever producing an approval. Cohort membership semantics
/// apply to every selector shape.
pub fn bottlenecks(log: &[EventLogEntry], selector: CohortSelector) -> BTreeMap<String, u64> {
    let members = cohort_students(log, selector);
    let graduated = graduated_students(log);

    let mut attempted: BTreeMap<(&str, &str), bool> = BTreeMap::new();
    for event in log {
        if event.activity == catalog::START_ACTIVITY {
            continue;
        }
        if !members.contains(&event.student) || graduated.contains(event.student.as_str()) {
            continue;
        }
        let approved = attempted
            .entry((event.student.as_str(), event.course_code()))
            .or_insert(false);
        *approved |= event.activity.ends_with(catalog::APPROVED_MARKER);
    }

    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for ((_, course), approved) in attempted {
        if !approved {
            *counts.entry(course.to_string()).or_default() += 1;
        }
    }
    counts
}

/// Per-course count of events carrying `marker` in their activity code.
/// Year selectors scope by cohort membership, range selectors by event
/// period, `All` by nothing; both code paths are load-bearing.
pub fn marker_counts(
    log: &[EventLogEntry],
    selector: CohortSelector,
    marker: &str,
) -> BTreeMap<String, u64> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    match selector {
        CohortSelector::Year(_) => {
            let members = cohort_students(log, selector);
            for event in log {
                if event.activity.contains(marker) && members.contains(&event.student) {
                    *counts.entry(event.course_code().to_string()).or_default() += 1;
                }
            }
        }
        CohortSelector::Range(_, _) | CohortSelector::All => {
            for event in period_events(log, selector) {
                if event.activity.contains(marker) {
                    *counts.entry(event.course_code().to_string()).or_default() += 1;
                }
            }
        }
    }

    counts
}

/// Strict partition of the selected cohort into Formados (graduated),
/// Ativos (active in the last captured year) and Evadidos (the rest).
pub fn cohort_status(log: &[EventLogEntry], selector: CohortSelector) -> Vec<StatusRow> {
    let members = cohort_students(log, selector);
    let graduated = graduated_students(log);

    let graduated_count = members
        .iter()
        .filter(|s| graduated.contains(s.as_str()))
        .count() as u64;

    let active: HashSet<&str> = log
        .iter()
        .filter(|e| {
            e.timestamp.year() == catalog::LAST_CAPTURED_YEAR
                && members.contains(&e.student)
                && !graduated.contains(e.student.as_str())
        })
        .map(|e| e.student.as_str())
        .collect();

    let withdrawn = members.len() as u64 - graduated_count - active.len() as u64;

    vec![
        StatusRow {
            status: "Formados".to_string(),
            count: graduated_count,
        },
        StatusRow {
            status: "Ativos".to_string(),
            count: active.len() as u64,
        },
        StatusRow {
            status: "Evadidos".to_string(),
            count: withdrawn,
        },
    ]
}
