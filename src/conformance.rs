//! Aggregation of replay diagnostics: per-place token residue, residue
//! re-keyed onto courses via the model's arc structure, and graduated vs
//! non-graduated averages for the bar-chart summary.

use std::collections::BTreeMap;

use crate::catalog;
use crate::models::EventLogEntry;
use crate::petri::ProcessModel;
use crate::replay::{traces_from, ReplayDiagnostic, ReplayOracle};
use crate::selector::{period_events, CohortSelector};

/// Averages of the replay metrics over one trace partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct GroupAverages {
    pub traces: u64,
    pub fitness: f64,
    pub missing_tokens: f64,
    pub consumed_tokens: f64,
    pub remaining_tokens: f64,
}

/// Consolidated conformance output for one period-scoped replay run.
#[derive(Debug, Clone, Default)]
pub struct ConformanceSummary {
    pub tokens_by_place: BTreeMap<String, u64>,
    pub tokens_by_course: BTreeMap<String, u64>,
    pub graduated: GroupAverages,
    pub not_graduated: GroupAverages,
}

/// Filter the log to the selected period, replay it through the oracle and
/// aggregate. An empty period yields all-zero aggregates, never an error.
pub fn run(
    log: &[EventLogEntry],
    selector: CohortSelector,
    model: &ProcessModel,
    oracle: &dyn ReplayOracle,
) -> ConformanceSummary {
    let events = period_events(log, selector);
    let traces = traces_from(&events);
    let diagnostics = oracle.replay(&traces, model);
    summarize(&diagnostics, model)
}

pub fn summarize(diagnostics: &[ReplayDiagnostic], model: &ProcessModel) -> ConformanceSummary {
    let tokens_by_place = consolidate_reached_markings(diagnostics);
    let tokens_by_course = tokens_by_course(model, &tokens_by_place);
    let (graduated, not_graduated) = group_averages(diagnostics);
    ConformanceSummary {
        tokens_by_place,
        tokens_by_course,
        graduated,
        not_graduated,
    }
}

/// Sum of leftover tokens per place across all traces.
pub fn consolidate_reached_markings(
    diagnostics: &[ReplayDiagnostic],
) -> BTreeMap<String, u64> {
    let mut consolidated: BTreeMap<String, u64> = BTreeMap::new();
    for diagnostic in diagnostics {
        for (place, tokens) in &diagnostic.reached_marking {
            *consolidated.entry(place.clone()).or_default() += tokens;
        }
    }
    consolidated
}

/// Re-key per-place residue onto courses. A place counts toward a course
/// when that course's raw transition feeds it and an approved-outcome
/// transition drains it, i.e. the place sits on the course's raw → approved
/// path.
pub fn tokens_by_course(
    model: &ProcessModel,
    tokens_by_place: &BTreeMap<String, u64>,
) -> BTreeMap<String, u64> {
    let mut by_course: BTreeMap<String, u64> = BTreeMap::new();

    for place in &model.places {
        let feeding_courses: Vec<&str> = model
            .incoming_labels(&place.id)
            .into_iter()
            .filter(|label| catalog::is_course_code(label))
            .collect();
        let drains_approval = model
            .outgoing_labels(&place.id)
            .iter()
            .any(|label| label.ends_with(catalog::APPROVED_MARKER));

        if feeding_courses.is_empty() || !drains_approval {
            continue;
        }
        let residue = tokens_by_place.get(&place.id).copied().unwrap_or(0);
        for course in feeding_courses {
            *by_course.entry(course.to_string()).or_default() += residue;
        }
    }

    by_course
}

/// Partition traces by graduation (the `verificador` transition fired) and
/// average each replay metric per partition.
pub fn group_averages(diagnostics: &[ReplayDiagnostic]) -> (GroupAverages, GroupAverages) {
    let mut graduated = GroupAverages::default();
    let mut not_graduated = GroupAverages::default();

    for diagnostic in diagnostics {
        let group = if diagnostic.reached_graduation() {
            &mut graduated
        } else {
            &mut not_graduated
        };
        group.traces += 1;
        group.fitness += diagnostic.fitness;
        group.missing_tokens += diagnostic.missing_tokens as f64;
        group.consumed_tokens += diagnostic.consumed_tokens as f64;
        group.remaining_tokens += diagnostic.remaining_tokens as f64;
    }

    for group in [&mut graduated, &mut not_graduated] {
        if group.traces > 0 {
            let n = group.traces as f64;
            group.fitness /= n;
            group.missing_tokens /= n;
            group.consumed_tokens /= n;
            group.remaining_tokens /= n;
        }
    }

    (graduated, not_graduated)
}
