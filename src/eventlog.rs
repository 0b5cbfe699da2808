//! Canonical event log construction: raw enrollment rows in, a fully sorted
//! per-student activity log out, with the synthetic `Iniciou` and
//! `verificador` markers appended.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use anyhow::Context;
use chrono::{Datelike, Months, NaiveDate};

use crate::catalog;
use crate::models::{EnrollmentRecord, EventLogEntry};

/// Read the raw enrollment CSV whole into memory.
pub fn load_enrollments(path: &Path) -> anyhow::Result<Vec<EnrollmentRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open enrollment CSV {}", path.display()))?;
    let mut records = Vec::new();
    for result in reader.deserialize::<EnrollmentRecord>() {
        records.push(result.context("malformed enrollment row")?);
    }
    Ok(records)
}

/// Write a canonical event log as CSV (`id_discente,activity,timestamp`).
pub fn write_event_log(path: &Path, log: &[EventLogEntry]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for entry in log {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

/// Build the canonical event log from raw enrollment rows.
///
/// Pure and deterministic: duplicate rows are collapsed, rows outside the
/// captured years or the mandatory allow-list are dropped, the legacy course
/// code is remapped, and every surviving row yields a bare course event
/// (term 1 → Feb 1, term 2 → Aug 1) plus an outcome-tagged event four months
/// later (Jun 1 / Dec 1). Students reaching the graduation threshold get one
/// `verificador` event one day after their last approval; every student with
/// at least one event gets one `Iniciou` event strictly before everything
/// else. The result is sorted by (student, timestamp).
pub fn build_event_log(records: &[EnrollmentRecord]) -> Vec<EventLogEntry> {
    let mut seen: HashSet<&EnrollmentRecord> = HashSet::new();
    let mut events: Vec<EventLogEntry> = Vec::new();

    for record in records {
        if !seen.insert(record) {
            continue;
        }
        // Rows with an unparseable year fall out of the year filter, by the
        // same lenient-coercion rule the source data has always had.
        let Ok(year) = record.year.trim().parse::<i32>() else {
            continue;
        };
        if year >= catalog::CUTOFF_YEAR {
            continue;
        }
        if !catalog::is_mandatory(&record.course) {
            continue;
        }
        let course = if record.course == catalog::LEGACY_CODE {
            catalog::LEGACY_REPLACEMENT
        } else {
            record.course.as_str()
        };
        // Collapse the spelled-out absence failure, then strip any leftover
        // whitespace variants before tagging.
        let outcome = record
            .outcome
            .replace("REP. FALTA", "REPFALTA")
            .replace(' ', "");

        let term_one = record.term.trim() == "1";
        let base_month = if term_one { 2 } else { 8 };
        let Some(base) = NaiveDate::from_ymd_opt(year, base_month, 1) else {
            continue;
        };
        let Some(graded) = NaiveDate::from_ymd_opt(year, base_month + 4, 1) else {
            continue;
        };

        events.push(EventLogEntry::new(record.student.clone(), course, base));
        events.push(EventLogEntry::new(
            record.student.clone(),
            format!("{course}_{outcome}"),
            graded,
        ));
    }

    append_graduation_markers(&mut events);
    append_start_markers(&mut events);

    events.sort_by(|a, b| (&a.student, a.timestamp).cmp(&(&b.student, b.timestamp)));
    events
}

/// One `verificador` event per student holding approvals for at least
/// `GRADUATION_THRESHOLD` distinct courses, dated one day after the latest
/// approval.
fn append_graduation_markers(events: &mut Vec<EventLogEntry>) {
    let mut approvals: BTreeMap<&str, (BTreeSet<&str>, NaiveDate)> = BTreeMap::new();
    for event in events.iter() {
        if !event.activity.ends_with(catalog::APPROVED_MARKER) {
            continue;
        }
        let entry = approvals
            .entry(event.student.as_str())
            .or_insert_with(|| (BTreeSet::new(), event.timestamp));
        entry.0.insert(event.activity.as_str());
        entry.1 = entry.1.max(event.timestamp);
    }

    let graduates: Vec<EventLogEntry> = approvals
        .into_iter()
        .filter(|(_, (courses, _))| courses.len() >= catalog::GRADUATION_THRESHOLD)
        .filter_map(|(student, (_, last))| {
            last.succ_opt()
                .map(|ts| EventLogEntry::new(student, catalog::GRADUATION_ACTIVITY, ts))
        })
        .collect();
    events.extend(graduates);
}

/// One `Iniciou` event per student, one month before their earliest event,
/// clamped to Jan 1 when the earliest event already falls in January.
fn append_start_markers(events: &mut Vec<EventLogEntry>) {
    let mut earliest: BTreeMap<&str, NaiveDate> = BTreeMap::new();
    for event in events.iter() {
        earliest
            .entry(event.student.as_str())
            .and_modify(|ts| *ts = (*ts).min(event.timestamp))
            .or_insert(event.timestamp);
    }

    let starts: Vec<EventLogEntry> = earliest
        .into_iter()
        .filter_map(|(student, first)| {
            let jan_first = NaiveDate::from_ymd_opt(first.year(), 1, 1);
            let ts = if first.month() > 1 {
                first.checked_sub_months(Months::new(1)).or(jan_first)
            } else {
                jan_first
            };
            ts.map(|ts| EventLogEntry::new(student, catalog::START_ACTIVITY, ts))
        })
        .collect();
    events.extend(starts);
}
