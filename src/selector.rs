//! Cohort selection: the three selector shapes and the two filtering
//! semantics every metric builds on (cohort membership via `Iniciou` year,
//! period scoping via event timestamp year).

use std::collections::HashSet;

use chrono::Datelike;

use crate::catalog;
use crate::error::AnaliseError;
use crate::models::EventLogEntry;

/// A cohort selector: one entry year, an inclusive year range, or all years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohortSelector {
    Year(i32),
    Range(i32, i32),
    All,
}

impl CohortSelector {
    /// Parse the `selecao` / `selecao2` query parameters. An absent or
    /// `all` first parameter selects every cohort; a second parameter turns
    /// the selection into an inclusive range and must not precede the first.
    pub fn from_params(
        selecao: Option<&str>,
        selecao2: Option<&str>,
    ) -> Result<Self, AnaliseError> {
        let first = selecao.map(str::trim).filter(|s| !s.is_empty());
        let second = selecao2.map(str::trim).filter(|s| !s.is_empty());

        match (first, second) {
            (None, None) => Ok(Self::All),
            (Some(s), None) if s.eq_ignore_ascii_case("all") => Ok(Self::All),
            (Some(s), None) => s
                .parse::<i32>()
                .map(Self::Year)
                .map_err(|_| AnaliseError::InvalidSelector),
            (Some(a), Some(b)) => {
                let start: i32 = a.parse().map_err(|_| AnaliseError::InvalidSelector)?;
                let end: i32 = b.parse().map_err(|_| AnaliseError::InvalidSelector)?;
                if start > end {
                    return Err(AnaliseError::InvalidSelector);
                }
                Ok(Self::Range(start, end))
            }
            (None, Some(_)) => Err(AnaliseError::InvalidSelector),
        }
    }

    /// Whether a calendar year falls inside this selection.
    pub fn matches(&self, year: i32) -> bool {
        match *self {
            Self::Year(y) => year == y,
            Self::Range(start, end) => (start..=end).contains(&year),
            Self::All => true,
        }
    }
}

/// Students whose `Iniciou` year falls inside the selection (cohort
/// membership semantics).
pub fn cohort_students(log: &[EventLogEntry], selector: CohortSelector) -> HashSet<String> {
    log.iter()
        .filter(|e| e.activity == catalog::START_ACTIVITY && selector.matches(e.timestamp.year()))
        .map(|e| e.student.clone())
        .collect()
}

/// Events whose timestamp year falls inside the selection (period
/// semantics).
pub fn period_events<'a>(
    log: &'a [EventLogEntry],
    selector: CohortSelector,
) -> Vec<&'a EventLogEntry> {
    log.iter()
        .filter(|e| selector.matches(e.timestamp.year()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(student: &str, activity: &str, year: i32) -> EventLogEntry {
        EventLogEntry::new(student, activity, NaiveDate::from_ymd_opt(year, 6, 1).unwrap())
    }

    #[test]
    fn parses_all_three_shapes() {
        assert_eq!(CohortSelector::from_params(None, None).unwrap(), CohortSelector::All);
        assert_eq!(
            CohortSelector::from_params(Some("all"), None).unwrap(),
            CohortSelector::All
        );
        assert_eq!(
            CohortSelector::from_params(Some("2020"), None).unwrap(),
            CohortSelector::Year(2020)
        );
        assert_eq!(
            CohortSelector::from_params(Some("2019"), Some("2021")).unwrap(),
            CohortSelector::Range(2019, 2021)
        );
    }

    #[test]
    fn rejects_invalid_shapes() {
        assert!(CohortSelector::from_params(Some("twenty"), None).is_err());
        assert!(CohortSelector::from_params(Some("2020"), Some("x")).is_err());
        assert!(CohortSelector::from_params(Some("2022"), Some("2020")).is_err());
        assert!(CohortSelector::from_params(None, Some("2021")).is_err());
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let log = vec![
            entry("a", "QXD0001", 2019),
            entry("b", "QXD0001", 2020),
            entry("c", "QXD0001", 2021),
            entry("d", "QXD0001", 2023),
        ];
        let selected = period_events(&log, CohortSelector::Range(2020, 2022));
        let students: Vec<&str> = selected.iter().map(|e| e.student.as_str()).collect();
        assert_eq!(students, vec!["b", "c"]);
    }

    #[test]
    fn cohort_membership_uses_start_marker_year() {
        let log = vec![
            entry("a", catalog::START_ACTIVITY, 2020),
            entry("a", "QXD0001", 2022),
            entry("b", catalog::START_ACTIVITY, 2021),
        ];
        let members = cohort_students(&log, CohortSelector::Year(2020));
        assert!(members.contains("a"));
        assert!(!members.contains("b"));
        assert_eq!(cohort_students(&log, CohortSelector::All).len(), 2);
    }
}
