use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One raw enrollment row as it appears in the source CSV. Year and term are
/// kept as raw strings; rows that fail lenient parsing drop out of the
/// year-based filters instead of aborting the load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct EnrollmentRecord {
    #[serde(rename = "id_discente")]
    pub student: String,
    #[serde(rename = "codigo")]
    pub course: String,
    #[serde(rename = "resultado")]
    pub outcome: String,
    #[serde(rename = "ano")]
    pub year: String,
    #[serde(rename = "periodo")]
    pub term: String,
}

/// One entry of the canonical event log: either a bare course event, an
/// outcome-tagged event (`<course>_<OUTCOME>`), or one of the synthetic
/// markers (`Iniciou`, `verificador`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventLogEntry {
    #[serde(rename = "id_discente")]
    pub student: String,
    pub activity: String,
    pub timestamp: NaiveDate,
}

impl EventLogEntry {
    pub fn new(
        student: impl Into<String>,
        activity: impl Into<String>,
        timestamp: NaiveDate,
    ) -> Self {
        Self {
            student: student.into(),
            activity: activity.into(),
            timestamp,
        }
    }

    /// The course code portion of the activity (`QXD0001_APROVADO` → `QXD0001`).
    pub fn course_code(&self) -> &str {
        self.activity.split('_').next().unwrap_or(&self.activity)
    }

    /// True for the synthetic `Iniciou` / `verificador` markers.
    pub fn is_marker(&self) -> bool {
        self.activity == crate::catalog::START_ACTIVITY
            || self.activity == crate::catalog::GRADUATION_ACTIVITY
    }
}

/// One row of the consolidated per-course metric table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseMetricRow {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "gargalos")]
    pub bottlenecks: u64,
    #[serde(rename = "taxa_aprovacao")]
    pub approval_rate: f64,
    #[serde(rename = "supressoes")]
    pub suppressions: u64,
    #[serde(rename = "trancamentos")]
    pub locks: u64,
}

/// One bucket of the cohort status breakdown (Formados / Ativos / Evadidos).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Quantidade")]
    pub count: u64,
}
