//! Fixed reference data for the Computer Science curriculum: the mandatory
//! course allow-list, display names, the row layout used by the flow
//! diagrams, and the prerequisite edges. Loaded into the binary as constants
//! and never mutated.

/// Synthetic cohort-entry marker activity.
pub const START_ACTIVITY: &str = "Iniciou";

/// Synthetic graduation marker activity.
pub const GRADUATION_ACTIVITY: &str = "verificador";

/// Suffix of an approved outcome-tagged activity.
pub const APPROVED_MARKER: &str = "_APROVADO";

/// Substring marking a suppressed enrollment.
pub const SUPPRESSION_MARKER: &str = "_SUPRIMIDO";

/// Substring marking a locked (withdrawn-term) enrollment.
pub const LOCK_MARKER: &str = "_TRANCADO";

/// First year for which the dataset is not fully captured; rows at or past
/// this year are dropped during log construction.
pub const CUTOFF_YEAR: i32 = 2024;

/// Most recent fully captured year, used by the Active/Withdrawn split.
pub const LAST_CAPTURED_YEAR: i32 = CUTOFF_YEAR - 1;

/// Distinct approved courses required before a `verificador` event is
/// synthesized for a student.
pub const GRADUATION_THRESHOLD: usize = 33;

/// Legacy course code still present in older records and its successor.
pub const LEGACY_CODE: &str = "QXD0221";
pub const LEGACY_REPLACEMENT: &str = "QXD0038";

/// Display name used when a course code has no entry in the name table.
pub const UNKNOWN_COURSE_NAME: &str = "Desconhecido";

/// Mandatory course codes; everything else is filtered out of the log.
/// Includes the legacy code, which is remapped after filtering.
pub const MANDATORY_COURSES: [&str; 34] = [
    "QXD0001", "QXD0005", "QXD0056", "QXD0103", "QXD0108", "QXD0109",
    "QXD0006", "QXD0007", "QXD0008", "QXD0010", "QXD0013",
    "QXD0012", "QXD0017", "QXD0040", "QXD0114", "QXD0115",
    "QXD0011", "QXD0014", "QXD0016", "QXD0041", "QXD0116",
    "QXD0020", "QXD0021", "QXD0025", "QXD0119", "QXD0120",
    "QXD0019", "QXD0037", "QXD0038", "QXD0221", "QXD0043", "QXD0046",
    "QXD0029", "QXD0110",
];

pub fn is_mandatory(code: &str) -> bool {
    MANDATORY_COURSES.contains(&code)
}

/// True for codes that name a real course after legacy remapping (the
/// markers and outcome-tagged variants do not qualify).
pub fn is_course_code(code: &str) -> bool {
    code != LEGACY_CODE && is_mandatory(code)
}

/// Display name for a course code, when known.
pub fn course_name(code: &str) -> Option<&'static str> {
    let name = match code {
        "QXD0001" => "Fund. de Programação",
        "QXD0108" => "Introdução à CC",
        "QXD0005" => "Arquitet. de Computadores",
        "QXD0056" => "Matemática Básica",
        "QXD0109" => "Pré-Cálculo",
        "QXD0103" => "Ética, Direito e Legislação",
        "QXD0007" => "Program. Orient. a Objetos",
        "QXD0010" => "Estrutura de dados",
        "QXD0008" => "Matemática Discreta",
        "QXD0006" => "Cálc. Diferencial e Integral I",
        "QXD0013" => "Sistemas Operacionais",
        "QXD0114" => "Program. Funcional",
        "QXD0115" => "Estrutura de Dados Avanç.",
        "QXD0040" => "Ling. Formais e Autômatos",
        "QXD0017" => "Lógica para Computação",
        "QXD0012" => "Probabilidade de Estatística",
        "QXD0016" => "Linguagens de Program.",
        "QXD0041" => "Proj. e Análise de Algoritmo",
        "QXD0011" => "Fund. de Banco de Dados",
        "QXD0014" => "Análise e Proj. de Sistemas",
        "QXD0116" => "Álgebra Linear",
        "QXD0020" => "Desenv. de Software p/ Web",
        "QXD0119" => "Computação Gráfica",
        "QXD0120" => "Matemática Computacional",
        "QXD0025" => "Compiladores",
        "QXD0021" => "Redes de Computadores",
        "QXD0046" => "Teoria da Computação",
        "QXD0037" => "Inteligência Artificial",
        "QXD0019" => "Engenharia de Software",
        "QXD0038" => "Interf. Humano-Comp.",
        "QXD0043" => "Sistemas Distribuídos",
        "QXD0110" => "Proj. Pesq. Científ. e Tec.",
        "QXD0029" => "Empreendedorismo",
        _ => return None,
    };
    Some(name)
}

/// Display name with the `Desconhecido` sentinel for unmapped codes.
pub fn course_name_or_unknown(code: &str) -> &'static str {
    course_name(code).unwrap_or(UNKNOWN_COURSE_NAME)
}

/// Curriculum rows: each inner slice is one semester-level row of the flow
/// diagram, drawn top to bottom.
pub const CURRICULUM_ROWS: [&[&str]; 7] = [
    &["QXD0001", "QXD0108", "QXD0005", "QXD0109", "QXD0103", "QXD0056"],
    &["QXD0007", "QXD0010", "QXD0013", "QXD0006", "QXD0008"],
    &["QXD0115", "QXD0017", "QXD0114", "QXD0012", "QXD0040"],
    &["QXD0011", "QXD0014", "QXD0016", "QXD0041", "QXD0116"],
    &["QXD0020", "QXD0021", "QXD0025", "QXD0119", "QXD0120"],
    &["QXD0019", "QXD0037", "QXD0038", "QXD0043", "QXD0046"],
    &["QXD0029", "QXD0110"],
];

/// Prerequisite edges drawn between curriculum courses.
pub const PREREQUISITES: [(&str, &[&str]); 10] = [
    ("QXD0001", &["QXD0007", "QXD0010"]),
    ("QXD0005", &["QXD0013"]),
    ("QXD0056", &["QXD0008", "QXD0012"]),
    ("QXD0109", &["QXD0006"]),
    ("QXD0007", &["QXD0016", "QXD0020", "QXD0014", "QXD0019"]),
    ("QXD0010", &["QXD0115", "QXD0041"]),
    ("QXD0008", &["QXD0040", "QXD0041"]),
    ("QXD0013", &["QXD0043"]),
    ("QXD0116", &["QXD0119", "QXD0120"]),
    ("QXD0046", &["QXD0110"]),
];
