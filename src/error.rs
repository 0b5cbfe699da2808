use thiserror::Error;

/// Errors surfaced to callers of the analysis pipeline. Recoverable
/// conditions (unknown course names, empty aggregates) are absorbed locally
/// with sentinel values and never reach this enum.
#[derive(Debug, Clone, Error)]
pub enum AnaliseError {
    /// The cohort selector was neither a year, an ordered year pair, nor the
    /// "all" sentinel.
    #[error("seleção inválida: informe um ano, uma faixa de anos ordenada ou 'all'")]
    InvalidSelector,

    /// The `type` query parameter named no known visualization.
    #[error("tipo de visualização inválido: {0}")]
    InvalidDiagramKind(String),

    /// The external diagram renderer failed; surfaced as plain text, never
    /// as a crash.
    #[error("falha ao desenhar o diagrama: {0}")]
    RenderFailure(String),
}
