//! Diagram construction. The analysis side of rendering lives here: metric
//! values are turned into Graphviz DOT documents with curriculum-row layout
//! and metric-scaled node colors. Turning DOT into PNG bytes is the job of
//! the external renderer behind `DiagramRenderer`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::process::{Command, Stdio};

use crate::catalog;
use crate::conformance::{self, GroupAverages};
use crate::error::AnaliseError;
use crate::metrics;
use crate::models::EventLogEntry;
use crate::petri::ProcessModel;
use crate::replay::ReplayOracle;
use crate::selector::CohortSelector;

/// The visualization kinds accepted by the `type` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    ApprovalRate,
    Bottleneck,
    Suppression,
    Flowchart,
    NetHeatmap,
    BarChart,
}

impl DiagramKind {
    pub fn parse(value: &str) -> Result<Self, AnaliseError> {
        match value {
            "approval-rate" => Ok(Self::ApprovalRate),
            "bottleneck" => Ok(Self::Bottleneck),
            "suppression" => Ok(Self::Suppression),
            "flowchart" => Ok(Self::Flowchart),
            "net-heatmap" => Ok(Self::NetHeatmap),
            "bar-chart" => Ok(Self::BarChart),
            other => Err(AnaliseError::InvalidDiagramKind(other.to_string())),
        }
    }
}

/// Boundary contract for the image backend.
pub trait DiagramRenderer: Send + Sync {
    fn render_png(&self, dot: &str) -> Result<Vec<u8>, AnaliseError>;
}

/// Production backend: pipes the DOT document through the Graphviz `dot`
/// binary.
pub struct GraphvizRenderer;

impl DiagramRenderer for GraphvizRenderer {
    fn render_png(&self, dot: &str) -> Result<Vec<u8>, AnaliseError> {
        let mut child = Command::new("dot")
            .arg("-Tpng")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AnaliseError::RenderFailure(format!("failed to launch dot: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(dot.as_bytes())
                .map_err(|e| AnaliseError::RenderFailure(e.to_string()))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| AnaliseError::RenderFailure(e.to_string()))?;
        if !output.status.success() {
            return Err(AnaliseError::RenderFailure(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(output.stdout)
    }
}

/// Compute the metric behind `kind` and lay it out as a DOT document.
pub fn build_diagram(
    kind: DiagramKind,
    log: &[EventLogEntry],
    selector: CohortSelector,
    model: &ProcessModel,
    oracle: &dyn ReplayOracle,
) -> String {
    match kind {
        DiagramKind::ApprovalRate => {
            // Range selectors switch the diagram to period semantics; the
            // single-year and all-cohorts views keep cohort membership.
            let tally = match selector {
                CohortSelector::Range(_, _) => metrics::approval_rates_by_period(log, selector),
                _ => metrics::approval_rates(log, selector),
            };
            approval_dot(&tally)
        }
        DiagramKind::Bottleneck => {
            count_dot(&metrics::bottlenecks(log, selector), "alunos retidos")
        }
        DiagramKind::Suppression => count_dot(
            &metrics::marker_counts(log, selector, catalog::SUPPRESSION_MARKER),
            "supressões",
        ),
        DiagramKind::Flowchart => {
            let summary = conformance::run(log, selector, model, oracle);
            token_flow_dot(&summary.tokens_by_course)
        }
        DiagramKind::NetHeatmap => {
            let summary = conformance::run(log, selector, model, oracle);
            net_heatmap_dot(model, &summary.tokens_by_place)
        }
        DiagramKind::BarChart => {
            let summary = conformance::run(log, selector, model, oracle);
            bar_chart_dot(&summary.graduated, &summary.not_graduated)
        }
    }
}

// ---------------------------------------------------------------------------
// Color scales

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

fn hex(rgb: (u8, u8, u8)) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb.0, rgb.1, rgb.2)
}

/// Red → yellow → green scale over [0, 1]; good-is-high metrics use it
/// directly, bad-is-high metrics feed it `1 - t`.
pub fn red_yellow_green(t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    let (lo, hi, t) = if t < 0.5 {
        ((215, 48, 39), (254, 224, 139), t * 2.0)
    } else {
        ((254, 224, 139), (26, 152, 80), (t - 0.5) * 2.0)
    };
    hex((
        lerp(lo.0, hi.0, t),
        lerp(lo.1, hi.1, t),
        lerp(lo.2, hi.2, t),
    ))
}

/// Light → dark blue scale over [0, 1], used by the token heatmaps.
pub fn blues(t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    hex((
        lerp(247, 8, t),
        lerp(251, 48, t),
        lerp(255, 107, t),
    ))
}

fn normalized(value: u64, max: u64) -> f64 {
    if max == 0 {
        0.0
    } else {
        value as f64 / max as f64
    }
}

// ---------------------------------------------------------------------------
// Curriculum-row layout

/// Shared skeleton of the curriculum flow diagrams: one cluster per
/// curriculum row with `rank=same`, invisible weighted edges chaining the
/// rows, prerequisite edges drawn without layout constraints.
fn curriculum_dot(
    label_of: impl Fn(&str) -> String,
    color_of: impl Fn(&str) -> String,
) -> String {
    let mut dot = String::new();
    let _ = writeln!(dot, "digraph curso {{");
    let _ = writeln!(dot, "  rankdir=TB;");
    let _ = writeln!(dot, "  splines=ortho;");
    let _ = writeln!(dot, "  nodesep=0.6;");
    let _ = writeln!(dot, "  ranksep=0.7;");

    for (i, row) in catalog::CURRICULUM_ROWS.iter().enumerate() {
        let _ = writeln!(dot, "  subgraph cluster_{i} {{");
        let _ = writeln!(dot, "    rank=same;");
        let _ = writeln!(dot, "    color=transparent;");
        for code in *row {
            let _ = writeln!(
                dot,
                "    \"{code}\" [shape=box, style=filled, fillcolor=\"{}\", fontsize=15, \
                 fixedsize=true, width=2.5, height=1.4, label=\"{}\"];",
                color_of(code),
                label_of(code)
            );
        }
        let _ = writeln!(dot, "  }}");
    }

    // Invisible edges keep consecutive rows stacked.
    for pair in catalog::CURRICULUM_ROWS.windows(2) {
        let _ = writeln!(
            dot,
            "  \"{}\" -> \"{}\" [style=invis, weight=10];",
            pair[0][0], pair[1][0]
        );
    }

    for (from, tos) in catalog::PREREQUISITES {
        for to in tos {
            let _ = writeln!(
                dot,
                "  \"{from}\" -> \"{to}\" [arrowhead=normal, constraint=false];"
            );
        }
    }

    let _ = writeln!(dot, "}}");
    dot
}

/// Approval-rate flowchart: rate drives a good-is-high red→green scale.
fn approval_dot(tally: &BTreeMap<String, metrics::CourseApproval>) -> String {
    curriculum_dot(
        |code| {
            let t = tally.get(code).copied().unwrap_or_default();
            format!(
                "{code}\\n{}\\n{} alunos\\n{:.2}%",
                catalog::course_name_or_unknown(code),
                t.students,
                t.rate() * 100.0
            )
        },
        |code| {
            let rate = tally.get(code).map(|t| t.rate()).unwrap_or(0.0);
            red_yellow_green(rate)
        },
    )
}

/// Count flowchart (bottlenecks, suppressions): counts are normalized over
/// the maximum and the scale is inverted, so the worst course reads red.
fn count_dot(counts: &BTreeMap<String, u64>, unit: &str) -> String {
    let max = counts.values().copied().max().unwrap_or(0);
    curriculum_dot(
        |code| {
            let n = counts.get(code).copied().unwrap_or(0);
            format!(
                "{code}\\n{}\\n{n} {unit}",
                catalog::course_name_or_unknown(code)
            )
        },
        |code| {
            let n = counts.get(code).copied().unwrap_or(0);
            red_yellow_green(1.0 - normalized(n, max))
        },
    )
}

/// Token-residue flowchart over curriculum rows (Blues scale).
fn token_flow_dot(tokens_by_course: &BTreeMap<String, u64>) -> String {
    let max = tokens_by_course.values().copied().max().unwrap_or(0);
    curriculum_dot(
        |code| {
            let n = tokens_by_course.get(code).copied().unwrap_or(0);
            format!(
                "{code}\\n{}\\nTokens: {n}",
                catalog::course_name_or_unknown(code)
            )
        },
        |code| {
            let n = tokens_by_course.get(code).copied().unwrap_or(0);
            blues(normalized(n, max))
        },
    )
}

/// Full Petri-net heatmap: places colored by leftover tokens, initial and
/// final marking places highlighted, transitions as gray boxes.
fn net_heatmap_dot(model: &ProcessModel, tokens_by_place: &BTreeMap<String, u64>) -> String {
    let max = tokens_by_place.values().copied().max().unwrap_or(0);

    let mut dot = String::new();
    let _ = writeln!(dot, "digraph rede_petri {{");
    let _ = writeln!(dot, "  rankdir=LR;");

    for place in &model.places {
        let tokens = tokens_by_place.get(&place.id).copied().unwrap_or(0);
        let fill = if model.initial_marking.contains_key(&place.id) {
            "lightblue".to_string()
        } else if model.final_marking.contains_key(&place.id) {
            "lightgreen".to_string()
        } else {
            blues(normalized(tokens, max))
        };
        let _ = writeln!(
            dot,
            "  \"{}\" [shape=circle, style=filled, fillcolor=\"{fill}\", \
             label=\"{}\\nTokens: {tokens}\"];",
            place.id, place.id
        );
    }

    for transition in &model.transitions {
        let label = transition.label.as_deref().unwrap_or("");
        let _ = writeln!(
            dot,
            "  \"{}\" [shape=box, color=gray, label=\"{label}\"];",
            transition.id
        );
    }

    for arc in &model.arcs {
        let _ = writeln!(dot, "  \"{}\" -> \"{}\";", arc.source, arc.target);
    }

    let _ = writeln!(dot, "}}");
    dot
}

/// Graduated vs non-graduated replay averages as a grouped bar figure: one
/// cluster per metric, bar height proportional to the value.
fn bar_chart_dot(graduated: &GroupAverages, not_graduated: &GroupAverages) -> String {
    let metrics: [(&str, f64, f64); 4] = [
        ("Trace Fitness", graduated.fitness, not_graduated.fitness),
        (
            "Missing Tokens",
            graduated.missing_tokens,
            not_graduated.missing_tokens,
        ),
        (
            "Consumed Tokens",
            graduated.consumed_tokens,
            not_graduated.consumed_tokens,
        ),
        (
            "Remaining Tokens",
            graduated.remaining_tokens,
            not_graduated.remaining_tokens,
        ),
    ];

    let mut dot = String::new();
    let _ = writeln!(dot, "digraph medias_replay {{");
    let _ = writeln!(dot, "  rankdir=TB;");
    let _ = writeln!(dot, "  node [shape=box, style=filled, fixedsize=true, width=1.6];");

    for (i, (title, grad, not_grad)) in metrics.iter().enumerate() {
        let max = grad.max(*not_grad).max(f64::EPSILON);
        let _ = writeln!(dot, "  subgraph cluster_{i} {{");
        let _ = writeln!(dot, "    label=\"Média de {title}\";");
        let _ = writeln!(dot, "    rank=same;");
        let _ = writeln!(
            dot,
            "    \"formados_{i}\" [fillcolor=\"#4477dd\", height={:.2}, \
             label=\"Formados\\n{grad:.2}\"];",
            0.4 + 1.6 * grad / max
        );
        let _ = writeln!(
            dot,
            "    \"nao_formados_{i}\" [fillcolor=\"#dd5544\", height={:.2}, \
             label=\"Não Formados\\n{not_grad:.2}\"];",
            0.4 + 1.6 * not_grad / max
        );
        let _ = writeln!(dot, "  }}");
    }

    let _ = writeln!(dot, "}}");
    dot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventlog::build_event_log;
    use crate::eventlog::tests::record;
    use crate::petri::tests::course_model;
    use crate::replay::TokenReplayer;

    #[test]
    fn parses_every_diagram_kind() {
        for (raw, kind) in [
            ("approval-rate", DiagramKind::ApprovalRate),
            ("bottleneck", DiagramKind::Bottleneck),
            ("suppression", DiagramKind::Suppression),
            ("flowchart", DiagramKind::Flowchart),
            ("net-heatmap", DiagramKind::NetHeatmap),
            ("bar-chart", DiagramKind::BarChart),
        ] {
            assert_eq!(DiagramKind::parse(raw).unwrap(), kind);
        }
        assert!(matches!(
            DiagramKind::parse("pizza"),
            Err(AnaliseError::InvalidDiagramKind(_))
        ));
    }

    #[test]
    fn color_scales_hit_their_anchors() {
        assert_eq!(red_yellow_green(0.0), "#d73027");
        assert_eq!(red_yellow_green(1.0), "#1a9850");
        assert_eq!(blues(0.0), "#f7fbff");
        assert_eq!(blues(1.0), "#08306b");
    }

    #[test]
    fn curriculum_diagram_contains_rows_and_prerequisites() {
        let rows = vec![record("a", "QXD0001", "APROVADO", "2020", "1")];
        let log = build_event_log(&rows);
        let dot = build_diagram(
            DiagramKind::ApprovalRate,
            &log,
            CohortSelector::All,
            &course_model(),
            &TokenReplayer,
        );

        // Every curriculum course appears as a node.
        for row in catalog::CURRICULUM_ROWS {
            for code in row {
                assert!(dot.contains(&format!("\"{code}\"")), "missing node {code}");
            }
        }
        assert!(dot.contains("style=invis"));
        assert!(dot.contains("\"QXD0001\" -> \"QXD0007\""));
        assert!(dot.contains("100.00%"));
    }

    #[test]
    fn inverted_scale_colors_worst_count_red() {
        let mut counts = BTreeMap::new();
        counts.insert("QXD0001".to_string(), 10u64);
        let dot = count_dot(&counts, "alunos retidos");
        // Max count maps to t = 0 on the red→green scale.
        assert!(dot.contains(&red_yellow_green(0.0)));
    }

    #[test]
    fn net_heatmap_highlights_markings() {
        let model = course_model();
        let dot = net_heatmap_dot(&model, &BTreeMap::new());
        assert!(dot.contains("lightblue"));
        assert!(dot.contains("lightgreen"));
        assert!(dot.contains("\"p_wait\""));
        assert!(dot.contains("\"t_take\" -> \"p_wait\""));
    }

    #[test]
    fn bar_chart_renders_all_four_metrics() {
        let grad = GroupAverages {
            traces: 2,
            fitness: 0.9,
            missing_tokens: 1.0,
            consumed_tokens: 10.0,
            remaining_tokens: 0.5,
        };
        let dot = bar_chart_dot(&grad, &GroupAverages::default());
        for title in ["Trace Fitness", "Missing Tokens", "Consumed Tokens", "Remaining Tokens"] {
            assert!(dot.contains(title));
        }
        assert!(dot.contains("Formados"));
        assert!(dot.contains("Não Formados"));
    }
}
