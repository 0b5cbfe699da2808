//! Thin HTTP surface: query-parameter parsing and dispatch into the
//! analysis pipeline. All state is loaded once at startup and shared
//! read-only; every request recomputes its metrics from the immutable log.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::consolidate::consolidate;
use crate::error::AnaliseError;
use crate::metrics::cohort_status;
use crate::models::{CourseMetricRow, EventLogEntry, StatusRow};
use crate::petri::ProcessModel;
use crate::render::{build_diagram, DiagramKind, DiagramRenderer};
use crate::replay::ReplayOracle;
use crate::selector::CohortSelector;

/// Read-only process state, loaded once and never mutated.
pub struct AppState {
    pub log: Vec<EventLogEntry>,
    pub model: ProcessModel,
    pub oracle: Box<dyn ReplayOracle + Send + Sync>,
    pub renderer: Box<dyn DiagramRenderer>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/diagrama", get(diagrama))
        .route("/api/tabelas", get(tabelas))
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct DiagramParams {
    #[serde(rename = "type")]
    kind: String,
    selecao: Option<String>,
    selecao2: Option<String>,
}

/// GET /api/diagrama — compute the selected metric and return the rendered
/// PNG. Renderer failures come back as plain text, not as a crash.
async fn diagrama(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiagramParams>,
) -> Response {
    let selector =
        match CohortSelector::from_params(params.selecao.as_deref(), params.selecao2.as_deref()) {
            Ok(selector) => selector,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        };
    let kind = match DiagramKind::parse(&params.kind) {
        Ok(kind) => kind,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let dot = build_diagram(kind, &state.log, selector, &state.model, state.oracle.as_ref());
    match state.renderer.render_png(&dot) {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(e @ AnaliseError::RenderFailure(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct TableParams {
    selecao: Option<String>,
    selecao2: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TableResponse {
    pub analise_turma: Vec<StatusRow>,
    pub df_consolidado: Vec<CourseMetricRow>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// GET /api/tabelas — cohort status breakdown plus the consolidated
/// per-course metric table as JSON.
async fn tabelas(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TableParams>,
) -> Response {
    let selector =
        match CohortSelector::from_params(params.selecao.as_deref(), params.selecao2.as_deref()) {
            Ok(selector) => selector,
            Err(e) => {
                let body = ErrorBody {
                    error: e.to_string(),
                };
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
        };

    let response = TableResponse {
        analise_turma: cohort_status(&state.log, selector),
        df_consolidado: consolidate(&state.log, selector),
    };
    Json(response).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventlog::build_event_log;
    use crate::eventlog::tests::record;
    use crate::petri::tests::course_model;
    use crate::replay::TokenReplayer;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::util::ServiceExt;

    /// Renderer stub: hands back the DOT bytes so tests avoid a Graphviz
    /// dependency.
    struct EchoRenderer;

    impl DiagramRenderer for EchoRenderer {
        fn render_png(&self, dot: &str) -> Result<Vec<u8>, AnaliseError> {
            Ok(dot.as_bytes().to_vec())
        }
    }

    struct FailingRenderer;

    impl DiagramRenderer for FailingRenderer {
        fn render_png(&self, _dot: &str) -> Result<Vec<u8>, AnaliseError> {
            Err(AnaliseError::RenderFailure("dot not installed".to_string()))
        }
    }

    fn test_state(renderer: Box<dyn DiagramRenderer>) -> Arc<AppState> {
        let rows = vec![
            record("a", "QXD0001", "APROVADO", "2020", "1"),
            record("b", "QXD0001", "REPROVADO", "2020", "1"),
            record("b", "QXD0005", "SUPRIMIDO", "2021", "2"),
        ];
        Arc::new(AppState {
            log: build_event_log(&rows),
            model: course_model(),
            oracle: Box::new(TokenReplayer),
            renderer,
        })
    }

    async fn send(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let app = router(test_state(Box::new(EchoRenderer)));
        let (status, body) = send(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn diagrama_returns_png_payload() {
        let app = router(test_state(Box::new(EchoRenderer)));
        let (status, body) =
            send(app, "/api/diagrama?type=approval-rate&selecao=2020").await;
        assert_eq!(status, StatusCode::OK);
        let dot = String::from_utf8(body).unwrap();
        assert!(dot.contains("digraph"));
    }

    #[tokio::test]
    async fn diagrama_rejects_invalid_selector() {
        let app = router(test_state(Box::new(EchoRenderer)));
        let (status, _) = send(app, "/api/diagrama?type=bottleneck&selecao=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn diagrama_rejects_unknown_kind() {
        let app = router(test_state(Box::new(EchoRenderer)));
        let (status, _) = send(app, "/api/diagrama?type=pizza").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn render_failure_surfaces_as_plain_text() {
        let app = router(test_state(Box::new(FailingRenderer)));
        let (status, body) = send(app, "/api/diagrama?type=bar-chart&selecao=2020&selecao2=2021").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("dot not installed"));
    }

    #[tokio::test]
    async fn tabelas_returns_consolidated_json() {
        let app = router(test_state(Box::new(EchoRenderer)));
        let (status, body) = send(app, "/api/tabelas?selecao=2020").await;
        assert_eq!(status, StatusCode::OK);

        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let status_rows = parsed["analise_turma"].as_array().unwrap();
        assert_eq!(status_rows.len(), 3);
        let table = parsed["df_consolidado"].as_array().unwrap();
        assert!(!table.is_empty());
        assert!(table[0]["codigo"].is_string());
        assert!(table[0]["taxa_aprovacao"].is_number());
    }

    #[tokio::test]
    async fn tabelas_rejects_reversed_range() {
        let app = router(test_state(Box::new(EchoRenderer)));
        let (status, body) = send(app, "/api/tabelas?selecao=2022&selecao2=2020").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed["error"].is_string());
    }
}
