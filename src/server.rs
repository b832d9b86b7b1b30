//! HTTP API and bundled web UI.

use crate::models::{
    GenerateReportRequest, HealthResponse, Report, ReportGenerationStatus,
};
use crate::pdf::{file_name, PdfExporter};
use crate::pipeline::ReportPipeline;
use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

const INDEX_HTML: &str = include_str!("../assets/index.html");

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ReportPipeline>,
    pub exporter: Arc<PdfExporter>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/reports/generate", post(generate_report))
        .route("/api/reports/export/pdf", post(export_pdf))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((bind, port)).await?;
    info!("Backend running at http://{}:{}", bind, port);
    info!("Ready to generate AI-powered reports");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "AI Report Generation Service is running".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

#[instrument(skip(state, payload))]
async fn generate_report(
    State(state): State<AppState>,
    payload: Result<Json<GenerateReportRequest>, JsonRejection>,
) -> (StatusCode, Json<ReportGenerationStatus>) {
    let query = match payload.as_ref().ok().and_then(|Json(req)| req.query()) {
        Some(query) => query.to_string(),
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ReportGenerationStatus::error(
                    "Query parameter is required and must be a non-empty string",
                    None,
                )),
            )
        }
    };

    info!("Received report generation request: {}", query);

    match state.pipeline.generate(&query).await {
        Ok(report) => (StatusCode::OK, Json(ReportGenerationStatus::completed(report))),
        Err(e) => {
            error!(error = %e, "Report generation error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReportGenerationStatus::error(
                    "Failed to generate report",
                    Some(e.to_string()),
                )),
            )
        }
    }
}

#[instrument(skip_all)]
async fn export_pdf(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let report = match parse_report(body) {
        Some(report) => report,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ReportGenerationStatus::error("Valid report data is required", None)),
            )
                .into_response()
        }
    };

    let exporter = state.exporter.clone();
    let rendered = tokio::task::spawn_blocking(move || {
        exporter.render(&report).map(|bytes| (file_name(&report), bytes))
    })
    .await
    .map_err(anyhow::Error::from)
    .and_then(|result| result);

    match rendered {
        Ok((name, bytes)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", name),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "PDF generation error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReportGenerationStatus::error(
                    "Failed to generate PDF",
                    Some(e.to_string()),
                )),
            )
                .into_response()
        }
    }
}

/// A report body is usable when it deserializes and carries an id.
fn parse_report(body: serde_json::Value) -> Option<Report> {
    serde_json::from_value::<Report>(body)
        .ok()
        .filter(|report| !report.id.trim().is_empty())
}
