//! API routes for runcoachd

use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use runcoach_common::{IngestError, PersistenceError, Run, RunInput, RunSummary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

type AppStateArc = Arc<AppState>;

/// Error body, `{"detail": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

fn ingest_error(e: IngestError) -> ApiError {
    match e {
        IngestError::InvalidInput(msg) => api_error(StatusCode::BAD_REQUEST, msg),
        IngestError::AnalysisUnavailable(e) => {
            error!("  Analysis provider failed: {}", e);
            api_error(StatusCode::BAD_GATEWAY, format!("Analysis unavailable: {}", e))
        }
        IngestError::Persistence(e) => persistence_error(e),
    }
}

/// Body the `Json` extractor refused. Keeps axum's status (400 syntax,
/// 413 too large, 415 content type, 422 shape).
fn rejection_error(rejection: JsonRejection) -> ApiError {
    api_error(rejection.status(), rejection.body_text())
}

fn persistence_error(e: PersistenceError) -> ApiError {
    error!("  Result store failed: {}", e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Persistence error: {}", e))
}

// ============================================================================
// Result Routes
// ============================================================================

/// `GET /simple-results` body
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleResultsResponse {
    pub results: Vec<RunSummary>,
}

pub fn result_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/results", post(create_result).get(list_results))
        .route("/simple-results", get(list_simple_results))
}

async fn create_result(
    State(state): State<AppStateArc>,
    payload: Result<Json<RunInput>, JsonRejection>,
) -> Result<Json<Run>, ApiError> {
    let Json(req) = payload.map_err(rejection_error)?;
    let run = state.orchestrator.submit(req).await.map_err(ingest_error)?;
    Ok(Json(run))
}

async fn list_results(State(state): State<AppStateArc>) -> Result<Json<Vec<Run>>, ApiError> {
    let runs = state
        .orchestrator
        .list_all()
        .await
        .map_err(persistence_error)?;
    Ok(Json(runs))
}

async fn list_simple_results(
    State(state): State<AppStateArc>,
) -> Result<Json<SimpleResultsResponse>, ApiError> {
    let results = state
        .orchestrator
        .list_summaries()
        .await
        .map_err(persistence_error)?;
    Ok(Json(SimpleResultsResponse { results }))
}

// ============================================================================
// Health Routes
// ============================================================================

/// `GET /` body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
