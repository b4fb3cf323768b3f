//! HTTP API endpoints for session management.
//!
//! Used by the operator UI to back up and restore a running session.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::state::export::SessionExport;
use crate::state::AppState;
use crate::types::CyclePhase;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub phase: CyclePhase,
    pub turns: usize,
    pub llm_available: bool,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        phase: state.cycle_phase().await,
        turns: state.store.read().await.len(),
        llm_available: state.llm.is_some(),
    })
}

/// Export the turn log and cached identifiers as JSON.
///
/// GET /api/state/export
pub async fn export_state(State(state): State<Arc<AppState>>) -> Json<SessionExport> {
    Json(state.export_state().await)
}

/// Import a session snapshot.
///
/// POST /api/state/import
///
/// Replaces the stored session. Connected clients receive fresh views through
/// the store change feed.
pub async fn import_state(
    State(state): State<Arc<AppState>>,
    Json(export): Json<SessionExport>,
) -> Response {
    match state.import_state(export).await {
        Ok(()) => (StatusCode::OK, "State imported successfully").into_response(),
        Err(e) => {
            tracing::error!("State import failed: {}", e);
            (StatusCode::BAD_REQUEST, format!("Import failed: {}", e)).into_response()
        }
    }
}
