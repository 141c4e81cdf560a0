//! Scanner control routes

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

/// Request body for start_scanner
#[derive(Debug, Deserialize)]
pub struct StartScannerRequest {
    /// Operator identity for scan-triggered check-ins; falls back to the
    /// configured scanner identity
    #[serde(default)]
    pub actor: Option<String>,
}

/// Start the scan loop
/// POST /api/scanner/start
pub async fn start_scanner(
    State(state): State<AppState>,
    Json(req): Json<StartScannerRequest>,
) -> impl IntoResponse {
    let actor = req.actor.unwrap_or_else(|| state.config.scan_actor.clone());
    state.scanner.start(&actor).await;

    Json(json!({
        "state": state.scanner.state().await.as_str()
    }))
}

/// Stop the scan loop
/// POST /api/scanner/stop
pub async fn stop_scanner(State(state): State<AppState>) -> impl IntoResponse {
    state.scanner.stop();

    Json(json!({
        "state": state.scanner.state().await.as_str()
    }))
}

/// Current scanner state
/// GET /api/scanner
pub async fn scanner_state(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "state": state.scanner.state().await.as_str()
    }))
}
