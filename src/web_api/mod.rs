//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes
//! - Request validation
//! - Response formatting

mod checkin_routes;
mod routes;
mod scanner_routes;
mod sync_routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::{GateStatusResponse, HealthResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let decode_ok = state.decode_client.health_check().await.unwrap_or(false);

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        decode_connected: decode_ok,
        db_connected: true, // If we got here, DB is connected
    };

    Json(response)
}

/// Gate status endpoint: scanner state plus check-in context
pub async fn gate_status(State(state): State<AppState>) -> impl IntoResponse {
    let active_event = state.checkin.active_event().await;

    let response = GateStatusResponse {
        scanner_state: state.scanner.state().await.as_str().to_string(),
        active_event_id: active_event.as_ref().map(|e| e.id.clone()),
        active_event_title: active_event.map(|e| e.title),
        last_checkin: state.checkin.last_checkin().await,
        registrant_count: state.directory.registrants().await.len(),
        operator_connections: state.realtime.connection_count(),
    };

    Json(response)
}
