//! API Routes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use futures::{SinkExt, StreamExt};

use crate::state::AppState;

use super::checkin_routes;
use super::scanner_routes;
use super::sync_routes;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/healthz", get(super::health_check))
        .route("/api/status", get(super::gate_status))
        // Scanner
        .route("/api/scanner/start", post(scanner_routes::start_scanner))
        .route("/api/scanner/stop", post(scanner_routes::stop_scanner))
        .route("/api/scanner", get(scanner_routes::scanner_state))
        // Check-in
        .route("/api/checkin/manual", post(checkin_routes::manual_checkin))
        .route("/api/checkin/event", put(checkin_routes::select_event))
        .route("/api/checkin/event", delete(checkin_routes::clear_event))
        // Events & attendance
        .route("/api/events", get(checkin_routes::list_events))
        .route(
            "/api/events/:id/attendance",
            get(checkin_routes::list_attendance),
        )
        // Audit trail
        .route("/api/audit", get(checkin_routes::latest_audit))
        .route("/api/audit/event/:id", get(checkin_routes::audit_by_event))
        // Directory sync (upstream pushes full snapshots)
        .route("/api/sync/registrants", put(sync_routes::sync_registrants))
        .route("/api/sync/events", put(sync_routes::sync_events))
        // Operator realtime signals
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

// ========================================
// WebSocket Handler
// ========================================

/// WebSocket upgrade handler
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Register with RealtimeHub
    let operator = uuid::Uuid::new_v4().to_string();
    let (conn_id, mut rx) = state.realtime.register(operator).await;

    tracing::info!(connection_id = %conn_id, "WebSocket client connected");

    // Forward hub messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Drain incoming messages until the client goes away
    let recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    tracing::info!(connection_id = %conn_id, "WebSocket client disconnected");
                    break;
                }
                Err(e) => {
                    tracing::warn!(connection_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
                _ => {}
            }
        }
        conn_id
    });

    let conn_id = tokio::select! {
        _ = send_task => conn_id,
        result = recv_task => result.unwrap_or(conn_id),
    };

    state.realtime.unregister(&conn_id).await;
}
