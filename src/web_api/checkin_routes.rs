//! Check-in, event and audit routes

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::attendance_log::AttendanceStore;
use crate::audit_log::AuditEvent;
use crate::directory::{AttendanceRecord, Event};
use crate::error::{Error, Result};
use crate::state::AppState;

/// Request body for manual_checkin
#[derive(Debug, Deserialize)]
pub struct ManualCheckinRequest {
    /// Typed identifier, parsed with the same heuristics as scanned payloads
    pub identifier: String,
    pub actor: String,
}

/// Submit a manual check-in
/// POST /api/checkin/manual
pub async fn manual_checkin(
    State(state): State<AppState>,
    Json(req): Json<ManualCheckinRequest>,
) -> Result<Json<AttendanceRecord>> {
    if req.identifier.trim().is_empty() {
        return Err(Error::Validation("identifier must not be empty".to_string()));
    }
    if req.actor.trim().is_empty() {
        return Err(Error::Validation("actor must not be empty".to_string()));
    }

    let record = state.checkin.submit_manual(&req.identifier, &req.actor).await?;
    Ok(Json(record))
}

/// Request body for select_event
#[derive(Debug, Deserialize)]
pub struct SelectEventRequest {
    pub event_id: String,
}

/// Select the active event
/// PUT /api/checkin/event
pub async fn select_event(
    State(state): State<AppState>,
    Json(req): Json<SelectEventRequest>,
) -> Result<Json<Event>> {
    let event = state.checkin.select_event(&req.event_id).await?;
    Ok(Json(event))
}

/// Clear the active event
/// DELETE /api/checkin/event
pub async fn clear_event(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.checkin.clear_event().await;
    Json(json!({ "cleared": true }))
}

/// Event summary for operator listings (attendance map omitted)
#[derive(Debug, Serialize)]
pub struct EventSummary {
    pub id: String,
    pub title: String,
    pub scheduled_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub attendance_count: usize,
}

/// List events from the current directory snapshot
/// GET /api/events
pub async fn list_events(State(state): State<AppState>) -> Json<Vec<EventSummary>> {
    let events = state.directory.events().await;
    let summaries = events
        .into_iter()
        .map(|e| EventSummary {
            id: e.id,
            title: e.title,
            scheduled_at: e.scheduled_at.to_rfc3339(),
            location: e.location,
            attendance_count: e.attendance.len(),
        })
        .collect();
    Json(summaries)
}

/// List recorded attendance for an event
/// GET /api/events/:id/attendance
pub async fn list_attendance(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Vec<AttendanceRecord>>> {
    let records = state.attendance.list_for_event(&event_id).await?;
    Ok(Json(records))
}

/// Query parameters for audit listings
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_audit_count")]
    pub count: usize,
}

fn default_audit_count() -> usize {
    50
}

/// Latest audit events
/// GET /api/audit
pub async fn latest_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Json<Vec<AuditEvent>> {
    Json(state.audit.latest(query.count).await)
}

/// Audit events for one event
/// GET /api/audit/event/:id
pub async fn audit_by_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(query): Query<AuditQuery>,
) -> Json<Vec<AuditEvent>> {
    Json(state.audit.by_event(&event_id, query.count).await)
}
