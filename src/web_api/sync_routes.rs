//! Directory sync routes
//!
//! The upstream directory service pushes full-replacement snapshots here
//! whenever registrants or events change. Each push is forwarded to the feed
//! listener, which swaps the corresponding snapshot wholesale.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::directory::{EventUpdate, FeedUpdate, RegistrantUpdate};
use crate::error::{Error, Result};
use crate::state::AppState;

/// Replace the registrant snapshot
/// PUT /api/sync/registrants
pub async fn sync_registrants(
    State(state): State<AppState>,
    Json(updates): Json<Vec<RegistrantUpdate>>,
) -> Result<Json<serde_json::Value>> {
    let count = updates.len();
    state
        .feed_tx
        .send(FeedUpdate::Registrants(updates))
        .await
        .map_err(|_| Error::Internal("Directory feed listener is gone".to_string()))?;

    Ok(Json(json!({ "accepted": count })))
}

/// Replace the event snapshot
/// PUT /api/sync/events
pub async fn sync_events(
    State(state): State<AppState>,
    Json(updates): Json<Vec<EventUpdate>>,
) -> Result<Json<serde_json::Value>> {
    let count = updates.len();
    state
        .feed_tx
        .send(FeedUpdate::Events(updates))
        .await
        .map_err(|_| Error::Internal("Directory feed listener is gone".to_string()))?;

    Ok(Json(json!({ "accepted": count })))
}
