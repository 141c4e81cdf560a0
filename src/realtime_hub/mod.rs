//! RealtimeHub - Operator Signal Distribution
//!
//! ## Responsibilities
//!
//! - WebSocket connection management
//! - Broadcasting check-in outcomes and scanner state transitions
//!
//! These messages are observational outputs of the engine's state
//! transitions for the presentation layer; nothing in the engine depends on
//! whether anyone is listening.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Hub message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum HubMessage {
    /// Scanner state transition (idle/starting/streaming/paused)
    ScannerState(ScannerStateMessage),
    /// A check-in was recorded
    CheckinRecorded(CheckinRecordedMessage),
    /// A check-in attempt was rejected (not found, no event, write failure)
    CheckinRejected(CheckinRejectedMessage),
    /// Camera could not be acquired
    CameraError(CameraErrorMessage),
}

/// Scanner state message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerStateMessage {
    pub state: String,
    pub timestamp: String,
}

/// Check-in recorded message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinRecordedMessage {
    pub event_id: String,
    pub event_title: String,
    pub registrant_key: String,
    pub display_name: String,
    pub primary_id: String,
    pub method: String,
    /// True when this is the first arrival for the pair, not a re-scan
    pub first_arrival: bool,
    pub timestamp: String,
}

/// Check-in rejected message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinRejectedMessage {
    pub reason: String,
    /// Parsed identifier that failed to resolve, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub timestamp: String,
}

/// Camera error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraErrorMessage {
    pub message: String,
    pub timestamp: String,
}

/// Client connection
struct ClientConnection {
    id: Uuid,
    operator: String,
    tx: mpsc::UnboundedSender<String>,
}

/// RealtimeHub instance
pub struct RealtimeHub {
    connections: RwLock<HashMap<Uuid, ClientConnection>>,
    connection_count: AtomicU64,
}

impl RealtimeHub {
    /// Create new RealtimeHub
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            connection_count: AtomicU64::new(0),
        }
    }

    /// Register a new client
    pub async fn register(&self, operator: String) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let conn = ClientConnection { id, operator, tx };

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, conn);
        }

        self.connection_count.fetch_add(1, Ordering::Relaxed);

        tracing::info!(connection_id = %id, "Operator client connected");

        (id, rx)
    }

    /// Unregister a client
    pub async fn unregister(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            self.connection_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(connection_id = %id, "Operator client disconnected");
        }
    }

    /// Broadcast message to all clients
    pub async fn broadcast(&self, message: HubMessage) {
        let json = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize hub message");
                return;
            }
        };

        let connections = self.connections.read().await;
        for conn in connections.values() {
            if let Err(e) = conn.tx.send(json.clone()) {
                tracing::warn!(
                    connection_id = %conn.id,
                    operator = %conn.operator,
                    error = %e,
                    "Failed to send hub message"
                );
            }
        }
    }

    /// Get connection count
    pub fn connection_count(&self) -> u64 {
        self.connection_count.load(Ordering::Relaxed)
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_registered_clients() {
        let hub = RealtimeHub::new();
        let (_id, mut rx) = hub.register("op-1".to_string()).await;

        hub.broadcast(HubMessage::CameraError(CameraErrorMessage {
            message: "Camera rear-1 is busy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }))
        .await;

        let raw = rx.recv().await.unwrap();
        assert!(raw.contains("\"type\":\"camera_error\""));
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let hub = RealtimeHub::new();
        let (id, _rx) = hub.register("op-1".to_string()).await;
        hub.unregister(&id).await;
        assert_eq!(hub.connection_count(), 0);
    }
}
