//! DirectoryStore - Registrant & Event Snapshots
//!
//! ## Responsibilities
//!
//! - Hold the current registrant and event snapshots
//! - Replace each snapshot wholesale on every feed push
//!
//! The directories are owned by an external service; this store never
//! mutates individual entries, it only swaps whole snapshots. Readers get a
//! clone of the current snapshot and are unaffected by later pushes.

mod feed;
mod ingest;
mod types;

pub use feed::{run_feed_listener, FeedUpdate};
pub use ingest::{fold_event, fold_registrant, EventUpdate, RegistrantUpdate};
pub use types::{AttendanceRecord, CheckinMethod, Event, Registrant};

use tokio::sync::RwLock;

/// DirectoryStore instance
pub struct DirectoryStore {
    registrants: RwLock<Vec<Registrant>>,
    events: RwLock<Vec<Event>>,
}

impl DirectoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            registrants: RwLock::new(Vec::new()),
            events: RwLock::new(Vec::new()),
        }
    }

    /// Replace the registrant snapshot
    pub async fn replace_registrants(&self, registrants: Vec<Registrant>) {
        let mut current = self.registrants.write().await;
        *current = registrants;
        tracing::info!(count = current.len(), "Registrant snapshot replaced");
    }

    /// Replace the event snapshot
    pub async fn replace_events(&self, events: Vec<Event>) {
        let mut current = self.events.write().await;
        *current = events;
        tracing::info!(count = current.len(), "Event snapshot replaced");
    }

    /// Current registrant snapshot, in feed order
    pub async fn registrants(&self) -> Vec<Registrant> {
        self.registrants.read().await.clone()
    }

    /// Current event snapshot
    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }

    /// Look up one event by id in the current snapshot
    pub async fn get_event(&self, event_id: &str) -> Option<Event> {
        self.events
            .read()
            .await
            .iter()
            .find(|e| e.id == event_id)
            .cloned()
    }
}

impl Default for DirectoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn registrant(key: &str, primary: &str) -> Registrant {
        Registrant {
            key: key.to_string(),
            primary_id: primary.to_string(),
            secondary_ids: Vec::new(),
            display_name: key.to_string(),
            group_tag: None,
        }
    }

    #[tokio::test]
    async fn test_replace_is_wholesale() {
        let store = DirectoryStore::new();
        store
            .replace_registrants(vec![registrant("a", "2025-001"), registrant("b", "2025-002")])
            .await;
        store.replace_registrants(vec![registrant("c", "2025-003")]).await;

        let snapshot = store.registrants().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].key, "c");
    }

    #[tokio::test]
    async fn test_get_event() {
        let store = DirectoryStore::new();
        store
            .replace_events(vec![Event {
                id: "e1".to_string(),
                title: "Assembly".to_string(),
                scheduled_at: Utc::now(),
                location: None,
                attendance: HashMap::new(),
            }])
            .await;

        assert!(store.get_event("e1").await.is_some());
        assert!(store.get_event("e2").await.is_none());
    }
}
