//! Directory feed listener
//!
//! The external directory service pushes full-replacement snapshots whenever
//! either directory changes. Pushes arrive on an mpsc channel (the HTTP sync
//! routes and any embedded subscriber both send into it) and are applied to
//! the [`DirectoryStore`] in arrival order.

use super::ingest::{fold_event, fold_registrant, EventUpdate, RegistrantUpdate};
use super::DirectoryStore;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One full-replacement push from the upstream directory
#[derive(Debug, Clone)]
pub enum FeedUpdate {
    Registrants(Vec<RegistrantUpdate>),
    Events(Vec<EventUpdate>),
}

/// Consume feed pushes until the channel closes.
///
/// Spawned once at startup; the sender side is held by the sync routes.
pub async fn run_feed_listener(store: Arc<DirectoryStore>, mut rx: mpsc::Receiver<FeedUpdate>) {
    while let Some(update) = rx.recv().await {
        match update {
            FeedUpdate::Registrants(updates) => {
                let registrants = updates.into_iter().map(fold_registrant).collect();
                store.replace_registrants(registrants).await;
            }
            FeedUpdate::Events(updates) => {
                let events = updates.into_iter().map(fold_event).collect();
                store.replace_events(events).await;
            }
        }
    }

    tracing::info!("Directory feed channel closed, listener stopping");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pushes_replace_snapshots_in_order() {
        let store = Arc::new(DirectoryStore::new());
        let (tx, rx) = mpsc::channel(8);
        let listener = tokio::spawn(run_feed_listener(store.clone(), rx));

        tx.send(FeedUpdate::Registrants(vec![RegistrantUpdate {
            key: "m1".to_string(),
            display_name: "Ana Cruz".to_string(),
            group_tag: None,
            registration_no: Some("2025-001".to_string()),
            card_no: None,
            reference_no: None,
        }]))
        .await
        .unwrap();
        tx.send(FeedUpdate::Registrants(Vec::new())).await.unwrap();
        drop(tx);
        listener.await.unwrap();

        assert!(store.registrants().await.is_empty());
    }
}
