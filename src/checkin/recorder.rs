//! AttendanceRecorder - Durable Check-in Writes
//!
//! ## Responsibilities
//!
//! - Snapshot registrant fields at write time
//! - Conditional upsert through the attendance store
//! - Audit emission after every successful write
//!
//! Calling `record` N times for the same (event, registrant) pair never
//! changes `first_checked_in_at` after the first call; `last_checked_in_at`
//! advances on every call. The store contract carries the guarantee, so no
//! read-before-write is needed here.

use crate::attendance_log::AttendanceStore;
use crate::audit_log::{AuditEvent, AuditSink};
use crate::directory::{AttendanceRecord, CheckinMethod, Event, Registrant};
use crate::error::Result;
use chrono::Utc;
use std::sync::Arc;

/// AttendanceRecorder instance
pub struct AttendanceRecorder<S: AttendanceStore, A: AuditSink> {
    store: Arc<S>,
    audit: Arc<A>,
}

impl<S: AttendanceStore, A: AuditSink> AttendanceRecorder<S, A> {
    /// Create new recorder
    pub fn new(store: Arc<S>, audit: Arc<A>) -> Self {
        Self { store, audit }
    }

    /// Record one check-in for (event, registrant).
    ///
    /// The audit event is emitted fire-and-forget: its failure is logged and
    /// never fails or rolls back the attendance write.
    pub async fn record(
        &self,
        event: &Event,
        registrant: &Registrant,
        method: CheckinMethod,
        actor: &str,
    ) -> Result<AttendanceRecord> {
        let now = Utc::now();

        let record = AttendanceRecord {
            registrant_key: registrant.key.clone(),
            display_name: registrant.display_name.clone(),
            primary_id: registrant.primary_id.clone(),
            first_checked_in_at: now,
            last_checked_in_at: now,
            recorded_by: actor.to_string(),
            method,
        };

        let stored = self.store.upsert(&event.id, record).await?;

        tracing::info!(
            event_id = %event.id,
            registrant_key = %stored.registrant_key,
            primary_id = %stored.primary_id,
            method = %method.as_str(),
            first_arrival = stored.first_checked_in_at == stored.last_checked_in_at,
            "Check-in recorded"
        );

        let audit = self.audit.clone();
        let audit_event = AuditEvent {
            audit_id: 0,
            event_id: event.id.clone(),
            event_title: event.title.clone(),
            registrant_key: stored.registrant_key.clone(),
            display_name: stored.display_name.clone(),
            primary_id: stored.primary_id.clone(),
            timestamp: stored.last_checked_in_at,
            method,
            actor: actor.to_string(),
        };
        tokio::spawn(async move {
            if let Err(e) = audit.append(audit_event).await {
                tracing::warn!(error = %e, "Audit append failed (check-in unaffected)");
            }
        });

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance_log::MemoryAttendanceStore;
    use crate::audit_log::AuditLog;
    use std::collections::HashMap;
    use std::time::Duration;

    fn event() -> Event {
        Event {
            id: "e1".to_string(),
            title: "General Assembly".to_string(),
            scheduled_at: Utc::now(),
            location: None,
            attendance: HashMap::new(),
        }
    }

    fn registrant() -> Registrant {
        Registrant {
            key: "m1".to_string(),
            primary_id: "2025-001".to_string(),
            secondary_ids: Vec::new(),
            display_name: "Ana Cruz".to_string(),
            group_tag: None,
        }
    }

    #[tokio::test]
    async fn test_record_twice_preserves_first_arrival() {
        let store = Arc::new(MemoryAttendanceStore::new());
        let audit = Arc::new(AuditLog::default());
        let recorder = AttendanceRecorder::new(store, audit);

        let first = recorder
            .record(&event(), &registrant(), CheckinMethod::Scan, "op-1")
            .await
            .unwrap();
        assert_eq!(first.first_checked_in_at, first.last_checked_in_at);

        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = recorder
            .record(&event(), &registrant(), CheckinMethod::Manual, "op-2")
            .await
            .unwrap();

        assert_eq!(second.first_checked_in_at, first.first_checked_in_at);
        assert!(second.last_checked_in_at > second.first_checked_in_at);
        assert_eq!(second.method, CheckinMethod::Manual);
        assert_eq!(second.recorded_by, "op-2");
    }

    #[tokio::test]
    async fn test_record_snapshots_registrant_fields() {
        let store = Arc::new(MemoryAttendanceStore::new());
        let audit = Arc::new(AuditLog::default());
        let recorder = AttendanceRecorder::new(store.clone(), audit);

        recorder
            .record(&event(), &registrant(), CheckinMethod::Scan, "op-1")
            .await
            .unwrap();

        // A later directory edit does not rewrite the stored snapshot.
        let stored = store.get("e1", "m1").await.unwrap().unwrap();
        assert_eq!(stored.display_name, "Ana Cruz");
        assert_eq!(stored.primary_id, "2025-001");
    }

    #[tokio::test]
    async fn test_record_emits_audit_event() {
        let store = Arc::new(MemoryAttendanceStore::new());
        let audit = Arc::new(AuditLog::default());
        let recorder = AttendanceRecorder::new(store, audit.clone());

        recorder
            .record(&event(), &registrant(), CheckinMethod::Scan, "op-1")
            .await
            .unwrap();

        // Audit append runs on a spawned task.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let trail = audit.latest(10).await;
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].event_id, "e1");
        assert_eq!(trail[0].method, CheckinMethod::Scan);
    }
}
