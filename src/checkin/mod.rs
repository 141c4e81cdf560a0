//! CheckinService - Shared Check-in Tail
//!
//! ## Responsibilities
//!
//! - Active event selection
//! - The parse → match → record tail both entry paths share
//! - Operator signals (success, not-found, rejection) and the live
//!   last-success summary
//!
//! The scan loop and the manual entry path both land here; the only
//! difference between them is the `CheckinMethod` tag. Snapshots (active
//! event, registrant directory) are read fresh on every call, never captured.

mod recorder;

pub use recorder::AttendanceRecorder;

use crate::attendance_log::AttendanceStore;
use crate::audit_log::AuditSink;
use crate::directory::{AttendanceRecord, CheckinMethod, DirectoryStore, Event};
use crate::error::{Error, Result};
use crate::identifier;
use crate::matcher::find_registrant;
use crate::realtime_hub::{
    CheckinRecordedMessage, CheckinRejectedMessage, HubMessage, RealtimeHub,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Live "last success" summary for the operator display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinSummary {
    pub event_id: String,
    pub event_title: String,
    pub display_name: String,
    pub primary_id: String,
    pub method: CheckinMethod,
    pub first_arrival: bool,
    pub at: DateTime<Utc>,
}

/// CheckinService instance
pub struct CheckinService<S: AttendanceStore, A: AuditSink> {
    directory: Arc<DirectoryStore>,
    recorder: AttendanceRecorder<S, A>,
    hub: Arc<RealtimeHub>,
    active_event: RwLock<Option<String>>,
    last_checkin: RwLock<Option<CheckinSummary>>,
}

impl<S: AttendanceStore, A: AuditSink> CheckinService<S, A> {
    /// Create new CheckinService
    pub fn new(
        directory: Arc<DirectoryStore>,
        store: Arc<S>,
        audit: Arc<A>,
        hub: Arc<RealtimeHub>,
    ) -> Self {
        Self {
            directory,
            recorder: AttendanceRecorder::new(store, audit),
            hub,
            active_event: RwLock::new(None),
            last_checkin: RwLock::new(None),
        }
    }

    /// Select the active event. Fails `NotFound` when the event is not in
    /// the current directory snapshot.
    pub async fn select_event(&self, event_id: &str) -> Result<Event> {
        let event = self
            .directory
            .get_event(event_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Event {} not found", event_id)))?;

        let mut active = self.active_event.write().await;
        *active = Some(event.id.clone());
        tracing::info!(event_id = %event.id, title = %event.title, "Active event selected");

        Ok(event)
    }

    /// Clear the active event
    pub async fn clear_event(&self) {
        let mut active = self.active_event.write().await;
        if active.take().is_some() {
            tracing::info!("Active event cleared");
        }
    }

    /// Current active event, looked up fresh in the directory snapshot
    pub async fn active_event(&self) -> Option<Event> {
        let id = self.active_event.read().await.clone()?;
        self.directory.get_event(&id).await
    }

    /// Last successful check-in summary
    pub async fn last_checkin(&self) -> Option<CheckinSummary> {
        self.last_checkin.read().await.clone()
    }

    /// Manual entry path: a typed identifier through the same tail,
    /// tagged `manual`. Never touches scanner state.
    pub async fn submit_manual(&self, raw: &str, actor: &str) -> Result<AttendanceRecord> {
        self.check_in(raw, CheckinMethod::Manual, actor).await
    }

    /// The shared tail: parse the payload, resolve the registrant against
    /// the current snapshot, record the check-in.
    ///
    /// Every outcome is also broadcast to the operator hub; errors are
    /// additionally returned to the caller (the manual route surfaces them
    /// over HTTP, the scan loop logs them).
    pub async fn check_in(
        &self,
        payload: &str,
        method: CheckinMethod,
        actor: &str,
    ) -> Result<AttendanceRecord> {
        let parsed = identifier::parse(payload);

        let Some(event) = self.active_event().await else {
            self.reject("no_event_selected", None).await;
            return Err(Error::NoEventSelected);
        };

        let snapshot = self.directory.registrants().await;
        let Some(registrant) = find_registrant(&parsed, &snapshot) else {
            tracing::warn!(identifier = %parsed, "No registrant matches identifier");
            self.reject("registrant_not_found", Some(parsed.clone())).await;
            return Err(Error::RegistrantNotFound(parsed));
        };

        let record = match self.recorder.record(&event, registrant, method, actor).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, registrant_key = %registrant.key, "Attendance write failed");
                self.reject("persistence_failure", Some(parsed)).await;
                return Err(e);
            }
        };

        let first_arrival = record.first_checked_in_at == record.last_checked_in_at;
        let summary = CheckinSummary {
            event_id: event.id.clone(),
            event_title: event.title.clone(),
            display_name: record.display_name.clone(),
            primary_id: record.primary_id.clone(),
            method,
            first_arrival,
            at: record.last_checked_in_at,
        };

        {
            let mut last = self.last_checkin.write().await;
            *last = Some(summary);
        }

        self.hub
            .broadcast(HubMessage::CheckinRecorded(CheckinRecordedMessage {
                event_id: event.id,
                event_title: event.title,
                registrant_key: record.registrant_key.clone(),
                display_name: record.display_name.clone(),
                primary_id: record.primary_id.clone(),
                method: method.as_str().to_string(),
                first_arrival,
                timestamp: record.last_checked_in_at.to_rfc3339(),
            }))
            .await;

        Ok(record)
    }

    async fn reject(&self, reason: &str, identifier: Option<String>) {
        self.hub
            .broadcast(HubMessage::CheckinRejected(CheckinRejectedMessage {
                reason: reason.to_string(),
                identifier,
                timestamp: Utc::now().to_rfc3339(),
            }))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance_log::MemoryAttendanceStore;
    use crate::audit_log::AuditLog;
    use crate::directory::Registrant;
    use std::collections::HashMap;

    fn service() -> CheckinService<MemoryAttendanceStore, AuditLog> {
        CheckinService::new(
            Arc::new(DirectoryStore::new()),
            Arc::new(MemoryAttendanceStore::new()),
            Arc::new(AuditLog::default()),
            Arc::new(RealtimeHub::new()),
        )
    }

    async fn seed(svc: &CheckinService<MemoryAttendanceStore, AuditLog>) {
        svc.directory
            .replace_registrants(vec![Registrant {
                key: "m1".to_string(),
                primary_id: "2025-001".to_string(),
                secondary_ids: Vec::new(),
                display_name: "Ana Cruz".to_string(),
                group_tag: None,
            }])
            .await;
        svc.directory
            .replace_events(vec![Event {
                id: "e1".to_string(),
                title: "General Assembly".to_string(),
                scheduled_at: Utc::now(),
                location: None,
                attendance: HashMap::new(),
            }])
            .await;
    }

    #[tokio::test]
    async fn test_check_in_requires_active_event() {
        let svc = service();
        seed(&svc).await;

        let result = svc.check_in("2025-001", CheckinMethod::Scan, "op-1").await;
        assert!(matches!(result, Err(Error::NoEventSelected)));
    }

    #[tokio::test]
    async fn test_unknown_identifier_is_not_found() {
        let svc = service();
        seed(&svc).await;
        svc.select_event("e1").await.unwrap();

        let result = svc.check_in("9999-999", CheckinMethod::Scan, "op-1").await;
        assert!(matches!(result, Err(Error::RegistrantNotFound(_))));
        assert!(svc.last_checkin().await.is_none());
    }

    #[tokio::test]
    async fn test_scan_then_manual_same_pair() {
        // End-to-end: a scan of "2025-001" then a manual submit of
        // "2025001" hit the same record; the first arrival survives.
        let svc = service();
        seed(&svc).await;
        svc.select_event("e1").await.unwrap();

        let scanned = svc.check_in("2025-001", CheckinMethod::Scan, "op-1").await.unwrap();
        assert_eq!(scanned.registrant_key, "m1");
        assert_eq!(scanned.method, CheckinMethod::Scan);
        assert_eq!(scanned.first_checked_in_at, scanned.last_checked_in_at);

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let manual = svc.submit_manual("2025001", "op-1").await.unwrap();
        assert_eq!(manual.registrant_key, "m1");
        assert_eq!(manual.method, CheckinMethod::Manual);
        assert_eq!(manual.first_checked_in_at, scanned.first_checked_in_at);
        assert!(manual.last_checked_in_at > manual.first_checked_in_at);

        let summary = svc.last_checkin().await.unwrap();
        assert_eq!(summary.display_name, "Ana Cruz");
        assert!(!summary.first_arrival);
    }

    #[tokio::test]
    async fn test_payload_is_parsed_before_matching() {
        let svc = service();
        seed(&svc).await;
        svc.select_event("e1").await.unwrap();

        // Registration number buried in a URL payload.
        let record = svc
            .check_in("https://x/v?id=2025-001", CheckinMethod::Scan, "op-1")
            .await
            .unwrap();
        assert_eq!(record.registrant_key, "m1");
    }

    #[tokio::test]
    async fn test_deselected_event_reports_no_event() {
        let svc = service();
        seed(&svc).await;
        svc.select_event("e1").await.unwrap();
        svc.clear_event().await;

        let result = svc.check_in("2025-001", CheckinMethod::Scan, "op-1").await;
        assert!(matches!(result, Err(Error::NoEventSelected)));
    }
}
