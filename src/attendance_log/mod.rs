//! Attendance log storage
//!
//! ## Responsibilities
//!
//! - Define the keyed-upsert contract attendance writes go through
//! - In-memory backend for tests and DB-less operation
//!
//! The store contract is a *conditional* upsert: when a record already exists
//! for the (event, registrant) pair, the stored `first_checked_in_at` is kept
//! and every other field is overwritten. Callers therefore never need a
//! read-before-write cycle, and a simultaneous first scan and first manual
//! submit cannot lose the earlier arrival timestamp.

mod repository;

pub use repository::AttendanceRepository;

use crate::directory::AttendanceRecord;
use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::RwLock;

/// Abstraction over an attendance persistence backend.
///
/// Implemented by [`AttendanceRepository`] (MySQL) and
/// [`MemoryAttendanceStore`]. No multi-key transactional guarantee is
/// assumed; each upsert is atomic per (event, registrant) key.
///
/// All methods return `Send` futures so the trait can be used from spawned
/// tokio tasks.
pub trait AttendanceStore: Send + Sync + 'static {
    /// Upsert one record keyed by (event_id, record.registrant_key),
    /// preserving any existing `first_checked_in_at`. Returns the record as
    /// stored.
    fn upsert<'a>(
        &'a self,
        event_id: &'a str,
        record: AttendanceRecord,
    ) -> impl Future<Output = Result<AttendanceRecord>> + Send + 'a;

    /// Fetch one record, if present.
    fn get<'a>(
        &'a self,
        event_id: &'a str,
        registrant_key: &'a str,
    ) -> impl Future<Output = Result<Option<AttendanceRecord>>> + Send + 'a;

    /// All records for an event, most recent check-in first.
    fn list_for_event<'a>(
        &'a self,
        event_id: &'a str,
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>>> + Send + 'a;
}

/// In-memory attendance store
pub struct MemoryAttendanceStore {
    records: RwLock<HashMap<(String, String), AttendanceRecord>>,
}

impl MemoryAttendanceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryAttendanceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AttendanceStore for MemoryAttendanceStore {
    async fn upsert(&self, event_id: &str, mut record: AttendanceRecord) -> Result<AttendanceRecord> {
        let key = (event_id.to_string(), record.registrant_key.clone());
        let mut records = self.records.write().await;

        if let Some(existing) = records.get(&key) {
            record.first_checked_in_at = existing.first_checked_in_at;
        }
        records.insert(key, record.clone());

        Ok(record)
    }

    async fn get(&self, event_id: &str, registrant_key: &str) -> Result<Option<AttendanceRecord>> {
        let key = (event_id.to_string(), registrant_key.to_string());
        Ok(self.records.read().await.get(&key).cloned())
    }

    async fn list_for_event(&self, event_id: &str) -> Result<Vec<AttendanceRecord>> {
        let records = self.records.read().await;
        let mut rows: Vec<AttendanceRecord> = records
            .iter()
            .filter(|((eid, _), _)| eid == event_id)
            .map(|(_, r)| r.clone())
            .collect();
        rows.sort_by(|a, b| b.last_checked_in_at.cmp(&a.last_checked_in_at));
        Ok(rows)
    }
}
