//! Audit log (ring buffer)
//!
//! ## Responsibilities
//!
//! - Accept one audit event per successful check-in
//! - Keep a bounded in-memory trail for operator review
//!
//! Appends are fire-and-forget from the check-in path: a sink failure is
//! logged and never fails the attendance write itself.

use crate::directory::CheckinMethod;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use tokio::sync::RwLock;

/// Audit trail entry emitted after every successful record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub audit_id: u64,
    pub event_id: String,
    pub event_title: String,
    pub registrant_key: String,
    pub display_name: String,
    pub primary_id: String,
    pub timestamp: DateTime<Utc>,
    pub method: CheckinMethod,
    pub actor: String,
}

/// Destination for audit events.
pub trait AuditSink: Send + Sync + 'static {
    /// Append one event. Failures are the caller's to swallow.
    fn append(&self, event: AuditEvent) -> impl Future<Output = Result<u64>> + Send + '_;
}

/// Ring buffer for audit events
struct AuditRingBuffer {
    events: VecDeque<AuditEvent>,
    capacity: usize,
    next_id: u64,
}

impl AuditRingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    fn push(&mut self, mut event: AuditEvent) -> u64 {
        event.audit_id = self.next_id;
        self.next_id += 1;

        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.next_id - 1
    }

    fn latest(&self, count: usize) -> Vec<AuditEvent> {
        self.events.iter().rev().take(count).cloned().collect()
    }

    fn by_event(&self, event_id: &str, count: usize) -> Vec<AuditEvent> {
        self.events
            .iter()
            .rev()
            .filter(|e| e.event_id == event_id)
            .take(count)
            .cloned()
            .collect()
    }
}

/// AuditLog instance
pub struct AuditLog {
    buffer: RwLock<AuditRingBuffer>,
}

impl AuditLog {
    /// Create new AuditLog
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RwLock::new(AuditRingBuffer::new(capacity)),
        }
    }

    /// Get latest audit events
    pub async fn latest(&self, count: usize) -> Vec<AuditEvent> {
        let buffer = self.buffer.read().await;
        buffer.latest(count)
    }

    /// Get audit events for one event
    pub async fn by_event(&self, event_id: &str, count: usize) -> Vec<AuditEvent> {
        let buffer = self.buffer.read().await;
        buffer.by_event(event_id, count)
    }

    /// Get entry count
    pub async fn count(&self) -> usize {
        let buffer = self.buffer.read().await;
        buffer.events.len()
    }
}

impl AuditSink for AuditLog {
    async fn append(&self, event: AuditEvent) -> Result<u64> {
        let mut buffer = self.buffer.write().await;
        let id = buffer.push(event);
        tracing::debug!(audit_id = id, "Audit event appended");
        Ok(id)
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(2000) // Default capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_id: &str) -> AuditEvent {
        AuditEvent {
            audit_id: 0,
            event_id: event_id.to_string(),
            event_title: "Assembly".to_string(),
            registrant_key: "m1".to_string(),
            display_name: "Ana Cruz".to_string(),
            primary_id: "2025-001".to_string(),
            timestamp: Utc::now(),
            method: CheckinMethod::Scan,
            actor: "op-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_append_assigns_ids_and_caps_capacity() {
        let log = AuditLog::new(2);
        let a = log.append(event("e1")).await.unwrap();
        let b = log.append(event("e1")).await.unwrap();
        let c = log.append(event("e2")).await.unwrap();
        assert!(a < b && b < c);

        // Oldest entry was evicted.
        assert_eq!(log.count().await, 2);
        assert_eq!(log.by_event("e1", 10).await.len(), 1);
    }

    #[tokio::test]
    async fn test_latest_is_newest_first() {
        let log = AuditLog::default();
        log.append(event("e1")).await.unwrap();
        log.append(event("e2")).await.unwrap();

        let latest = log.latest(10).await;
        assert_eq!(latest[0].event_id, "e2");
    }
}
