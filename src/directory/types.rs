//! Directory types
//!
//! Registrants and events are owned by an external directory service; this
//! server only holds read-only snapshots of them. Attendance records are the
//! one shape this server writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A person eligible to be checked in to events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registrant {
    /// Opaque stable id assigned by the directory
    pub key: String,
    /// Canonical registration number, e.g. "2025-001"
    pub primary_id: String,
    /// Alternate identifying numbers
    #[serde(default)]
    pub secondary_ids: Vec<String>,
    pub display_name: String,
    /// Grouping label, e.g. locality
    #[serde(default)]
    pub group_tag: Option<String>,
}

/// A schedulable activity registrants check in to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    /// Attendance log keyed by registrant key
    #[serde(default)]
    pub attendance: HashMap<String, AttendanceRecord>,
}

/// How a check-in was entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckinMethod {
    Manual,
    Scan,
}

impl CheckinMethod {
    /// String form for logging and persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckinMethod::Manual => "manual",
            CheckinMethod::Scan => "scan",
        }
    }
}

impl From<&str> for CheckinMethod {
    fn from(s: &str) -> Self {
        match s {
            "scan" => CheckinMethod::Scan,
            _ => CheckinMethod::Manual,
        }
    }
}

/// One attendance entry per (event, registrant) pair.
///
/// `display_name` and `primary_id` are copies taken at recording time, not
/// live references; later directory edits do not rewrite history.
/// `first_checked_in_at` is immutable once set; `last_checked_in_at` advances
/// on every re-scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub registrant_key: String,
    pub display_name: String,
    pub primary_id: String,
    pub first_checked_in_at: DateTime<Utc>,
    pub last_checked_in_at: DateTime<Utc>,
    /// Operator identity that performed the check-in
    pub recorded_by: String,
    pub method: CheckinMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_roundtrip() {
        assert_eq!(CheckinMethod::from("scan"), CheckinMethod::Scan);
        assert_eq!(CheckinMethod::from("manual"), CheckinMethod::Manual);
        assert_eq!(CheckinMethod::Scan.as_str(), "scan");
    }

    #[test]
    fn test_record_serializes_method_snake_case() {
        let now = Utc::now();
        let record = AttendanceRecord {
            registrant_key: "m1".to_string(),
            display_name: "Ana Cruz".to_string(),
            primary_id: "2025-001".to_string(),
            first_checked_in_at: now,
            last_checked_in_at: now,
            recorded_by: "op-1".to_string(),
            method: CheckinMethod::Scan,
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"method\":\"scan\""));
    }
}
