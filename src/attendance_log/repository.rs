//! Attendance repository (MySQL)
//!
//! Persists attendance records to the `attendance_records` table
//! (migration 001_attendance_records.sql). The composite primary key
//! (event_id, registrant_key) plus `ON DUPLICATE KEY UPDATE` gives the
//! conditional upsert the store contract requires: `first_checked_in_at` is
//! written on insert and never touched on update.

use super::AttendanceStore;
use crate::directory::{AttendanceRecord, CheckinMethod};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

/// MySQL-backed attendance store
pub struct AttendanceRepository {
    pool: MySqlPool,
}

impl AttendanceRepository {
    /// Create new repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl AttendanceStore for AttendanceRepository {
    async fn upsert(&self, event_id: &str, record: AttendanceRecord) -> Result<AttendanceRecord> {
        sqlx::query(
            r#"
            INSERT INTO attendance_records
                (event_id, registrant_key, display_name, primary_id,
                 first_checked_in_at, last_checked_in_at, recorded_by, method)
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                display_name = VALUES(display_name),
                primary_id = VALUES(primary_id),
                last_checked_in_at = VALUES(last_checked_in_at),
                recorded_by = VALUES(recorded_by),
                method = VALUES(method)
            "#,
        )
        .bind(event_id)
        .bind(&record.registrant_key)
        .bind(&record.display_name)
        .bind(&record.primary_id)
        .bind(record.first_checked_in_at)
        .bind(record.last_checked_in_at)
        .bind(&record.recorded_by)
        .bind(record.method.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Persistence(e.to_string()))?;

        // Re-read so the caller sees the preserved first_checked_in_at.
        let stored = self.get(event_id, &record.registrant_key).await?;
        stored.ok_or_else(|| {
            Error::Persistence(format!(
                "Record missing after upsert for event {} registrant {}",
                event_id, record.registrant_key
            ))
        })
    }

    async fn get(&self, event_id: &str, registrant_key: &str) -> Result<Option<AttendanceRecord>> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT
                registrant_key, display_name, primary_id,
                first_checked_in_at, last_checked_in_at, recorded_by, method
            FROM attendance_records
            WHERE event_id = ? AND registrant_key = ?
            "#,
        )
        .bind(event_id)
        .bind(registrant_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Persistence(e.to_string()))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_for_event(&self, event_id: &str) -> Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT
                registrant_key, display_name, primary_id,
                first_checked_in_at, last_checked_in_at, recorded_by, method
            FROM attendance_records
            WHERE event_id = ?
            ORDER BY last_checked_in_at DESC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Persistence(e.to_string()))?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

/// DB row mapping struct
#[derive(sqlx::FromRow)]
struct AttendanceRow {
    registrant_key: String,
    display_name: String,
    primary_id: String,
    first_checked_in_at: DateTime<Utc>,
    last_checked_in_at: DateTime<Utc>,
    recorded_by: String,
    method: String,
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(row: AttendanceRow) -> Self {
        Self {
            registrant_key: row.registrant_key,
            display_name: row.display_name,
            primary_id: row.primary_id,
            first_checked_in_at: row.first_checked_in_at,
            last_checked_in_at: row.last_checked_in_at,
            recorded_by: row.recorded_by,
            method: CheckinMethod::from(row.method.as_str()),
        }
    }
}
