//! Shared models and types
//!
//! This module contains types shared across multiple modules
//! to avoid circular dependencies.

use crate::checkin::CheckinSummary;
use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub decode_connected: bool,
    pub db_connected: bool,
}

/// Gate status response: scanner state plus check-in context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateStatusResponse {
    pub scanner_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_event_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checkin: Option<CheckinSummary>,
    pub registrant_count: usize,
    pub operator_connections: u64,
}
