//! checkgate - Attendance Check-in Gate Server
//!
//! ## Architecture
//!
//! 1. DirectoryStore - registrant/event snapshots (replaced per feed push)
//! 2. Identifier - payload parsing and key normalization
//! 3. RegistrantMatcher - priority-ordered identifier resolution
//! 4. AttendanceLog - first-preserved keyed upserts (MySQL / in-memory)
//! 5. AuditLog - fire-and-forget audit trail (ring buffer)
//! 6. CheckinService - the parse → match → record tail, shared by both
//!    entry paths
//! 7. ScanLoopController - camera scan loop with cooldown and re-entrancy
//!    gate
//! 8. RealtimeHub - operator signal distribution (WebSocket)
//! 9. WebAPI - REST endpoints
//!
//! ## Design Principles
//!
//! - One recording contract: scanned and typed identifiers go through the
//!   same tail, only the method tag differs
//! - Snapshots are read fresh at use, never captured by the loop
//! - External collaborators (camera, decoder, persistence, audit) are
//!   injected capability interfaces

pub mod attendance_log;
pub mod audit_log;
pub mod checkin;
pub mod directory;
pub mod error;
pub mod identifier;
pub mod matcher;
pub mod models;
pub mod realtime_hub;
pub mod scanner;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
