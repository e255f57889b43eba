//! Core constants for the check-in service.
//!
//! Scan events arrive from RFID readers on the local network as three form
//! fields:
//!
//! ```text
//! tag_id=04A1B2C3&check_time=260314093015&leaving=0
//! ```
//!
//! Where:
//! - `tag_id` - Raw tag identifier as printed by the reader
//! - `check_time` - Compact local timestamp `YYMMDDHHMMSS`
//! - `leaving` - `0` for an entry scan, `1` for an exit scan
//!
//! # Usage
//!
//! ```
//! use checkin_core::constants::*;
//!
//! assert_eq!(SYSTEM_USER_ID, 1);
//! assert_eq!(CHECK_TIME_FORMAT, "%y%m%d%H%M%S");
//! ```

// ============================================================================
// Tables
// ============================================================================

/// Table holding one row per accepted scan.
pub const SCAN_EVENTS_TABLE: &str = "scan_events";

/// Table mapping tags to users.
pub const USERS_TABLE: &str = "users";

// ============================================================================
// Users
// ============================================================================

/// User id stored when a tag has no owner.
///
/// Scans from unknown tags are still recorded so they can be reassigned
/// later; the response carries a warning instead of an error.
pub const UNKNOWN_USER_ID: i64 = 0;

/// Reserved system account.
///
/// Used by the operators for reader tests; never appears in rankings.
pub const SYSTEM_USER_ID: i64 = 1;

// ============================================================================
// Tag Format Constraints
// ============================================================================

/// Maximum tag id length (characters).
///
/// Readers on site emit 8-24 hex characters; the limit leaves room for
/// vendors that prefix a reader code.
pub const MAX_TAG_LENGTH: usize = 64;

// ============================================================================
// Time Formats
// ============================================================================

/// chrono format of the `check_time` field (`260314093015`).
pub const CHECK_TIME_FORMAT: &str = "%y%m%d%H%M%S";

/// chrono format of the `record_time` column and of `ranking.start`.
///
/// Matches SQLite `datetime()` output, so string comparison in SQL is
/// chronological.
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// Aggregation
// ============================================================================

/// Distance credited for one completed entry/exit lap (meters).
pub const DEFAULT_METERS_PER_LAP: i64 = 10;
