//! Database schema definitions
//!
//! This module provides constants for the tables and columns of an iMessage
//! `chat.db` that the statistics read, plus the SQL date expression shared by
//! every year-scoped query.

use crate::timestamp::{TimeBasis, APPLE_EPOCH_OFFSET_SECS, NANOS_PER_SECOND};

/// Message table schema
pub mod message {
    /// Table name
    pub const TABLE: &str = "message";
    /// Foreign key into `handle.ROWID`
    pub const HANDLE_ID: &str = "handle_id";
    /// Message text content column (nullable)
    pub const TEXT: &str = "text";
    /// Nanoseconds since 2001-01-01 UTC
    pub const DATE: &str = "date";
    /// 1 when the database owner wrote the message
    pub const IS_FROM_ME: &str = "is_from_me";
}

/// Handle (correspondent) table schema
pub mod handle {
    /// Table name
    pub const TABLE: &str = "handle";
    /// Internal join key
    pub const ROWID: &str = "ROWID";
    /// Phone number or account handle
    pub const ID: &str = "id";
}

/// Tables that must exist before any statistic is computed.
pub const REQUIRED_TABLES: [&str; 2] = [message::TABLE, handle::TABLE];

/// `datetime(...)` expression converting `m.date` to a calendar date-time string.
#[must_use]
pub fn message_datetime_expr(basis: TimeBasis) -> String {
    format!(
        "datetime(m.{date} / {NANOS_PER_SECOND} + {APPLE_EPOCH_OFFSET_SECS}, 'unixepoch'{modifier})",
        date = message::DATE,
        modifier = basis.sqlite_modifier(),
    )
}

/// `strftime(format, ...)` over the converted message date.
#[must_use]
pub fn message_strftime_expr(format: &str, basis: TimeBasis) -> String {
    format!(
        "strftime('{format}', m.{date} / {NANOS_PER_SECOND} + {APPLE_EPOCH_OFFSET_SECS}, 'unixepoch'{modifier})",
        date = message::DATE,
        modifier = basis.sqlite_modifier(),
    )
}
