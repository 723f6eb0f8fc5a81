//! Conversion of iMessage `message.date` values.
//!
//! The store keeps nanoseconds since 2001-01-01 00:00:00 UTC. A calendar date
//! is obtained exactly the way SQLite evaluates
//! `datetime(date / 1000000000 + strftime('%s', '2001-01-01'), 'unixepoch', 'localtime')`:
//! truncating integer division first, then the epoch offset, then the zone.

use chrono::{DateTime, Datelike, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z.
pub const APPLE_EPOCH_OFFSET_SECS: i64 = 978_307_200;

/// Divisor applied to the stored value.
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Timezone in which stored instants are bucketed into calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBasis {
    /// Local timezone of the running process
    #[default]
    Local,
    /// Coordinated Universal Time
    Utc,
}

impl TimeBasis {
    /// Trailing `datetime()` modifier that selects this basis in SQLite.
    #[must_use]
    pub const fn sqlite_modifier(self) -> &'static str {
        match self {
            Self::Local => ", 'localtime'",
            Self::Utc => "",
        }
    }
}

impl std::str::FromStr for TimeBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "utc" => Ok(Self::Utc),
            other => Err(format!("unknown time basis '{other}' (expected local or utc)")),
        }
    }
}

/// Unix seconds for a stored value. Division truncates toward zero, as SQLite does.
#[must_use]
pub const fn apple_nanos_to_unix_secs(stored: i64) -> i64 {
    stored / NANOS_PER_SECOND + APPLE_EPOCH_OFFSET_SECS
}

/// Calendar date-time of a stored value in the given basis.
#[must_use]
pub fn apple_nanos_to_naive(stored: i64, basis: TimeBasis) -> Option<NaiveDateTime> {
    let utc = DateTime::from_timestamp(apple_nanos_to_unix_secs(stored), 0)?;
    Some(match basis {
        TimeBasis::Local => utc.with_timezone(&Local).naive_local(),
        TimeBasis::Utc => utc.naive_utc(),
    })
}

/// Calendar year of a stored value in the given basis.
#[must_use]
pub fn year_of(stored: i64, basis: TimeBasis) -> Option<i32> {
    apple_nanos_to_naive(stored, basis).map(|dt| dt.year())
}

/// Stored representation of a calendar date-time interpreted in `basis`.
///
/// Ambiguous local times resolve to the earlier instant; times skipped by a
/// DST transition yield `None`.
#[must_use]
pub fn naive_to_apple_nanos(dt: NaiveDateTime, basis: TimeBasis) -> Option<i64> {
    let unix = match basis {
        TimeBasis::Local => Local.from_local_datetime(&dt).earliest()?.timestamp(),
        TimeBasis::Utc => dt.and_utc().timestamp(),
    };
    (unix - APPLE_EPOCH_OFFSET_SECS).checked_mul(NANOS_PER_SECOND)
}
