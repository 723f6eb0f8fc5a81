//! Aggregate queries over the `message` and `handle` tables.
//!
//! Each query is parameterized (year, limits, ids are bound, never spliced into
//! the SQL text) and decodes into an explicit row type, so a schema that does
//! not match surfaces as `WrappedError::Query`.

use rusqlite::types::Type;
use rusqlite::{params, Row};
use tracing::debug;

use crate::error::{Result, WrappedError};
use crate::logging::OperationTimer;
use crate::models::{
    sql_datetime, PeriodHistogram, PeriodKind, TextsSentSummary, TopSender, UnbalancedFriend,
};
use crate::schema::{message_datetime_expr, message_strftime_expr};
use crate::store::{FromRow, MessageStore};
use crate::timestamp::TimeBasis;

/// Number of correspondents that get the word/emoji analysis.
pub const TOP_FRIENDS_LIMIT: usize = 3;
/// Default length of the top-senders list.
pub const DEFAULT_TOP_SENDERS_LIMIT: usize = 10;
/// Self-sent messages a correspondent needs (strictly more than) to be ranked
/// by the unbalanced-friend query.
pub const DEFAULT_UNBALANCED_MIN_SENT: u32 = 50;

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl FromRow for TextsSentSummary {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let parse = |idx: usize| -> rusqlite::Result<_> {
            row.get::<_, Option<String>>(idx)?
                .map(|value| sql_datetime::parse(&value).map_err(|e| conversion_error(idx, e)))
                .transpose()
        };
        Ok(Self {
            total_texts_sent: row.get("total_texts_sent")?,
            first_text_date: parse(1)?,
            last_text_date: parse(2)?,
        })
    }
}

impl FromRow for TopSender {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            messages_sent: row.get("messages_sent")?,
        })
    }
}

impl FromRow for UnbalancedFriend {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            sent: row.get("sent")?,
            received: row.get("received")?,
            imbalance: row.get("imbalance")?,
            ratio: row.get("ratio")?,
        })
    }
}

/// Self-sent message count for one correspondent in the target year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendCount {
    /// Correspondent handle id
    pub id: String,
    /// Messages sent to them in the year
    pub message_count: u64,
}

impl FromRow for FriendCount {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            message_count: row.get("message_count")?,
        })
    }
}

/// Raw `strftime` bucket code and its count.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PeriodRow {
    code: String,
    messages_sent: u64,
}

impl FromRow for PeriodRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            code: row.get("period")?,
            messages_sent: row.get("messages_sent")?,
        })
    }
}

struct LatestDate(Option<i64>);

impl FromRow for LatestDate {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self(row.get(0)?))
    }
}

struct Count(u64);

impl FromRow for Count {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self(row.get(0)?))
    }
}

/// Runs `f`, logging and recording its duration under `name`.
fn timed<T>(name: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let timer = OperationTimer::new(name);
    let result = f();
    timer.finish(result.is_ok());
    result
}

/// Calendar year of the newest self-sent message, if any.
pub fn latest_self_sent_year(store: &MessageStore, basis: TimeBasis) -> Result<Option<i32>> {
    let rows: Vec<LatestDate> = timed("latest_year", || {
        store.query_as(
            "latest_year",
            "SELECT MAX(m.date) FROM message m WHERE m.is_from_me = 1",
            &[],
        )
    })?;
    Ok(rows
        .into_iter()
        .next()
        .and_then(|LatestDate(date)| date)
        .and_then(|date| crate::timestamp::year_of(date, basis)))
}

/// Year-scoped aggregate queries against one loaded store
#[derive(Debug, Clone, Copy)]
pub struct AggregateQueries<'s> {
    store: &'s MessageStore,
    year: i32,
    basis: TimeBasis,
}

impl<'s> AggregateQueries<'s> {
    /// Queries restricted to `year` as seen in `basis`
    #[must_use]
    pub const fn new(store: &'s MessageStore, year: i32, basis: TimeBasis) -> Self {
        Self { store, year, basis }
    }

    /// Target year
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    fn year_param(&self) -> String {
        format!("{:04}", self.year)
    }

    fn year_filter(&self) -> String {
        format!("{} = ?1", message_strftime_expr("%Y", self.basis))
    }

    /// Count and first/last date of self-sent messages in the year
    pub fn summary(&self) -> Result<TextsSentSummary> {
        let datetime = message_datetime_expr(self.basis);
        let sql = format!(
            "SELECT
                COUNT(*) AS total_texts_sent,
                MIN({datetime}) AS first_text_date,
                MAX({datetime}) AS last_text_date
            FROM message m
            WHERE m.is_from_me = 1
              AND {year_filter}",
            year_filter = self.year_filter(),
        );
        let year = self.year_param();
        let rows: Vec<TextsSentSummary> =
            timed("summary", || self.store.query_as("summary", &sql, params![year]))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| WrappedError::Query("summary: aggregate returned no row".to_string()))
    }

    /// Correspondents by self-sent count in the year, descending
    pub fn top_senders(&self, limit: usize) -> Result<Vec<TopSender>> {
        let sql = format!(
            "SELECT
                h.id AS id,
                COUNT(*) AS messages_sent
            FROM message m
            JOIN handle h ON m.handle_id = h.ROWID
            WHERE m.is_from_me = 1
              AND {year_filter}
            GROUP BY h.id
            ORDER BY messages_sent DESC, h.id ASC
            LIMIT ?2",
            year_filter = self.year_filter(),
        );
        let year = self.year_param();
        timed("top_senders", || {
            self.store
                .query_as("top_senders", &sql, params![year, sql_limit(limit)])
        })
    }

    /// Self-sent count for every period label in the year
    pub fn period_histogram(&self, kind: PeriodKind) -> Result<PeriodHistogram> {
        let sql = format!(
            "SELECT
                {period} AS period,
                COUNT(*) AS messages_sent
            FROM message m
            WHERE m.is_from_me = 1
              AND {year_filter}
            GROUP BY period
            ORDER BY messages_sent DESC",
            period = message_strftime_expr(kind.strftime_format(), self.basis),
            year_filter = self.year_filter(),
        );
        let year = self.year_param();
        let rows: Vec<PeriodRow> = timed("period_histogram", || {
            self.store.query_as("period_histogram", &sql, params![year])
        })?;

        let mut sparse = Vec::with_capacity(rows.len());
        for row in rows {
            let label = kind.label_for_code(&row.code).ok_or_else(|| {
                WrappedError::Query(format!("period_histogram: unexpected period code '{}'", row.code))
            })?;
            sparse.push((label, row.messages_sent));
        }
        Ok(PeriodHistogram::from_counts(kind, sparse))
    }

    /// The three correspondents with the most self-sent messages in the year
    pub fn top_friends(&self) -> Result<Vec<FriendCount>> {
        let sql = format!(
            "SELECT
                h.id AS id,
                COUNT(*) AS message_count
            FROM message m
            JOIN handle h ON m.handle_id = h.ROWID
            WHERE {year_filter}
              AND m.is_from_me = 1
            GROUP BY h.id
            ORDER BY message_count DESC, h.id ASC
            LIMIT ?2",
            year_filter = self.year_filter(),
        );
        let year = self.year_param();
        let friends: Vec<FriendCount> = timed("top_friends", || {
            self.store
                .query_as("top_friends", &sql, params![year, sql_limit(TOP_FRIENDS_LIMIT)])
        })?;
        debug!(ids = ?friends.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(), "Top friends");
        Ok(friends)
    }

    /// Self-sent messages to `id` in the year
    pub fn sent_to(&self, id: &str) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*)
            FROM message m
            JOIN handle h ON m.handle_id = h.ROWID
            WHERE h.id = ?2
              AND m.is_from_me = 1
              AND {year_filter}",
            year_filter = self.year_filter(),
        );
        let year = self.year_param();
        let rows: Vec<Count> =
            timed("sent_to", || self.store.query_as("sent_to", &sql, params![year, id]))?;
        Ok(rows.into_iter().next().map_or(0, |Count(n)| n))
    }

    /// See [`unbalanced_friend`].
    pub fn unbalanced_friend(&self, min_sent: u32) -> Result<Option<UnbalancedFriend>> {
        unbalanced_friend(self.store, min_sent)
    }
}

/// Ranks every correspondent with more than `min_sent` self-sent messages (all
/// time) by imbalance ascending, then total volume descending, and returns the
/// first. Ascending means the most *balanced* conversation wins; that ordering
/// is kept as-is for compatibility with existing reports.
pub fn unbalanced_friend(store: &MessageStore, min_sent: u32) -> Result<Option<UnbalancedFriend>> {
    const SQL: &str = "SELECT
            h.id AS id,
            SUM(CASE WHEN m.is_from_me = 1 THEN 1 ELSE 0 END) AS sent,
            SUM(CASE WHEN m.is_from_me = 0 THEN 1 ELSE 0 END) AS received,
            ABS(SUM(CASE WHEN m.is_from_me = 1 THEN 1 ELSE 0 END)
                - SUM(CASE WHEN m.is_from_me = 0 THEN 1 ELSE 0 END)) AS imbalance,
            CASE
                WHEN SUM(CASE WHEN m.is_from_me = 0 THEN 1 ELSE 0 END) = 0 THEN NULL
                ELSE (SUM(CASE WHEN m.is_from_me = 1 THEN 1 ELSE 0 END) * 1.0)
                    / SUM(CASE WHEN m.is_from_me = 0 THEN 1 ELSE 0 END)
            END AS ratio
        FROM message m
        JOIN handle h ON m.handle_id = h.ROWID
        GROUP BY h.id
        HAVING SUM(CASE WHEN m.is_from_me = 1 THEN 1 ELSE 0 END) > ?1
        ORDER BY imbalance ASC, (sent + received) DESC, h.id ASC
        LIMIT 1";

    let rows: Vec<UnbalancedFriend> = timed("unbalanced_friend", || {
        store.query_as("unbalanced_friend", SQL, params![min_sent])
    })?;
    Ok(rows.into_iter().next())
}
