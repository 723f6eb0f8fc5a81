//! Data models for the yearly statistics
//!
//! This module contains the records produced by the aggregate queries and the
//! per-correspondent pass, and the calendar period labels used by histograms.

use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Month labels in calendar order.
pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Weekday labels in `strftime('%w')` order (Sunday is 0).
pub const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// A word and how often it appeared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    /// Lower-cased token
    pub word: String,
    /// Occurrences, always at least 1
    pub count: u64,
}

/// An emoji (possibly multi-codepoint) and how often it appeared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiCount {
    /// Emoji sequence as matched
    pub emoji: String,
    /// Occurrences, always at least 1
    pub count: u64,
}

/// Self-sent totals for the target year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextsSentSummary {
    /// Number of self-sent messages in the year
    pub total_texts_sent: u64,
    /// Earliest self-sent message in the year, `None` when there are none
    #[serde(with = "sql_datetime")]
    pub first_text_date: Option<NaiveDateTime>,
    /// Latest self-sent message in the year, `None` when there are none
    #[serde(with = "sql_datetime")]
    pub last_text_date: Option<NaiveDateTime>,
}

/// Self-sent message count towards one correspondent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSender {
    /// Correspondent handle id
    pub id: String,
    /// Messages sent to them in the year
    pub messages_sent: u64,
}

/// A correspondent that receives the word/emoji analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopFriend {
    /// Correspondent handle id
    pub id: String,
    /// Messages sent to them in the year
    pub message_count: u64,
    /// Most frequent words, count descending
    pub top_word_count: Vec<WordCount>,
    /// Most frequent emoji, count descending
    pub top_emojis: Vec<EmojiCount>,
}

/// Top friends in rank order, serialized as an `id -> friend` object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopFriends(pub Vec<TopFriend>);

impl TopFriends {
    /// Look up a friend by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TopFriend> {
        self.0.iter().find(|friend| friend.id == id)
    }

    /// Number of friends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no friends.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Friends in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &TopFriend> {
        self.0.iter()
    }
}

impl Serialize for TopFriends {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for friend in &self.0 {
            map.serialize_entry(&friend.id, friend)?;
        }
        map.end()
    }
}

/// Sent/received balance for one correspondent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnbalancedFriend {
    /// Correspondent handle id
    pub id: String,
    /// Self-sent messages (all time)
    pub sent: u64,
    /// Received messages (all time)
    pub received: u64,
    /// `|sent - received|`
    pub imbalance: u64,
    /// `sent / received`, `None` when nothing was received
    pub ratio: Option<f64>,
}

/// Calendar bucket used by the per-period histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    /// Month of year
    #[default]
    Month,
    /// Day of week
    Weekday,
}

impl PeriodKind {
    /// Every label of this kind in calendar order.
    #[must_use]
    pub const fn labels(self) -> &'static [&'static str] {
        match self {
            Self::Month => &MONTHS,
            Self::Weekday => &WEEKDAYS,
        }
    }

    /// `strftime` format that yields the bucket code.
    #[must_use]
    pub const fn strftime_format(self) -> &'static str {
        match self {
            Self::Month => "%m",
            Self::Weekday => "%w",
        }
    }

    /// Label for a `strftime` code (`"01"` → January, `"0"` → Sunday).
    #[must_use]
    pub fn label_for_code(self, code: &str) -> Option<&'static str> {
        let index: usize = code.trim().parse().ok()?;
        match self {
            Self::Month => index.checked_sub(1).and_then(|i| MONTHS.get(i)).copied(),
            Self::Weekday => WEEKDAYS.get(index).copied(),
        }
    }
}

impl std::str::FromStr for PeriodKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "month" | "months" => Ok(Self::Month),
            "weekday" | "day" | "days" => Ok(Self::Weekday),
            other => Err(format!("unknown period '{other}' (expected month or weekday)")),
        }
    }
}

/// One histogram bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodCount {
    /// Calendar label
    pub label: &'static str,
    /// Self-sent messages in the bucket
    pub count: u64,
}

/// Total mapping from every period label to a count.
///
/// Buckets are ordered by count descending, calendar order on ties. Serialized
/// as a JSON object in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodHistogram {
    kind: PeriodKind,
    counts: Vec<PeriodCount>,
}

impl PeriodHistogram {
    /// Build from sparse `(label, count)` pairs; absent labels get 0.
    /// Unknown labels are ignored.
    pub fn from_counts<'a, I>(kind: PeriodKind, sparse: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let mut counts: Vec<PeriodCount> = kind
            .labels()
            .iter()
            .map(|&label| PeriodCount { label, count: 0 })
            .collect();
        for (label, count) in sparse {
            if let Some(bucket) = counts.iter_mut().find(|bucket| bucket.label == label) {
                bucket.count += count;
            }
        }
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        Self { kind, counts }
    }

    /// The bucket kind.
    #[must_use]
    pub const fn kind(&self) -> PeriodKind {
        self.kind
    }

    /// Count for a label, `None` if the label is not of this kind.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<u64> {
        self.counts.iter().find(|c| c.label == label).map(|c| c.count)
    }

    /// Buckets in ranked order.
    #[must_use]
    pub fn buckets(&self) -> &[PeriodCount] {
        &self.counts
    }

    /// Sum over every bucket.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| c.count).sum()
    }
}

impl Serialize for PeriodHistogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for bucket in &self.counts {
            map.serialize_entry(bucket.label, &bucket.count)?;
        }
        map.end()
    }
}

/// `YYYY-MM-DD HH:MM:SS`, the format SQLite's `datetime()` produces.
pub mod sql_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Format string shared with SQLite.
    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Parse a SQLite `datetime()` string.
    pub fn parse(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(value, FORMAT)
    }

    /// Serialize an optional date-time.
    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional date-time.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
