//! Shared fixtures: real SQLite images built on disk and read back as bytes.

#![allow(dead_code)]

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use txt_wrapped::timestamp::{naive_to_apple_nanos, TimeBasis};

pub const ALICE: &str = "+15550001111";
pub const BOB: &str = "bob@example.com";
pub const CAROL: &str = "+15550003333";
pub const DAVE: &str = "+15550004444";

struct FixtureMessage {
    handle: i64,
    text: Option<String>,
    date: i64,
    from_me: bool,
}

/// Builder for a minimal `chat.db` with `handle` and `message` tables
#[derive(Default)]
pub struct ChatDb {
    handles: Vec<String>,
    messages: Vec<FixtureMessage>,
    raw: Vec<String>,
}

/// Stored timestamp for a UTC `YYYY-MM-DD HH:MM:SS` string
pub fn utc(at: &str) -> i64 {
    let dt = NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M:%S").expect("fixture date");
    naive_to_apple_nanos(dt, TimeBasis::Utc).expect("fixture date in range")
}

impl ChatDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// ROWID of `id`, inserting it on first use
    pub fn handle(&mut self, id: &str) -> i64 {
        let index = match self.handles.iter().position(|h| h == id) {
            Some(index) => index,
            None => {
                self.handles.push(id.to_string());
                self.handles.len() - 1
            }
        };
        i64::try_from(index).expect("small fixture") + 1
    }

    pub fn sent(&mut self, id: &str, text: Option<&str>, at: &str) -> &mut Self {
        self.push(id, text, at, true)
    }

    pub fn received(&mut self, id: &str, text: Option<&str>, at: &str) -> &mut Self {
        self.push(id, text, at, false)
    }

    /// Self-sent message whose `text` column is the SQL expression `text_sql`,
    /// e.g. a BLOB literal or a cast of invalid UTF-8
    pub fn raw_sent(&mut self, id: &str, text_sql: &str, at: &str) -> &mut Self {
        let handle = self.handle(id);
        self.raw.push(format!(
            "INSERT INTO message (guid, text, handle_id, date, is_from_me) \
             VALUES ('raw-{}', {text_sql}, {handle}, {}, 1);",
            self.raw.len(),
            utc(at)
        ));
        self
    }

    /// `n` identical messages
    pub fn repeat(&mut self, n: usize, id: &str, text: &str, at: &str, from_me: bool) -> &mut Self {
        for _ in 0..n {
            self.push(id, Some(text), at, from_me);
        }
        self
    }

    fn push(&mut self, id: &str, text: Option<&str>, at: &str, from_me: bool) -> &mut Self {
        let handle = self.handle(id);
        self.messages.push(FixtureMessage {
            handle,
            text: text.map(str::to_string),
            date: utc(at),
            from_me,
        });
        self
    }

    fn write(&self, conn: &Connection) {
        conn.execute_batch(
            "CREATE TABLE handle (ROWID INTEGER PRIMARY KEY AUTOINCREMENT, id TEXT NOT NULL, service TEXT);
             CREATE TABLE message (
                 ROWID INTEGER PRIMARY KEY AUTOINCREMENT,
                 guid TEXT,
                 text TEXT,
                 handle_id INTEGER DEFAULT 0,
                 date INTEGER,
                 is_from_me INTEGER DEFAULT 0
             );",
        )
        .expect("create tables");

        for (index, id) in self.handles.iter().enumerate() {
            conn.execute(
                "INSERT INTO handle (ROWID, id, service) VALUES (?1, ?2, 'iMessage')",
                params![i64::try_from(index).expect("small fixture") + 1, id],
            )
            .expect("insert handle");
        }
        for (index, message) in self.messages.iter().enumerate() {
            conn.execute(
                "INSERT INTO message (guid, text, handle_id, date, is_from_me) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    format!("guid-{index}"),
                    message.text,
                    message.handle,
                    message.date,
                    i64::from(message.from_me)
                ],
            )
            .expect("insert message");
        }
        for statement in &self.raw {
            conn.execute_batch(statement).expect("insert raw message");
        }
    }

    /// Raw database image
    pub fn bytes(&self) -> Vec<u8> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("chat.db");
        {
            let conn = Connection::open(&path).expect("open fixture db");
            self.write(&conn);
            conn.close().expect("close fixture db");
        }
        std::fs::read(&path).expect("read fixture db")
    }

    /// Database image written to `dir`
    pub fn file_in(&self, dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("chat.db");
        std::fs::write(&path, self.bytes()).expect("write fixture file");
        path
    }
}

/// Four correspondents across 2022 and 2023.
///
/// 2023 self-sent: Alice 4, Bob 3, Carol 2, Dave 1 (total 10).
/// Months: January 2, February 2, March 3, July 1, September 1, December 1.
/// Dave also has 5 self-sent messages late on 2022-12-31.
pub fn sample() -> ChatDb {
    let mut db = ChatDb::new();
    db.sent(ALICE, Some("pizza tonight? 😀"), "2023-01-02 10:00:00")
        .sent(ALICE, Some("pizza pizza 😀😎"), "2023-01-20 19:30:00")
        .sent(ALICE, Some("tacos instead"), "2023-03-04 12:00:00")
        .sent(ALICE, Some("happy new year"), "2023-12-31 23:00:00")
        .received(ALICE, Some("pizza sounds great"), "2023-01-02 10:05:00")
        .received(ALICE, None, "2023-01-02 10:06:00")
        .sent(BOB, Some("meeting moved"), "2023-02-01 09:00:00")
        .sent(BOB, Some("meeting moved again"), "2023-02-14 09:00:00")
        .sent(BOB, Some("see you there 👍"), "2023-07-04 15:00:00")
        .sent(CAROL, Some("hiking saturday"), "2023-03-10 08:00:00")
        .sent(CAROL, Some("hiking sunday"), "2023-03-11 08:00:00")
        .sent(DAVE, Some("late reply"), "2023-09-09 21:00:00")
        .repeat(5, DAVE, "last minute", "2022-12-31 23:59:59", true);
    db
}
