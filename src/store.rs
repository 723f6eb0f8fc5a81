//! In-memory message store loaded from an uploaded `chat.db` image.
//!
//! The uploaded bytes are restored into a private in-memory SQLite connection
//! with the online backup API, so nothing the analysis does can touch the
//! caller's file. Only read-only statements are accepted by [`MessageStore::query`].

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, ToSql};
use tracing::{debug, info, warn};

use crate::error::{Result, WrappedError};
use crate::schema::REQUIRED_TABLES;
use crate::validation::InputValidator;

/// Pages copied per backup step while restoring an image.
const RESTORE_PAGES_PER_STEP: i32 = 256;

/// A row returned by [`MessageStore::query`], fields in select-list order.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRow {
    columns: Vec<(String, Value)>,
}

impl StoreRow {
    /// Value of the named column, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// Column names in select-list order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// All `(name, value)` pairs in select-list order.
    #[must_use]
    pub fn fields(&self) -> &[(String, Value)] {
        &self.columns
    }
}

/// Typed row shape for one query; decoding failures surface as `WrappedError::Query`.
pub trait FromRow: Sized {
    /// Decode one result row.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Owner of the loaded database. Dropping the store closes it.
pub struct MessageStore {
    conn: Option<Connection>,
}

impl std::fmt::Debug for MessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStore")
            .field("open", &self.conn.is_some())
            .finish()
    }
}

impl MessageStore {
    /// Load a SQLite database image into memory.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        InputValidator::validate_database_image(bytes)?;

        // The backup API reads from a connection, so stage the image in a
        // scratch directory (WAL images create -wal/-shm siblings there).
        let scratch = tempfile::tempdir()?;
        let staged_path = scratch.path().join("upload.db");
        {
            let mut staged = std::fs::File::create(&staged_path)?;
            staged.write_all(bytes)?;
            staged.sync_all()?;
        }

        let source = Connection::open(&staged_path)
            .map_err(|e| WrappedError::load("opening uploaded image", &e))?;
        let mut memory = Connection::open_in_memory()
            .map_err(|e| WrappedError::load("opening in-memory database", &e))?;

        // An in-memory destination cannot change page size mid-backup.
        let page_size: i64 = source
            .query_row("PRAGMA page_size", [], |row| row.get(0))
            .map_err(|e| WrappedError::load("reading page size", &e))?;
        memory
            .pragma_update(None, "page_size", page_size)
            .map_err(|e| WrappedError::load("setting page size", &e))?;

        {
            let backup = Backup::new(&source, &mut memory)
                .map_err(|e| WrappedError::load("starting restore", &e))?;
            backup
                .run_to_completion(RESTORE_PAGES_PER_STEP, Duration::ZERO, None)
                .map_err(|e| WrappedError::load("restoring image", &e))?;
        }
        drop(source);

        // Corrupt pages only show up once the catalog is read.
        memory
            .query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(|e| WrappedError::load("reading schema", &e))?;

        info!(bytes = bytes.len(), "Loaded message database into memory");
        Ok(Self { conn: Some(memory) })
    }

    /// Read a database file from disk and load it.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::load(&bytes)
    }

    /// Build a store by executing a SQL dump.
    ///
    /// All-or-nothing: the script runs against a fresh connection that is only
    /// handed out when every statement succeeded and no transaction was left open.
    pub fn load_from_script(script: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| WrappedError::load("opening in-memory database", &e))?;

        if let Err(e) = conn.execute_batch(script) {
            warn!(error = %e, "SQL script failed, discarding partially built database");
            return Err(WrappedError::load("executing script", &e));
        }

        if !conn.is_autocommit() {
            warn!("SQL script left a transaction open, discarding database");
            return Err(WrappedError::Load(
                "script ended inside an open transaction".to_string(),
            ));
        }

        info!("Loaded message database from SQL script");
        Ok(Self { conn: Some(conn) })
    }

    fn connection(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(WrappedError::Closed)
    }

    /// Whether `close()` has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// Fail with `Query` unless every table the statistics read is present.
    pub fn check_schema(&self) -> Result<()> {
        let conn = self.connection()?;
        for table in REQUIRED_TABLES {
            let found = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
                    [table],
                    |row| row.get::<_, i64>(0),
                )
                .optional()
                .map_err(|e| WrappedError::query("schema check", &e))?;
            if found.is_none() {
                return Err(WrappedError::Query(format!("missing table '{table}'")));
            }
        }
        Ok(())
    }

    /// Execute a read-only statement and return its rows as ordered field maps.
    pub fn query(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<StoreRow>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql).map_err(|e| WrappedError::query("query", &e))?;
        if !stmt.readonly() {
            return Err(WrappedError::Query("only read-only statements are allowed".to_string()));
        }

        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt
            .query_map(params, |row| {
                names
                    .iter()
                    .enumerate()
                    .map(|(idx, name)| Ok((name.clone(), row.get::<_, Value>(idx)?)))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(|e| WrappedError::query("query", &e))?;

        rows.map(|columns| columns.map(|columns| StoreRow { columns }))
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| WrappedError::query("query", &e))
    }

    /// Execute a named query and decode every row into `T`.
    pub fn query_as<T: FromRow>(
        &self,
        name: &str,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<T>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql).map_err(|e| WrappedError::query(name, &e))?;
        let rows = stmt
            .query_map(params, |row| T::from_row(row))
            .map_err(|e| WrappedError::query(name, &e))?;
        let decoded = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| WrappedError::query(name, &e))?;
        debug!(query = name, rows = decoded.len(), "Query returned");
        Ok(decoded)
    }

    /// Visit each row of a named query. Decoding is left to `visit`, so a bad
    /// value in one row does not abort the scan; statement errors still do.
    pub fn for_each_row<F>(&self, name: &str, sql: &str, params: &[&dyn ToSql], mut visit: F) -> Result<()>
    where
        F: FnMut(&Row<'_>),
    {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql).map_err(|e| WrappedError::query(name, &e))?;
        let mut rows = stmt.query(params).map_err(|e| WrappedError::query(name, &e))?;
        while let Some(row) = rows.next().map_err(|e| WrappedError::query(name, &e))? {
            visit(row);
        }
        Ok(())
    }

    /// Release the connection. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, e)| WrappedError::Other(format!("Failed to close database: {e}")))?;
            debug!("Message store closed");
        }
        Ok(())
    }
}

impl Drop for MessageStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Error closing message store");
        }
    }
}
