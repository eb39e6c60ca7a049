use crate::error::StoreError;
use crate::records::ErrorRecord;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const TABLE_NAME: &str = "log_err";

const CREATE_TABLE: &str = "
    CREATE TABLE log_err (
        id INTEGER PRIMARY KEY,
        server TEXT NOT NULL,
        ts TEXT NOT NULL,
        level TEXT,
        fname TEXT,
        lineno INTEGER,
        msg TEXT,
        UNIQUE (server, ts)
    )";

/// Result of [`ErrorStore::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was new and has been committed
    Inserted,
    /// A record with the same `(server, timestamp)` already exists
    Duplicate,
}

/// Key lookup and insertion used by the report engine
///
/// [`ErrorStore`] is the SQLite implementation.
#[cfg_attr(test, mockall::automock)]
pub trait RecordStore {
    /// Whether a record keyed by `(server, timestamp)` has been stored
    fn exists(&self, server: &str, timestamp: &str) -> Result<bool, StoreError>;

    /// Persist `record`, reporting a key collision as [`InsertOutcome::Duplicate`]
    fn insert(&self, record: &ErrorRecord) -> Result<InsertOutcome, StoreError>;
}

/// Durable record of every `(server, timestamp)` pair that has been reported
///
/// Holds a single SQLite connection for the lifetime of the process. Each
/// insert runs in autocommit mode, so it is durable once the call returns.
/// The schema is only created by [`ErrorStore::initialize`].
#[derive(Debug)]
pub struct ErrorStore {
    conn: Connection,
}

impl ErrorStore {
    /// Open (or create) the database file at `path`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Sqlite` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        debug!("Opening error store at {}", path.display());
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database
    ///
    /// The database lives as long as the returned store and starts without
    /// a schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Sqlite` if SQLite cannot allocate the connection.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Create the `log_err` table
    ///
    /// This is a one-time administrative action and is not idempotent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyInitialized` if the table already exists.
    pub fn initialize(&self) -> Result<(), StoreError> {
        if self.table_exists()? {
            return Err(StoreError::AlreadyInitialized(format!(
                "table {} already exists",
                TABLE_NAME
            )));
        }

        self.conn.execute(CREATE_TABLE, [])?;
        debug!("Created table {}", TABLE_NAME);
        Ok(())
    }

    fn table_exists(&self) -> Result<bool, StoreError> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![TABLE_NAME],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Check whether an error with this key has already been stored
    ///
    /// # Arguments
    ///
    /// * `server` - Server address the error was fetched from
    /// * `timestamp` - Normalized `TS` value (see [`crate::records::normalize_timestamp`])
    ///
    /// # Returns
    ///
    /// `true` if a row with the same `(server, ts)` pair exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Sqlite` if the query fails, including when the
    /// table has not been initialized.
    pub fn exists(&self, server: &str, timestamp: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM log_err WHERE server = ?1 AND ts = ?2",
                params![server, timestamp],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Persist a newly seen error
    ///
    /// A uniqueness violation on `(server, ts)` is reported as
    /// [`InsertOutcome::Duplicate`]; the stored row is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Sqlite` for any failure other than the
    /// uniqueness violation.
    pub fn insert(&self, record: &ErrorRecord) -> Result<InsertOutcome, StoreError> {
        let result = self.conn.execute(
            "INSERT INTO log_err (server, ts, level, fname, lineno, msg)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.server,
                record.timestamp,
                record.level,
                record.file,
                record.line,
                record.message
            ],
        );

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Every stored record in insertion order
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Sqlite` if the table is missing or a row cannot
    /// be decoded.
    pub fn all(&self) -> Result<Vec<ErrorRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT server, ts, level, fname, lineno, msg FROM log_err ORDER BY id")?;

        let rows = stmt.query_map([], |row| {
            Ok(ErrorRecord {
                server: row.get(0)?,
                timestamp: row.get(1)?,
                level: row.get(2)?,
                file: row.get(3)?,
                line: row.get(4)?,
                message: row.get(5)?,
            })
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

impl RecordStore for ErrorStore {
    fn exists(&self, server: &str, timestamp: &str) -> Result<bool, StoreError> {
        ErrorStore::exists(self, server, timestamp)
    }

    fn insert(&self, record: &ErrorRecord) -> Result<InsertOutcome, StoreError> {
        ErrorStore::insert(self, record)
    }
}
