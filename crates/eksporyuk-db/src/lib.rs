//! # eksporyuk-db
//!
//! Database access layer for the Eksporyuk service.
//! Manages the single SQLite database at `$EKSPORYUK_DATA_DIR/eksporyuk.db`.
//!
//! ## Schema
//!
//! - WAL mode, foreign keys enforced
//! - All timestamps are Unix epoch seconds
//! - Money and credits are whole-unit `INTEGER`s
//! - Credit transaction rows are immutable (guarded by triggers)
//! - Schema version stored in `PRAGMA user_version`
//!
//! Query functions take `&Connection` so they can run either directly or
//! inside a `rusqlite::Transaction` (which derefs to `Connection`). Callers
//! that need atomicity across several queries own the transaction.

pub mod migrations;
pub mod queries;
pub mod schema;

use std::path::Path;
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, Row};

/// Schema version produced by [`migrations::run`].
pub const SCHEMA_VERSION: u32 = 1;

/// Milliseconds a connection waits for another writer before failing.
pub const BUSY_TIMEOUT_MS: u32 = 5_000;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("schema migration: {0}")]
    Migration(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("stored value unreadable: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open (creating if needed) the database file and bring its schema up
/// to date.
pub fn open(path: &Path) -> Result<Connection> {
    prepare(Connection::open(path)?)
}

/// Private in-memory database with the full schema. Used by tests.
pub fn open_memory() -> Result<Connection> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(conn: Connection) -> Result<Connection> {
    // The busy timeout goes first so the journal-mode switch already waits
    // on a concurrent writer.
    conn.busy_timeout(std::time::Duration::from_millis(u64::from(BUSY_TIMEOUT_MS)))?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;",
    )?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Generate a fresh row identifier (24 hex chars).
pub fn new_id() -> String {
    hex::encode(rand::random::<[u8; 12]>())
}

/// Map a unique-constraint failure to [`DbError::Constraint`], leaving
/// every other error as is.
pub(crate) fn constraint_or(err: rusqlite::Error, what: &str) -> DbError {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DbError::Constraint(what.to_string())
        }
        other => DbError::Sqlite(other),
    }
}

/// Read a TEXT column holding one of the upper-case domain enums.
pub(crate) fn enum_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a nullable TEXT enum column.
pub(crate) fn opt_enum_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        t.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Read an epoch-seconds column.
pub(crate) fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    Ok(row.get::<_, i64>(idx)? as u64)
}

/// Read a nullable epoch-seconds column.
pub(crate) fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<u64>> {
    Ok(row.get::<_, Option<i64>>(idx)?.map(|v| v as u64))
}
