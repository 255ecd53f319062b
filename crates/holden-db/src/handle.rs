//! The shared database handle and its bootstrap.
//!
//! Startup is two steps, both fatal to the caller on failure: [`open`] builds
//! the connection pool, then [`ensure_schema`] runs the owning crate's
//! `CREATE TABLE IF NOT EXISTS` statement on one of its connections.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::time::Duration;
use thiserror::Error;

/// The handle every request shares: a pool of SQLite connections.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Tunables applied when the handle is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleSettings {
    /// How long a connection waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
    pub pool_max_size: u32,
}

impl Default for HandleSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// Failures while bringing the handle up.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to open database {path}: {source}")]
    Open { path: String, source: r2d2::Error },

    #[error("no connection available for schema bootstrap: {0}")]
    Checkout(#[source] r2d2::Error),

    #[error("failed to create schema: {0}")]
    Schema(#[source] rusqlite::Error),
}

/// Opens the database at `path` behind a connection pool.
///
/// Every pooled connection gets the configured busy timeout and is switched
/// to WAL journaling. `:memory:` works too, but each connection then has its
/// own database, so callers using it want `pool_max_size: 1`.
///
/// The schema is not touched; see [`ensure_schema`].
///
/// # Errors
///
/// Returns [`DbError::Open`] if the pool cannot establish its connections.
pub fn open(path: &str, settings: HandleSettings) -> Result<DbPool, DbError> {
    let busy_timeout = Duration::from_millis(settings.busy_timeout_ms);
    let manager = SqliteConnectionManager::file(path)
        .with_init(move |conn| prepare_connection(conn, busy_timeout));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)
        .map_err(|source| DbError::Open {
            path: path.to_string(),
            source,
        })?;

    tracing::debug!(path, max_size = settings.pool_max_size, "database handle opened");
    Ok(pool)
}

fn prepare_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;

    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "wal", |row| row.get(0))?;
    // In-memory databases stay in "memory" mode.
    if mode != "wal" && mode != "memory" {
        tracing::warn!(journal_mode = %mode, "database did not switch to WAL journaling");
    }
    Ok(())
}

/// Runs `create_statement` against `conn`.
///
/// The statement is expected to be idempotent (`CREATE TABLE IF NOT
/// EXISTS ...`), so running it on every start leaves existing rows alone.
///
/// # Errors
///
/// Returns [`DbError::Schema`] if the statement fails.
pub fn ensure_schema(conn: &Connection, create_statement: &str) -> Result<(), DbError> {
    conn.execute_batch(create_statement).map_err(DbError::Schema)
}

/// [`open`] followed by [`ensure_schema`] on a freshly checked-out
/// connection.
///
/// # Errors
///
/// Any [`DbError`] from either step.
pub fn open_with_schema(
    path: &str,
    settings: HandleSettings,
    create_statement: &str,
) -> Result<DbPool, DbError> {
    let pool = open(path, settings)?;
    {
        let conn = pool.get().map_err(DbError::Checkout)?;
        ensure_schema(&conn, create_statement)?;
    }
    tracing::info!(path, "database schema ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTES: &str = "CREATE TABLE IF NOT EXISTS notes (id INTEGER PRIMARY KEY, body TEXT)";

    fn single() -> HandleSettings {
        HandleSettings {
            pool_max_size: 1,
            ..HandleSettings::default()
        }
    }

    #[test]
    fn open_applies_settings_to_connections() {
        let settings = HandleSettings {
            busy_timeout_ms: 1_250,
            pool_max_size: 2,
        };

        let pool = open(":memory:", settings).expect("open should succeed");
        let conn = pool.get().expect("should get a connection");

        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .expect("should read busy_timeout");
        assert_eq!(timeout, 1_250);
        assert_eq!(pool.max_size(), 2);
    }

    #[test]
    fn file_database_switches_to_wal() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("holden.db");

        let pool = open(
            path.to_str().expect("temp path should be utf-8"),
            HandleSettings::default(),
        )
        .expect("open should succeed");
        let conn = pool.get().expect("should get a connection");

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .expect("should read journal_mode");
        assert_eq!(mode, "wal");
        assert!(path.exists());
    }

    #[test]
    fn open_leaves_schema_alone() {
        let pool = open(":memory:", single()).expect("open should succeed");
        let conn = pool.get().expect("should get a connection");

        let tables: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get(0))
            .expect("should count tables");
        assert_eq!(tables, 0);
    }

    #[test]
    fn ensure_schema_twice_keeps_rows() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");

        ensure_schema(&conn, NOTES).expect("first bootstrap should succeed");
        conn.execute("INSERT INTO notes (body) VALUES ('kept')", [])
            .expect("should insert");
        ensure_schema(&conn, NOTES).expect("second bootstrap should succeed");

        let body: String = conn
            .query_row("SELECT body FROM notes", [], |row| row.get(0))
            .expect("row should survive");
        assert_eq!(body, "kept");
    }

    #[test]
    fn bad_create_statement_is_a_schema_error() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");

        let err = ensure_schema(&conn, "CREATE TABLE (").expect_err("should fail");
        assert!(matches!(err, DbError::Schema(_)), "got {err:?}");
    }

    #[test]
    fn open_with_schema_yields_a_ready_handle() {
        let pool = open_with_schema(":memory:", single(), NOTES).expect("bootstrap should succeed");
        let conn = pool.get().expect("should get a connection");

        conn.execute("INSERT INTO notes (body) VALUES ('hi')", [])
            .expect("table should exist");
    }
}
