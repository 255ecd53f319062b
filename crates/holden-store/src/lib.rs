//! Holden persistence.
//!
//! Holds the fixed SQL for the `holdens` table, the binding table that lets
//! the generic mapper decode rows into [`Holden`], the startup bootstrap
//! ([`open_store`]) and the three store operations the HTTP layer calls.
//! Reads go through [`holden_db::fetch_one`] / [`holden_db::fetch_many`];
//! the insert is a direct statement.

mod model;

pub use model::{Holden, NewHolden};

use holden_db::{
    fetch_many, fetch_one, open_with_schema, DbError, DbPool, HandleSettings, MapError,
};
use rusqlite::{params, Connection};
use thiserror::Error;

/// The only table the service stores. Safe to run on every start.
pub const CREATE_HOLDENS: &str = "CREATE TABLE IF NOT EXISTS holdens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    age INTEGER,
    height REAL
)";

/// Selects one holden by id. Columns are in table order.
pub const GET_HOLDEN: &str = "SELECT id, name, age, height FROM holdens WHERE id = ?1";

/// Selects every holden in insertion order.
pub const LIST_HOLDENS: &str = "SELECT id, name, age, height FROM holdens ORDER BY id";

/// Inserts a holden; the id is assigned by the database.
pub const INSERT_HOLDEN: &str = "INSERT INTO holdens (name, age, height) VALUES (?1, ?2, ?3)";

/// Errors that can occur during holden operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Fetching or decoding rows failed.
    #[error(transparent)]
    Map(#[from] MapError),

    /// A direct statement failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl StoreError {
    /// Short name of the failure cause, for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Map(e) => e.kind(),
            StoreError::Database(_) => "statement",
        }
    }
}

/// Opens the database at `path` and makes sure the `holdens` table exists.
///
/// # Errors
///
/// Returns [`DbError`] if the handle cannot be opened or the table cannot
/// be created. Either way the service has nothing to serve from.
pub fn open_store(path: &str, settings: HandleSettings) -> Result<DbPool, DbError> {
    open_with_schema(path, settings, CREATE_HOLDENS)
}

/// Stores a new holden and returns it with its generated id.
pub fn create_holden(conn: &Connection, new: &NewHolden) -> Result<Holden, StoreError> {
    conn.execute(INSERT_HOLDEN, params![new.name, new.age, new.height])?;
    let id = conn.last_insert_rowid();

    tracing::debug!(id, "holden created");

    Ok(new.clone().with_id(id))
}

/// Retrieves a holden by id.
///
/// Returns `Ok(None)` when no holden has that id.
pub fn get_holden(conn: &Connection, id: i64) -> Result<Option<Holden>, StoreError> {
    Ok(fetch_one(conn, GET_HOLDEN, [id])?)
}

/// Lists every holden in insertion order. Empty when there are none.
pub fn list_holdens(conn: &Connection) -> Result<Vec<Holden>, StoreError> {
    Ok(fetch_many(conn, LIST_HOLDENS, [])?)
}
