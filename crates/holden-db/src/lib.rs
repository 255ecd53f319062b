//! Database layer for the Holden service.
//!
//! Provides the shared SQLite handle (an `r2d2` pool), its schema bootstrap,
//! and the generic row mapper that turns query results into typed records.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: the service owns a single embedded database
//!   file. WAL mode allows concurrent readers with a single writer.
//! - **`r2d2` connection pool**: the pool is the one handle shared by every
//!   request; each blocking call checks out its own connection.
//! - **Declared binding tables**: record shapes list their fields once, in
//!   column order, and [`mapper::fetch_one`] / [`mapper::fetch_many`] work
//!   for any shape that does.

pub mod mapper;
mod handle;

pub use mapper::{decode_row, fetch_many, fetch_one, Field, MapError, Record, RowSource, Setter};
pub use handle::{ensure_schema, open, open_with_schema, DbError, DbPool, HandleSettings};
