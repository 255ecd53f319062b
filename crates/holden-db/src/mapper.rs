//! Generic row-to-record mapping.
//!
//! A record shape implements [`Record`] by declaring its fields in column
//! order, each with a typed setter. [`decode_row`] reads every column of a
//! row into a scratch buffer and hands each raw value to the matching
//! setter; [`fetch_one`] and [`fetch_many`] run a query and decode its
//! result through the same path.
//!
//! # Conversion policy
//!
//! Decoding is best-effort per field. A raw value is assigned when it
//! converts to the field's declared type:
//!
//! | Field type | Accepted raw values |
//! |------------|---------------------|
//! | `Integer`  | `INTEGER` |
//! | `Real`     | `REAL`, `INTEGER` (widened) |
//! | `Text`     | `TEXT`, UTF-8 `BLOB` |
//! | `Blob`     | `BLOB`, `TEXT` |
//!
//! Any other value, `NULL` included, leaves the field at its `Default`
//! value and the decode still succeeds. A schema that drifts away from a
//! record shape therefore shows up as zeroed fields rather than errors; the
//! skips are logged at `debug` level under this module's target.
//!
//! A wrong column *count* is not recovered: it fails the decode with
//! [`MapError::ColumnCount`].

use rusqlite::types::Value;
use rusqlite::{Connection, Params, Row, Statement};
use thiserror::Error;

/// Typed assignment into one field of a record.
///
/// The variant fixes the field's declared type.
pub enum Setter<T> {
    Integer(fn(&mut T, i64)),
    Real(fn(&mut T, f64)),
    Text(fn(&mut T, String)),
    Blob(fn(&mut T, Vec<u8>)),
}

impl<T> Setter<T> {
    /// Assigns `value` if it converts to this setter's type.
    ///
    /// Returns `false` when the value was skipped.
    fn apply(&self, record: &mut T, value: Value) -> bool {
        match (self, value) {
            (Setter::Integer(set), Value::Integer(i)) => set(record, i),
            (Setter::Real(set), Value::Real(f)) => set(record, f),
            (Setter::Real(set), Value::Integer(i)) => set(record, i as f64),
            (Setter::Text(set), Value::Text(s)) => set(record, s),
            (Setter::Text(set), Value::Blob(bytes)) => match String::from_utf8(bytes) {
                Ok(s) => set(record, s),
                Err(_) => return false,
            },
            (Setter::Blob(set), Value::Blob(bytes)) => set(record, bytes),
            (Setter::Blob(set), Value::Text(s)) => set(record, s.into_bytes()),
            _ => return false,
        }
        true
    }

    /// Name of the declared type, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Setter::Integer(_) => "Integer",
            Setter::Real(_) => "Real",
            Setter::Text(_) => "Text",
            Setter::Blob(_) => "Blob",
        }
    }
}

/// One entry of a record's binding table.
pub struct Field<T> {
    /// Field name, used only in diagnostics. Binding is positional.
    pub name: &'static str,
    pub setter: Setter<T>,
}

/// A fixed-shape record that rows can be decoded into.
///
/// `FIELDS` lists the record's fields in the exact order the columns of
/// every query decoded into this shape appear.
///
/// ```rust,ignore
/// impl Record for Point {
///     const FIELDS: &'static [Field<Self>] = &[
///         Field { name: "x", setter: Setter::Real(|p, v| p.x = v) },
///         Field { name: "y", setter: Setter::Real(|p, v| p.y = v) },
///     ];
/// }
/// ```
pub trait Record: Default + 'static {
    const FIELDS: &'static [Field<Self>];
}

/// Something holding one row of raw column values.
pub trait RowSource {
    /// Number of columns in the row.
    fn column_count(&self) -> usize;

    /// Reads column `idx` without any type conversion.
    fn raw_value(&self, idx: usize) -> rusqlite::Result<Value>;
}

impl RowSource for Row<'_> {
    fn column_count(&self) -> usize {
        let stmt: &Statement<'_> = self.as_ref();
        stmt.column_count()
    }

    fn raw_value(&self, idx: usize) -> rusqlite::Result<Value> {
        self.get(idx)
    }
}

/// Errors that can occur while fetching and decoding records.
///
/// An absent row is not an error: [`fetch_one`] returns `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum MapError {
    /// The query could not be prepared or its parameters bound.
    #[error("query failed: {0}")]
    Query(#[source] rusqlite::Error),

    /// The row's column count does not match the record shape.
    #[error("column count mismatch: record has {expected} fields, row has {found} columns")]
    ColumnCount {
        /// Number of fields in the record shape.
        expected: usize,
        /// Number of columns in the row.
        found: usize,
    },

    /// A column value could not be read from the row.
    #[error("failed to scan column {column}: {source}")]
    Scan {
        /// Zero-based column index.
        column: usize,
        source: rusqlite::Error,
    },

    /// Advancing the result cursor failed.
    #[error("cursor failed: {0}")]
    Cursor(#[source] rusqlite::Error),
}

impl MapError {
    /// Short name of the failure cause, for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MapError::Query(_) => "query",
            MapError::ColumnCount { .. } => "column_count",
            MapError::Scan { .. } => "scan",
            MapError::Cursor(_) => "cursor",
        }
    }
}

/// Decodes a single row into a new `T`.
///
/// Fields whose raw value does not convert are left at their default value
/// (see the module docs).
///
/// # Errors
///
/// Returns [`MapError::ColumnCount`] if the row does not have exactly one
/// column per field, or [`MapError::Scan`] if a column cannot be read.
pub fn decode_row<T, R>(row: &R) -> Result<T, MapError>
where
    T: Record,
    R: RowSource + ?Sized,
{
    let fields = T::FIELDS;
    let found = row.column_count();
    if found != fields.len() {
        return Err(MapError::ColumnCount {
            expected: fields.len(),
            found,
        });
    }

    let mut scratch = Vec::with_capacity(fields.len());
    for column in 0..fields.len() {
        let value = row
            .raw_value(column)
            .map_err(|source| MapError::Scan { column, source })?;
        scratch.push(value);
    }

    let mut record = T::default();
    for (field, value) in fields.iter().zip(scratch) {
        let raw_type = value.data_type();
        if !field.setter.apply(&mut record, value) {
            tracing::debug!(
                field = field.name,
                declared = field.setter.type_name(),
                raw = %raw_type,
                "column value not convertible, leaving field at default"
            );
        }
    }

    Ok(record)
}

/// Runs `sql` and decodes its first row, if any.
///
/// Rows after the first are ignored.
///
/// # Errors
///
/// Returns [`MapError::Query`] if the statement cannot be prepared or bound,
/// [`MapError::Cursor`] if stepping to the first row fails, and the errors of
/// [`decode_row`] otherwise.
pub fn fetch_one<T, P>(conn: &Connection, sql: &str, params: P) -> Result<Option<T>, MapError>
where
    T: Record,
    P: Params,
{
    let mut stmt = conn.prepare(sql).map_err(MapError::Query)?;
    let mut rows = stmt.query(params).map_err(MapError::Query)?;

    let first = rows.next().map_err(MapError::Cursor)?;
    match first {
        Some(row) => decode_row(row).map(Some),
        None => Ok(None),
    }
}

/// Runs `sql` and decodes every row, in the order the cursor yields them.
///
/// A query matching nothing yields an empty `Vec`.
///
/// # Errors
///
/// Returns [`MapError::Query`] if the statement cannot be prepared or bound,
/// [`MapError::Cursor`] if advancing the cursor fails at any point, and the
/// errors of [`decode_row`] for the first row that fails to decode. No
/// partial result is returned.
pub fn fetch_many<T, P>(conn: &Connection, sql: &str, params: P) -> Result<Vec<T>, MapError>
where
    T: Record,
    P: Params,
{
    let mut stmt = conn.prepare(sql).map_err(MapError::Query)?;
    let mut rows = stmt.query(params).map_err(MapError::Query)?;

    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(MapError::Cursor)? {
        records.push(decode_row(row)?);
    }
    Ok(records)
}
