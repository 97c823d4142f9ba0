//! Read-only reporting on the live catalog.
//!
//! The inspector never consults the revision store or the applied-state marker. Comparing
//! its output with what the marker implies is how drift is detected.

mod catalog;

pub use catalog::{ColumnInfo, Structure, StructureKind};
pub(crate) use catalog::{column_exists, index_exists, table_columns, table_exists};

use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use rusqlite::Connection;

/// Lists structures present in a target database.
///
/// Engine-internal (`sqlite_*`) and migration bookkeeping (`_schemachain_*`) structures are
/// never reported. Results are ordered lexicographically by name.
pub struct Inspector<'a> {
    conn: &'a Connection,
}

impl<'a> Inspector<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Inspector { conn }
    }

    /// Lists structures whose name matches a SQL `LIKE` pattern (`%` and `_` wildcards,
    /// ASCII case-insensitive).
    pub fn list_structures(&self, pattern: &str) -> SchemaResult<Vec<Structure>> {
        catalog::list_structures(self.conn, Some(pattern))
    }

    /// Lists every user structure.
    pub fn list_all(&self) -> SchemaResult<Vec<Structure>> {
        catalog::list_structures(self.conn, None)
    }

    /// Describes the columns of a table.
    pub fn describe_table(&self, table: &str) -> SchemaResult<Vec<ColumnInfo>> {
        if !table_exists(self.conn, table)? {
            return Err(SchemaError::new(
                &format!("Table {} not found", table),
                ErrorKind::NotFound,
            ));
        }
        table_columns(self.conn, table)
    }
}
