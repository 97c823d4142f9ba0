use crate::common::is_reserved_name;
use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt::{Display, Formatter};

/// Kind of a structure listed in the engine catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureKind {
    Table,
    View,
    Index,
    Trigger,
}

impl StructureKind {
    fn from_catalog(kind: &str) -> SchemaResult<Self> {
        match kind {
            "table" => Ok(StructureKind::Table),
            "view" => Ok(StructureKind::View),
            "index" => Ok(StructureKind::Index),
            "trigger" => Ok(StructureKind::Trigger),
            other => Err(SchemaError::new(
                &format!("Unknown catalog entry type {}", other),
                ErrorKind::BackendError,
            )),
        }
    }

    fn as_catalog(&self) -> &'static str {
        match self {
            StructureKind::Table => "table",
            StructureKind::View => "view",
            StructureKind::Index => "index",
            StructureKind::Trigger => "trigger",
        }
    }
}

impl Display for StructureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_catalog())
    }
}

/// A structure discovered in the live catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structure {
    pub name: String,
    pub kind: StructureKind,
    /// Table the structure belongs to; equals `name` for tables and views.
    pub table: String,
}

/// A column as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub primary_key: bool,
}

pub(crate) fn structure_exists(
    conn: &Connection,
    name: &str,
    kind: StructureKind,
) -> SchemaResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2 COLLATE NOCASE",
            params![kind.as_catalog(), name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> SchemaResult<bool> {
    structure_exists(conn, table, StructureKind::Table)
}

pub(crate) fn index_exists(conn: &Connection, index: &str) -> SchemaResult<bool> {
    structure_exists(conn, index, StructureKind::Index)
}

pub(crate) fn table_columns(conn: &Connection, table: &str) -> SchemaResult<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    let rows = stmt.query_map(params![table], |row| {
        Ok(ColumnInfo {
            name: row.get(0)?,
            sql_type: row.get(1)?,
            nullable: row.get::<_, i64>(2)? == 0,
            default: row.get(3)?,
            primary_key: row.get::<_, i64>(4)? > 0,
        })
    })?;

    let mut columns = Vec::new();
    for column in rows {
        columns.push(column?);
    }
    Ok(columns)
}

pub(crate) fn column_exists(conn: &Connection, table: &str, column: &str) -> SchemaResult<bool> {
    Ok(table_columns(conn, table)?
        .iter()
        .any(|c| c.name.eq_ignore_ascii_case(column)))
}

/// Lists user structures, optionally filtered by a `LIKE` pattern, ordered by name.
pub(crate) fn list_structures(
    conn: &Connection,
    pattern: Option<&str>,
) -> SchemaResult<Vec<Structure>> {
    let mut stmt = conn.prepare(
        "SELECT name, type, tbl_name FROM sqlite_master \
         WHERE (?1 IS NULL OR name LIKE ?1) \
         ORDER BY name, type",
    )?;
    let rows = stmt.query_map(params![pattern], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut structures = Vec::new();
    for row in rows {
        let (name, kind, table) = row?;
        if is_reserved_name(&name) {
            continue;
        }
        structures.push(Structure {
            name,
            kind: StructureKind::from_catalog(&kind)?,
            table,
        });
    }
    Ok(structures)
}
