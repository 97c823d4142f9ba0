use super::report::StepOutcome;
use crate::chain::{Direction, MigrationStep};
use crate::common::{HISTORY_TABLE, STATE_ROW_ID, STATE_TABLE};
use crate::errors::SchemaResult;
use crate::inspector::table_exists;
use crate::revision::{Marker, Revision};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

/// One committed step as recorded in the history table.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub revision_id: String,
    pub direction: Direction,
    pub skipped: bool,
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Persists the applied-state marker inside the target database.
///
/// Writes take a [`Transaction`] so the marker always moves together with the step that
/// justifies it; the tracker never commits on its own.
pub struct StateTracker;

impl StateTracker {
    /// Reads the marker. A database without the state table is at the root.
    pub fn current_marker(conn: &Connection) -> SchemaResult<Marker> {
        if !table_exists(conn, STATE_TABLE)? {
            return Ok(Marker::Root);
        }

        let marker: Option<Option<String>> = conn
            .query_row(
                &format!("SELECT marker FROM {} WHERE id = ?1", STATE_TABLE),
                params![STATE_ROW_ID],
                |row| row.get(0),
            )
            .optional()?;
        Ok(Marker::from_column(marker.flatten()))
    }

    /// Moves the marker to `revision` after its forward operation.
    pub fn advance(tx: &Transaction, revision: &Revision) -> SchemaResult<()> {
        Self::write(tx, &revision.marker())
    }

    /// Moves the marker to the parent of `revision` after its reverse operation.
    pub fn retreat(tx: &Transaction, revision: &Revision) -> SchemaResult<()> {
        Self::write(tx, &revision.parent())
    }

    /// Appends a committed step to the history table.
    pub(crate) fn record(
        tx: &Transaction,
        step: &MigrationStep,
        outcome: &StepOutcome,
    ) -> SchemaResult<()> {
        Self::ensure(tx)?;
        let (skipped, detail) = match outcome {
            StepOutcome::Skipped { reason } => (true, Some(reason.as_str())),
            _ => (false, None),
        };
        tx.execute(
            &format!(
                "INSERT INTO {} (revision_id, direction, skipped, detail, recorded_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                HISTORY_TABLE
            ),
            params![
                step.revision.id(),
                direction_name(step.direction),
                skipped,
                detail,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Lists recorded steps, oldest first. Empty when nothing was ever applied.
    pub fn history(conn: &Connection) -> SchemaResult<Vec<HistoryEntry>> {
        if !table_exists(conn, HISTORY_TABLE)? {
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT revision_id, direction, skipped, detail, recorded_at FROM {} ORDER BY seq",
            HISTORY_TABLE
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (revision_id, direction, skipped, detail, recorded_at) = row?;
            entries.push(HistoryEntry {
                revision_id,
                direction: if direction == direction_name(Direction::Reverse) {
                    Direction::Reverse
                } else {
                    Direction::Forward
                },
                skipped,
                detail,
                recorded_at: DateTime::parse_from_rfc3339(&recorded_at)?.with_timezone(&Utc),
            });
        }
        Ok(entries)
    }

    /// Creates the bookkeeping tables when absent.
    pub(crate) fn ensure(conn: &Connection) -> SchemaResult<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {state} (
                id INTEGER PRIMARY KEY CHECK (id = {row}),
                marker TEXT,
                updated_at TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS {history} (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                revision_id TEXT NOT NULL,
                direction TEXT NOT NULL,
                skipped INTEGER NOT NULL,
                detail TEXT,
                recorded_at TEXT NOT NULL
             );",
            state = STATE_TABLE,
            history = HISTORY_TABLE,
            row = STATE_ROW_ID,
        ))?;
        Ok(())
    }

    fn write(tx: &Transaction, marker: &Marker) -> SchemaResult<()> {
        Self::ensure(tx)?;
        tx.execute(
            &format!(
                "INSERT INTO {} (id, marker, updated_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(id) DO UPDATE SET marker = excluded.marker, \
                 updated_at = excluded.updated_at",
                STATE_TABLE
            ),
            params![STATE_ROW_ID, marker.revision_id(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Forward => "forward",
        Direction::Reverse => "reverse",
    }
}
