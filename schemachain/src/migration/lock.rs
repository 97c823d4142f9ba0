use crate::common::{LOCK_NAME, LOCK_TABLE};
use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::thread;
use std::time::{Duration, Instant};

/// Database-resident advisory lock serializing migration runs.
///
/// The lock is a row keyed by a fixed name in a bookkeeping table, so every process that
/// migrates the same database contends on it. It is released when the guard drops. A crashed
/// process leaves its row behind; [`MigrationLock::force_release`] clears it.
pub struct MigrationLock<'a> {
    conn: &'a Connection,
    owner: String,
}

impl<'a> MigrationLock<'a> {
    /// Polls for the lock until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// `LockTimeout` when another run holds the lock for the whole wait.
    pub fn acquire(
        conn: &'a Connection,
        timeout: Duration,
        poll_interval: Duration,
    ) -> SchemaResult<MigrationLock<'a>> {
        let owner = uuid::Uuid::new_v4().to_string();
        let deadline = Instant::now() + timeout;
        let mut warned = false;

        loop {
            match try_insert(conn, &owner) {
                Ok(true) => {
                    log::debug!("Acquired migration lock as {}", owner);
                    return Ok(MigrationLock { conn, owner });
                }
                Ok(false) => {}
                Err(e) if is_busy(&e) => {}
                Err(e) => return Err(e.into()),
            }

            if !warned {
                let holder = holder(conn).ok().flatten();
                log::warn!(
                    "Migration lock is held by {}; waiting up to {:?}",
                    holder.as_deref().unwrap_or("another run"),
                    timeout
                );
                warned = true;
            }

            let now = Instant::now();
            if now >= deadline {
                log::error!("Timed out waiting for migration lock after {:?}", timeout);
                return Err(SchemaError::new(
                    &format!(
                        "Could not acquire migration lock {} within {:?}",
                        LOCK_NAME, timeout
                    ),
                    ErrorKind::LockTimeout,
                ));
            }
            thread::sleep(poll_interval.min(deadline - now));
        }
    }

    /// Removes the lock row regardless of owner. Returns whether a lock was held.
    pub fn force_release(conn: &Connection) -> SchemaResult<bool> {
        ensure_table(conn)?;
        let removed = conn.execute(
            &format!("DELETE FROM {} WHERE name = ?1", LOCK_TABLE),
            params![LOCK_NAME],
        )?;
        Ok(removed > 0)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl Drop for MigrationLock<'_> {
    fn drop(&mut self) {
        let released = self.conn.execute(
            &format!("DELETE FROM {} WHERE name = ?1 AND owner = ?2", LOCK_TABLE),
            params![LOCK_NAME, self.owner],
        );
        if let Err(e) = released {
            log::warn!("Failed to release migration lock {}: {}", self.owner, e);
        }
    }
}

fn ensure_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            name TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            acquired_at TEXT NOT NULL
         )",
        LOCK_TABLE
    ))
}

fn try_insert(conn: &Connection, owner: &str) -> rusqlite::Result<bool> {
    ensure_table(conn)?;
    let inserted = conn.execute(
        &format!(
            "INSERT OR IGNORE INTO {} (name, owner, acquired_at) VALUES (?1, ?2, ?3)",
            LOCK_TABLE
        ),
        params![LOCK_NAME, owner, Utc::now().to_rfc3339()],
    )?;
    Ok(inserted == 1)
}

fn holder(conn: &Connection) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        &format!("SELECT owner FROM {} WHERE name = ?1", LOCK_TABLE),
        params![LOCK_NAME],
        |row| row.get(0),
    )
    .optional()
}

fn is_busy(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::DatabaseBusy || e.code == ErrorCode::DatabaseLocked
    )
}
