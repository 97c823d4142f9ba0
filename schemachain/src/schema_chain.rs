use crate::chain::ChainResolver;
use crate::common::HEAD_MARKER;
use crate::config::{DatabaseLocation, MigrationConfig};
use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use crate::inspector::{ColumnInfo, Inspector, Structure};
use crate::migration::{HistoryEntry, MigrationLock, MigrationReport, MigrationRunner, StateTracker};
use crate::revision::{Marker, Revision, RevisionStore};
use crate::schema_chain_builder::SchemaChainBuilder;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use std::sync::Arc;

/// A revision of the chain together with its state in the target database.
#[derive(Debug, Clone)]
pub struct RevisionStatus {
    pub revision: Arc<Revision>,
    /// The database is at this revision or past it.
    pub applied: bool,
    /// The marker points at this revision.
    pub current: bool,
}

/// Handle tying a revision store to one target database.
///
/// Cloning is cheap and clones share the connection; calls are serialized on it. Runs
/// additionally serialize against other processes through the database-resident
/// [`MigrationLock`].
///
/// # Examples
///
/// ```rust,ignore
/// use schemachain::SchemaChain;
///
/// let chain = SchemaChain::builder()
///     .db_path("app.db")
///     .revisions_file("revisions.json")
///     .open()?;
///
/// let report = chain.upgrade(None)?;
/// println!("{}", report);
/// chain.downgrade("base")?.into_result()?;
/// ```
#[derive(Clone)]
pub struct SchemaChain {
    inner: Arc<SchemaChainInner>,
}

impl SchemaChain {
    pub fn builder() -> SchemaChainBuilder {
        SchemaChainBuilder::new()
    }

    pub(crate) fn open(config: MigrationConfig, store: RevisionStore) -> SchemaResult<Self> {
        config.initialize()?;
        let conn = open_connection(&config)?;
        log::debug!(
            "Opened {} with {} revision(s)",
            config.location(),
            store.len()
        );
        Ok(SchemaChain {
            inner: Arc::new(SchemaChainInner {
                config,
                store,
                conn: Mutex::new(conn),
            }),
        })
    }

    /// Upgrades to `target`, or to the head when `target` is `None` or `"head"`.
    pub fn upgrade(&self, target: Option<&str>) -> SchemaResult<MigrationReport> {
        let target = target
            .filter(|t| !t.eq_ignore_ascii_case(HEAD_MARKER))
            .map(Marker::parse);
        let conn = self.inner.conn.lock();
        MigrationRunner::new(&conn, &self.inner.store, &self.inner.config).upgrade(target.as_ref())
    }

    /// Downgrades to `target`; `"base"` reverses every revision.
    pub fn downgrade(&self, target: &str) -> SchemaResult<MigrationReport> {
        let target = if target.eq_ignore_ascii_case(HEAD_MARKER) {
            ChainResolver::new(&self.inner.store).head()?
        } else {
            Marker::parse(target)
        };
        let conn = self.inner.conn.lock();
        MigrationRunner::new(&conn, &self.inner.store, &self.inner.config).downgrade(&target)
    }

    /// The marker recorded in the database.
    pub fn current(&self) -> SchemaResult<Marker> {
        let conn = self.inner.conn.lock();
        StateTracker::current_marker(&conn)
    }

    /// The head of the authored chain.
    pub fn head(&self) -> SchemaResult<Marker> {
        ChainResolver::new(&self.inner.store).head()
    }

    /// Every revision, oldest first, flagged against the current marker.
    ///
    /// A marker that is not on the chain (a database migrated by newer revisions) leaves
    /// every revision unflagged.
    pub fn status(&self) -> SchemaResult<Vec<RevisionStatus>> {
        let order = ChainResolver::new(&self.inner.store).linear_order()?;
        let current = self.current()?;

        let applied_count = match &current {
            Marker::Root => 0,
            Marker::Revision(id) => match order.iter().position(|r| r.id() == id) {
                Some(index) => index + 1,
                None => {
                    log::warn!("Database marker {} is not on the authored chain", id);
                    0
                }
            },
        };

        Ok(order
            .into_iter()
            .enumerate()
            .map(|(index, revision)| RevisionStatus {
                current: index + 1 == applied_count,
                applied: index < applied_count,
                revision,
            })
            .collect())
    }

    /// Steps recorded in the database, oldest first.
    pub fn history(&self) -> SchemaResult<Vec<HistoryEntry>> {
        let conn = self.inner.conn.lock();
        StateTracker::history(&conn)
    }

    pub fn list_structures(&self, pattern: &str) -> SchemaResult<Vec<Structure>> {
        let conn = self.inner.conn.lock();
        Inspector::new(&conn).list_structures(pattern)
    }

    pub fn list_all(&self) -> SchemaResult<Vec<Structure>> {
        let conn = self.inner.conn.lock();
        Inspector::new(&conn).list_all()
    }

    pub fn describe_table(&self, table: &str) -> SchemaResult<Vec<ColumnInfo>> {
        let conn = self.inner.conn.lock();
        Inspector::new(&conn).describe_table(table)
    }

    /// Clears a lock left by a crashed run. Returns whether a lock was held.
    pub fn force_unlock(&self) -> SchemaResult<bool> {
        let conn = self.inner.conn.lock();
        let released = MigrationLock::force_release(&conn)?;
        if released {
            log::warn!("Force-released migration lock on {}", self.inner.config.location());
        }
        Ok(released)
    }

    /// Runs `f` against the underlying connection while holding it.
    pub fn with_connection<R, F>(&self, f: F) -> SchemaResult<R>
    where
        F: FnOnce(&Connection) -> SchemaResult<R>,
    {
        let conn = self.inner.conn.lock();
        f(&conn)
    }

    pub fn store(&self) -> &RevisionStore {
        &self.inner.store
    }

    pub fn config(&self) -> MigrationConfig {
        self.inner.config.clone()
    }
}

struct SchemaChainInner {
    config: MigrationConfig,
    store: RevisionStore,
    conn: Mutex<Connection>,
}

fn open_connection(config: &MigrationConfig) -> SchemaResult<Connection> {
    let location = config.location();
    let opened = match &location {
        DatabaseLocation::InMemory => Connection::open_in_memory(),
        DatabaseLocation::File(path) if config.create_if_missing() => Connection::open(path),
        DatabaseLocation::File(path) => Connection::open_with_flags(
            path,
            OpenFlags::default().difference(OpenFlags::SQLITE_OPEN_CREATE),
        ),
    };
    let conn = opened.map_err(|e| {
        log::error!("Failed to open database {}: {}", location, e);
        SchemaError::new_with_cause(
            &format!("Failed to open database {}", location),
            ErrorKind::BackendError,
            e.into(),
        )
    })?;
    // the lock loop does its own waiting
    conn.busy_timeout(config.lock_poll_interval())?;
    Ok(conn)
}
