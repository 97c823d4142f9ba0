use crate::config::MigrationConfig;
use crate::errors::{SchemaError, SchemaResult};
use crate::revision::{DefaultPolicy, Revision, RevisionStore};
use crate::schema_chain::SchemaChain;
use std::path::Path;
use std::time::Duration;

/// Builder for a [`SchemaChain`] handle.
///
/// Configuration and revision registration errors are captured as they happen; the first
/// one is returned by [`SchemaChainBuilder::open`] and later calls become no-ops.
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
/// let report = chain.upgrade(None)?;
/// ```
#[derive(Default)]
pub struct SchemaChainBuilder {
    error: Option<SchemaError>,
    config: MigrationConfig,
    store: RevisionStore,
}

impl SchemaChainBuilder {
    /// Starts from an in-memory database and an empty revision store.
    pub fn new() -> Self {
        SchemaChainBuilder {
            error: None,
            config: MigrationConfig::new(),
            store: RevisionStore::new(),
        }
    }

    pub fn db_path<P: AsRef<Path>>(self, path: P) -> Self {
        self.apply(|b| b.config.set_db_path(path))
    }

    pub fn in_memory(self) -> Self {
        self.apply(|b| b.config.set_in_memory())
    }

    /// With `false`, opening a database file that does not exist fails with `BackendError`
    /// instead of creating an empty one.
    pub fn create_if_missing(self, create: bool) -> Self {
        self.apply(|b| b.config.set_create_if_missing(create))
    }

    pub fn lock_timeout(self, timeout: Duration) -> Self {
        self.apply(|b| b.config.set_lock_timeout(timeout))
    }

    pub fn lock_poll_interval(self, interval: Duration) -> Self {
        self.apply(|b| b.config.set_lock_poll_interval(interval))
    }

    pub fn default_policy(self, policy: DefaultPolicy) -> Self {
        self.apply(|b| b.config.set_default_policy(policy))
    }

    /// Registers one revision; its parent must already be registered.
    pub fn add_revision(self, revision: Revision) -> Self {
        self.apply(|b| b.store.register(revision))
    }

    /// Registers revisions given in any order.
    pub fn add_revisions<I>(self, revisions: I) -> Self
    where
        I: IntoIterator<Item = Revision>,
    {
        self.apply(|b| b.store.register_all(revisions))
    }

    /// Registers revisions from a JSON array.
    pub fn revisions_json(self, json: &str) -> Self {
        self.apply(|b| b.store.load_json(json))
    }

    /// Registers revisions from a JSON file.
    pub fn revisions_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.apply(|b| b.store.load_file(path))
    }

    /// Opens the database, creating the file when missing.
    ///
    /// # Errors
    ///
    /// The first error captured while building, or the error opening the database.
    pub fn open(self) -> SchemaResult<SchemaChain> {
        if let Some(error) = self.error {
            return Err(error);
        }
        SchemaChain::open(self.config, self.store)
    }

    fn apply<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut Self) -> SchemaResult<()>,
    {
        if self.error.is_none() {
            if let Err(e) = f(&mut self) {
                self.error = Some(e);
            }
        }
        self
    }
}
