//! Configuration for a [`SchemaChain`](crate::SchemaChain) handle.

use crate::common::{DEFAULT_LOCK_POLL_MS, DEFAULT_LOCK_TIMEOUT_MS};
use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use crate::revision::DefaultPolicy;
use parking_lot::RwLock;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Where the target database lives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DatabaseLocation {
    /// A private in-memory database, discarded when the handle closes.
    #[default]
    InMemory,
    File(PathBuf),
}

impl Display for DatabaseLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseLocation::InMemory => write!(f, ":memory:"),
            DatabaseLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Settings shared by every run of a handle.
///
/// Cloning is cheap; clones observe the same settings. Setters fail once the handle built
/// from this configuration is open.
#[derive(Clone)]
pub struct MigrationConfig {
    inner: Arc<MigrationConfigInner>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationConfig {
    pub fn new() -> Self {
        MigrationConfig {
            inner: Arc::new(MigrationConfigInner::new()),
        }
    }

    pub fn location(&self) -> DatabaseLocation {
        self.inner.location.read().clone()
    }

    /// Targets a database file, created on open when missing unless
    /// [`set_create_if_missing`](Self::set_create_if_missing) turns that off.
    ///
    /// # Errors
    ///
    /// Returns error if already initialized or if the path is empty.
    pub fn set_db_path<P: AsRef<Path>>(&self, path: P) -> SchemaResult<()> {
        self.inner.ensure_mutable("Database location")?;
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            log::error!("Database path cannot be empty");
            return Err(SchemaError::new(
                "Database path cannot be empty",
                ErrorKind::ValidationError,
            ));
        }
        *self.inner.location.write() = DatabaseLocation::File(path.to_path_buf());
        Ok(())
    }

    /// Whether opening a missing database file creates it. Defaults to `true`.
    pub fn create_if_missing(&self) -> bool {
        self.inner.create_if_missing.load(Ordering::Relaxed)
    }

    pub fn set_create_if_missing(&self, create: bool) -> SchemaResult<()> {
        self.inner.ensure_mutable("Create-if-missing")?;
        self.inner.create_if_missing.store(create, Ordering::Relaxed);
        Ok(())
    }

    pub fn set_in_memory(&self) -> SchemaResult<()> {
        self.inner.ensure_mutable("Database location")?;
        *self.inner.location.write() = DatabaseLocation::InMemory;
        Ok(())
    }

    /// How long a run waits for the migration lock before failing with `LockTimeout`.
    pub fn lock_timeout(&self) -> Duration {
        *self.inner.lock_timeout.read()
    }

    pub fn set_lock_timeout(&self, timeout: Duration) -> SchemaResult<()> {
        self.inner.ensure_mutable("Lock timeout")?;
        *self.inner.lock_timeout.write() = timeout;
        Ok(())
    }

    pub fn lock_poll_interval(&self) -> Duration {
        *self.inner.lock_poll_interval.read()
    }

    /// # Errors
    ///
    /// Returns error if already initialized or if the interval is zero.
    pub fn set_lock_poll_interval(&self, interval: Duration) -> SchemaResult<()> {
        self.inner.ensure_mutable("Lock poll interval")?;
        if interval.is_zero() {
            log::error!("Lock poll interval must be positive");
            return Err(SchemaError::new(
                "Lock poll interval must be positive",
                ErrorKind::ValidationError,
            ));
        }
        *self.inner.lock_poll_interval.write() = interval;
        Ok(())
    }

    /// Policy for added columns whose operation does not name one.
    pub fn default_policy(&self) -> DefaultPolicy {
        *self.inner.default_policy.read()
    }

    pub fn set_default_policy(&self, policy: DefaultPolicy) -> SchemaResult<()> {
        self.inner.ensure_mutable("Default policy")?;
        *self.inner.default_policy.write() = policy;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.configured.load(Ordering::Relaxed)
    }

    /// Freezes the settings.
    pub(crate) fn initialize(&self) -> SchemaResult<()> {
        if self.inner.configured.swap(true, Ordering::Relaxed) {
            log::error!("Configuration is already initialized");
            return Err(SchemaError::new(
                "Configuration is already initialized",
                ErrorKind::InternalError,
            ));
        }
        Ok(())
    }
}

struct MigrationConfigInner {
    configured: AtomicBool,
    create_if_missing: AtomicBool,
    location: RwLock<DatabaseLocation>,
    lock_timeout: RwLock<Duration>,
    lock_poll_interval: RwLock<Duration>,
    default_policy: RwLock<DefaultPolicy>,
}

impl MigrationConfigInner {
    fn new() -> Self {
        MigrationConfigInner {
            configured: AtomicBool::new(false),
            create_if_missing: AtomicBool::new(true),
            location: RwLock::new(DatabaseLocation::InMemory),
            lock_timeout: RwLock::new(Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS)),
            lock_poll_interval: RwLock::new(Duration::from_millis(DEFAULT_LOCK_POLL_MS)),
            default_policy: RwLock::new(DefaultPolicy::default()),
        }
    }

    fn ensure_mutable(&self, what: &str) -> SchemaResult<()> {
        if self.configured.load(Ordering::Relaxed) {
            log::error!("{} cannot be changed after initialization", what);
            return Err(SchemaError::new(
                &format!("{} cannot be changed after initialization", what),
                ErrorKind::ValidationError,
            ));
        }
        Ok(())
    }
}
