use super::Revision;
use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

/// Append-only set of authored revisions.
///
/// Registration enforces that ids are unique and that every parent is already known, so a
/// store built through [`RevisionStore::register`] never contains a dangling link. Branches
/// are accepted here and rejected by [`crate::chain::ChainResolver`].
#[derive(Clone, Default)]
pub struct RevisionStore {
    revisions: IndexMap<String, Arc<Revision>>,
}

impl RevisionStore {
    pub fn new() -> Self {
        RevisionStore {
            revisions: IndexMap::new(),
        }
    }

    /// Registers a single revision whose parent is already present.
    ///
    /// # Errors
    ///
    /// - `DuplicateId` if the id is taken
    /// - `UnknownParent` if the parent is not registered
    /// - `ValidationError` / `BrokenChain` if the revision itself is malformed
    ///
    /// The store is unchanged on error.
    pub fn register(&mut self, revision: Revision) -> SchemaResult<()> {
        revision.validate()?;

        if self.revisions.contains_key(revision.id()) {
            log::error!("Revision {} is already registered", revision.id());
            return Err(SchemaError::new(
                &format!("Revision {} is already registered", revision.id()),
                ErrorKind::DuplicateId,
            ));
        }

        if let Some(parent) = revision.parent_id() {
            if !self.revisions.contains_key(parent) {
                log::error!(
                    "Revision {} names unknown parent {}",
                    revision.id(),
                    parent
                );
                return Err(SchemaError::new(
                    &format!(
                        "Revision {} names unknown parent {}",
                        revision.id(),
                        parent
                    ),
                    ErrorKind::UnknownParent,
                ));
            }
        }

        self.revisions
            .insert(revision.id().to_string(), Arc::new(revision));
        Ok(())
    }

    /// Registers revisions supplied in any order.
    ///
    /// Each pass registers every pending revision whose parent is known. When a pass makes no
    /// progress the remaining revisions cannot be attached and the first one's error is
    /// returned. Either all revisions are registered or none are.
    pub fn register_all<I>(&mut self, revisions: I) -> SchemaResult<()>
    where
        I: IntoIterator<Item = Revision>,
    {
        let mut staged = self.clone();
        let mut pending: Vec<Revision> = revisions.into_iter().collect();

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();

            for revision in pending {
                let parent_known = revision
                    .parent_id()
                    .map_or(true, |parent| staged.contains(parent));
                if parent_known {
                    staged.register(revision)?;
                } else {
                    deferred.push(revision);
                }
            }

            if deferred.len() == before {
                // no progress: every remaining parent is missing
                let first = deferred.remove(0);
                return staged.register(first);
            }
            pending = deferred;
        }

        *self = staged;
        Ok(())
    }

    /// Parses a JSON array of revision records and registers them.
    pub fn load_json(&mut self, json: &str) -> SchemaResult<()> {
        let revisions: Vec<Revision> = serde_json::from_str(json)?;
        self.register_all(revisions)
    }

    /// Reads a JSON revision file and registers its records.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> SchemaResult<()> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SchemaError::new_with_cause(
                &format!("Failed to read revision file {}", path.display()),
                ErrorKind::IOError,
                e.into(),
            )
        })?;
        self.load_json(&json)
    }

    /// Serializes all revisions in registration order.
    pub fn to_json(&self) -> SchemaResult<String> {
        let revisions: Vec<&Revision> = self.revisions.values().map(|r| r.as_ref()).collect();
        Ok(serde_json::to_string_pretty(&revisions)?)
    }

    /// Returns all revisions in registration order.
    pub fn all(&self) -> Vec<Arc<Revision>> {
        self.revisions.values().cloned().collect()
    }

    pub fn by_id(&self, id: &str) -> SchemaResult<Arc<Revision>> {
        self.revisions.get(id).cloned().ok_or_else(|| {
            SchemaError::new(&format!("Revision {} not found", id), ErrorKind::NotFound)
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.revisions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}
