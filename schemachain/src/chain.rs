//! Linearization of the revision graph and path resolution between markers.

use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use crate::revision::{Marker, Operation, Revision, RevisionStore};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Direction of travel along the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Toward the head, applying forward operations.
    Forward,
    /// Toward the root, applying reverse operations.
    Reverse,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Forward => write!(f, "upgrade"),
            Direction::Reverse => write!(f, "downgrade"),
        }
    }
}

/// One revision to execute in a given direction.
#[derive(Debug, Clone)]
pub struct MigrationStep {
    pub revision: Arc<Revision>,
    pub direction: Direction,
}

impl MigrationStep {
    /// The operation this step executes.
    pub fn operation(&self) -> &Operation {
        match self.direction {
            Direction::Forward => self.revision.forward(),
            Direction::Reverse => self.revision.reverse(),
        }
    }

    /// The marker recorded once this step commits.
    pub fn target_marker(&self) -> Marker {
        match self.direction {
            Direction::Forward => self.revision.marker(),
            Direction::Reverse => self.revision.parent(),
        }
    }
}

/// Walks a [`RevisionStore`] as a single linear chain.
pub struct ChainResolver<'a> {
    store: &'a RevisionStore,
}

impl<'a> ChainResolver<'a> {
    pub fn new(store: &'a RevisionStore) -> Self {
        ChainResolver { store }
    }

    /// Returns every revision ordered from oldest to newest.
    ///
    /// # Errors
    ///
    /// `BrokenChain` when two revisions share a parent, or when some revision cannot be
    /// reached from the root.
    pub fn linear_order(&self) -> SchemaResult<Vec<Arc<Revision>>> {
        let mut children: HashMap<Marker, Arc<Revision>> = HashMap::new();

        for revision in self.store.all() {
            let parent = revision.parent();
            if let Some(sibling) = children.get(&parent) {
                log::error!(
                    "Revisions {} and {} both follow {}",
                    sibling.id(),
                    revision.id(),
                    parent
                );
                return Err(SchemaError::new(
                    &format!(
                        "Branch detected: revisions {} and {} both follow {}",
                        sibling.id(),
                        revision.id(),
                        parent
                    ),
                    ErrorKind::BrokenChain,
                ));
            }
            children.insert(parent, revision);
        }

        let mut order = Vec::with_capacity(self.store.len());
        let mut cursor = Marker::Root;
        while let Some(next) = children.remove(&cursor) {
            cursor = next.marker();
            order.push(next);
        }

        if order.len() != self.store.len() {
            let mut orphans: Vec<&str> = children.values().map(|r| r.id()).collect();
            orphans.sort_unstable();
            return Err(SchemaError::new(
                &format!(
                    "Chain cannot be linearized; unreachable revisions: {}",
                    orphans.join(", ")
                ),
                ErrorKind::BrokenChain,
            ));
        }

        Ok(order)
    }

    /// The newest revision, or the root for an empty store.
    pub fn head(&self) -> SchemaResult<Marker> {
        Ok(self
            .linear_order()?
            .last()
            .map(|r| r.marker())
            .unwrap_or(Marker::Root))
    }

    /// Resolves the ordered steps that move the schema from `from` to `to`.
    ///
    /// The result is empty when the markers are equal, all-forward when `to` lies toward the
    /// head and all-reverse when it lies toward the root.
    ///
    /// # Errors
    ///
    /// `Unreachable` when either marker is not on the chain, plus any error of
    /// [`ChainResolver::linear_order`].
    pub fn path_to(&self, from: &Marker, to: &Marker) -> SchemaResult<Vec<MigrationStep>> {
        let order = self.linear_order()?;
        let from_pos = position(&order, from)?;
        let to_pos = position(&order, to)?;

        let path: Vec<MigrationStep> = if to_pos >= from_pos {
            order[from_pos..to_pos]
                .iter()
                .map(|revision| MigrationStep {
                    revision: revision.clone(),
                    direction: Direction::Forward,
                })
                .collect()
        } else {
            order[to_pos..from_pos]
                .iter()
                .rev()
                .map(|revision| MigrationStep {
                    revision: revision.clone(),
                    direction: Direction::Reverse,
                })
                .collect()
        };

        log::debug!("Resolved {} step(s) from {} to {}", path.len(), from, to);
        Ok(path)
    }
}

/// Number of revisions applied at `marker`: 0 for the root, index + 1 otherwise.
fn position(order: &[Arc<Revision>], marker: &Marker) -> SchemaResult<usize> {
    match marker {
        Marker::Root => Ok(0),
        Marker::Revision(id) => order
            .iter()
            .position(|r| r.id() == id)
            .map(|index| index + 1)
            .ok_or_else(|| {
                SchemaError::new(
                    &format!("Revision {} is not on the chain", id),
                    ErrorKind::Unreachable,
                )
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revision(id: &str, parent: Option<&str>) -> Revision {
        Revision::new(
            id,
            parent,
            Operation::sql(&format!("CREATE TABLE t_{} (id INTEGER)", id)),
            Operation::drop_table(&format!("t_{}", id)),
        )
    }

    fn linear_store(ids: &[&str]) -> SchemaResult<RevisionStore> {
        let mut store = RevisionStore::new();
        let mut parent: Option<&str> = None;
        for id in ids {
            store.register(revision(id, parent))?;
            parent = Some(id);
        }
        Ok(store)
    }

    fn ids(path: &[MigrationStep]) -> Vec<&str> {
        path.iter().map(|s| s.revision.id()).collect()
    }

    #[test]
    fn test_linear_order_follows_parent_links() -> SchemaResult<()> {
        let mut store = RevisionStore::new();
        store.register_all(vec![
            revision("c", Some("b")),
            revision("a", None),
            revision("b", Some("a")),
        ])?;

        let order = ChainResolver::new(&store).linear_order()?;
        let order_ids: Vec<&str> = order.iter().map(|r| r.id()).collect();
        assert_eq!(order_ids, vec!["a", "b", "c"]);
        Ok(())
    }

    #[test]
    fn test_adjacent_pairs_reproduce_parent_links() -> SchemaResult<()> {
        let store = linear_store(&["a1", "b2", "c3", "d4", "e5"])?;
        let order = ChainResolver::new(&store).linear_order()?;

        assert_eq!(order[0].parent_id(), None);
        for pair in order.windows(2) {
            assert_eq!(pair[1].parent_id(), Some(pair[0].id()));
        }
        assert_eq!(order.len(), store.len());
        Ok(())
    }

    #[test]
    fn test_empty_store() -> SchemaResult<()> {
        let store = RevisionStore::new();
        let resolver = ChainResolver::new(&store);
        assert!(resolver.linear_order()?.is_empty());
        assert_eq!(resolver.head()?, Marker::Root);
        assert!(resolver.path_to(&Marker::Root, &Marker::Root)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_branch_is_broken_chain() -> SchemaResult<()> {
        let mut store = linear_store(&["r1"])?;
        store.register(revision("r2a", Some("r1")))?;
        store.register(revision("r2b", Some("r1")))?;

        let err = ChainResolver::new(&store).linear_order().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::BrokenChain);
        Ok(())
    }

    #[test]
    fn test_two_roots_is_broken_chain() -> SchemaResult<()> {
        let mut store = linear_store(&["r1"])?;
        store.register(revision("other", None))?;

        let err = ChainResolver::new(&store).head().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::BrokenChain);
        Ok(())
    }

    #[test]
    fn test_head_is_newest() -> SchemaResult<()> {
        let store = linear_store(&["r1", "r2", "r3"])?;
        assert_eq!(
            ChainResolver::new(&store).head()?,
            Marker::Revision("r3".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_forward_path() -> SchemaResult<()> {
        let store = linear_store(&["r1", "r2", "r3"])?;
        let path = ChainResolver::new(&store).path_to(&Marker::Root, &"r3".into())?;

        assert_eq!(ids(&path), vec!["r1", "r2", "r3"]);
        assert!(path.iter().all(|s| s.direction == Direction::Forward));
        assert_eq!(path[2].target_marker(), Marker::Revision("r3".to_string()));
        Ok(())
    }

    #[test]
    fn test_partial_forward_path() -> SchemaResult<()> {
        let store = linear_store(&["r1", "r2", "r3", "r4"])?;
        let path = ChainResolver::new(&store).path_to(&"r2".into(), &"r4".into())?;
        assert_eq!(ids(&path), vec!["r3", "r4"]);
        Ok(())
    }

    #[test]
    fn test_reverse_path() -> SchemaResult<()> {
        let store = linear_store(&["r1", "r2", "r3"])?;
        let path = ChainResolver::new(&store).path_to(&"r3".into(), &"r1".into())?;

        assert_eq!(ids(&path), vec!["r3", "r2"]);
        assert!(path.iter().all(|s| s.direction == Direction::Reverse));
        assert_eq!(path[1].target_marker(), Marker::Revision("r1".to_string()));
        assert_eq!(path[0].operation(), &Operation::drop_table("t_r3"));
        Ok(())
    }

    #[test]
    fn test_reverse_path_to_root() -> SchemaResult<()> {
        let store = linear_store(&["r1", "r2"])?;
        let path = ChainResolver::new(&store).path_to(&"r2".into(), &Marker::Root)?;
        assert_eq!(ids(&path), vec!["r2", "r1"]);
        assert_eq!(path[1].target_marker(), Marker::Root);
        Ok(())
    }

    #[test]
    fn test_same_marker_is_empty_path() -> SchemaResult<()> {
        let store = linear_store(&["r1", "r2"])?;
        assert!(ChainResolver::new(&store)
            .path_to(&"r2".into(), &"r2".into())?
            .is_empty());
        Ok(())
    }

    #[test]
    fn test_unknown_marker_is_unreachable() -> SchemaResult<()> {
        let store = linear_store(&["r1", "r2"])?;
        let resolver = ChainResolver::new(&store);

        let err = resolver.path_to(&Marker::Root, &"r9".into()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Unreachable);
        let err = resolver.path_to(&"zz".into(), &"r1".into()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Unreachable);
        Ok(())
    }
}
