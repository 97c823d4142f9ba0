//! Authored revisions and the store that holds them.
//!
//! A [`Revision`] is an immutable unit of schema change with a forward and a reverse
//! [`Operation`]. Revisions name their predecessor, so the [`RevisionStore`] holds a chain
//! rooted at the [`Marker::Root`] sentinel. The store does no I/O beyond parsing authored
//! records; ordering lives in [`crate::chain`].

mod marker;
mod operation;
mod revision;
mod store;

pub use marker::Marker;
pub use operation::{ColumnDef, DefaultPolicy, Operation};
pub use revision::Revision;
pub use store::RevisionStore;
