//! # SchemaChain - Revision-chain schema migrations for SQLite
//!
//! SchemaChain evolves the structure of a live SQLite database through authored, immutable
//! revisions. Each revision names its predecessor, carries a forward and a reverse
//! operation, and is applied in its own transaction together with the applied-state
//! marker stored in the database itself.
//!
//! ## Key Features
//!
//! - **Linear chain**: revisions are ordered by their parent links; branches and orphans are
//!   rejected before anything runs
//! - **Both directions**: upgrade to the head or any revision, downgrade to any revision or
//!   to `base`
//! - **Atomic steps**: DDL, marker and history row commit or roll back together
//! - **Drift tolerance**: a step whose structural precondition already fails is skipped with
//!   a warning and the marker still advances
//! - **Inspection**: list tables, views, indexes and triggers by `LIKE` pattern
//! - **Advisory lock**: concurrent runs against the same database wait, then time out
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use schemachain::revision::{ColumnDef, Operation, Revision};
//! use schemachain::SchemaChain;
//!
//! let chain = SchemaChain::builder()
//!     .db_path("app.db")
//!     .add_revision(Revision::reversible(
//!         "a1f3",
//!         None,
//!         Operation::add_column(
//!             "agents",
//!             ColumnDef::new("is_verified", "BOOLEAN").not_null().default_value(false),
//!         ),
//!     )?)
//!     .open()?;
//!
//! let report = chain.upgrade(None)?;
//! println!("{}", report);
//! ```
//!
//! ## Module Organization
//!
//! - [`revision`] - Revisions, operations, markers and the revision store
//! - [`chain`] - Chain linearization and path resolution
//! - [`migration`] - Runner, state tracking, locking and reports
//! - [`inspector`] - Read-only catalog reporting
//! - [`config`] - Handle configuration
//! - [`errors`] - Error types and result definitions

pub mod chain;
pub mod common;
pub mod config;
pub mod errors;
pub mod inspector;
pub mod migration;
pub mod revision;
pub mod schema_chain;
pub mod schema_chain_builder;

pub use errors::{ErrorKind, SchemaError, SchemaResult};
pub use schema_chain::{RevisionStatus, SchemaChain};
pub use schema_chain_builder::SchemaChainBuilder;

#[cfg(test)]
#[ctor::ctor]
fn init() {
    colog::init();
}
