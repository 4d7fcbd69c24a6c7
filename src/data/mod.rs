//! Data layer module
//!
//! Holds the in-process social graph:
//! - Models (users, channels, DMs, messages, statistics)
//! - The `Graph` aggregate root and its membership link helpers
//! - The provenance log notifications are rendered from
//! - The lock-guarded `Store` handle shared by every service

mod graph;
mod models;
mod provenance;
mod store;

pub use graph::Graph;
pub use models::*;
pub use provenance::{DEFAULT_RETENTION, ProvenanceEvent, ProvenanceKind, ProvenanceLog};
pub use store::Store;

#[cfg(test)]
pub(crate) use graph::tests::bare_user;
