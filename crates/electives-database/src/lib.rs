//! # electives-database
//!
//! PostgreSQL connection management, repositories for every Electives
//! entity, and the PostgreSQL implementation of the engine's `Catalog` and
//! `AllocationStore`.

pub mod allocation;
pub mod connection;
pub mod migration;
pub mod repositories;

pub use allocation::{PgAllocationStore, PgCatalog};
pub use connection::DatabasePool;
