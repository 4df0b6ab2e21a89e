//! PostgreSQL implementation of the allocation engine's storage traits.
//!
//! Occupancy is never cached: it is the number of `selections` rows
//! referencing a subject, counted while that subject's row is locked.

pub mod catalog;
pub mod store;

pub use catalog::PgCatalog;
pub use store::{PgAllocationStore, PgUnitOfWork};
