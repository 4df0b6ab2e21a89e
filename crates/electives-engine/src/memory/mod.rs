//! In-memory backend for single-node deployments and tests.
//!
//! The catalog lives in concurrent maps; selections and occupancy share one
//! Tokio mutex so a unit of work observes and publishes them together.

pub mod catalog;
pub mod store;

pub use catalog::MemoryCatalog;
pub use store::MemoryAllocationStore;
