//! # electives-engine
//!
//! The enrollment allocation engine. Decides whether a student may select a
//! subject of an elective and applies the change atomically so that no
//! subject exceeds its capacity and no student holds two selections in the
//! same elective.
//!
//! Components, leaf-first:
//! - [`window`]: open/closed state of an elective's enrollment window.
//! - [`eligibility`]: team-based eligibility rule.
//! - [`store`]: capacity ledger, selection store, and unit-of-work traits
//!   implemented by the storage backends.
//! - [`memory`]: single-node in-memory backend.
//! - [`coordinator`]: the `select` / `deselect` state machine.
//! - [`browse`]: what a student sees when choosing.
//! - [`reconciler`]: occupancy recount after a crash or on demand.
//!
//! Services follow constructor injection: all dependencies are provided at
//! construction time via `Arc` references.

pub mod browse;
pub mod context;
pub mod coordinator;
pub mod eligibility;
pub mod error;
pub mod memory;
pub mod reconciler;
pub mod store;
pub mod window;

pub use browse::{CatalogService, ElectiveOverview, SubjectAvailability};
pub use context::StudentContext;
pub use coordinator::{AllocationCoordinator, DeselectOutcome, SelectOutcome};
pub use eligibility::{Eligibility, IneligibilityReason};
pub use error::AllocationError;
pub use memory::{MemoryAllocationStore, MemoryCatalog};
pub use reconciler::OccupancyReconciler;
pub use store::{
    AllocationStore, CapacityLedger, Catalog, ReconcileReport, Reservation, SelectionStore,
    UnitOfWork,
};
pub use window::WindowState;
