//! Storage traits consumed by the allocation coordinator.
//!
//! A backend provides two things:
//! - a read-only [`Catalog`] of teams, students, electives, and subjects;
//! - an [`AllocationStore`] that opens [`UnitOfWork`]s. A unit of work is
//!   bound to one (student, elective) pair, holds the lock serializing that
//!   pair, and exposes the [`CapacityLedger`] and [`SelectionStore`]
//!   operations. Nothing it does is visible to other callers before
//!   [`UnitOfWork::commit`]; dropping it uncommitted rolls it back.

pub mod ledger;
pub mod selection;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use electives_core::result::AppResult;
use electives_core::types::{ElectiveId, SelectionKey, StudentId, SubjectId, TeamId};
use electives_entity::{Elective, Selection, Subject, SubjectOccupancy};

pub use ledger::{CapacityLedger, Reservation};
pub use selection::SelectionStore;

/// An all-or-nothing group of ledger and selection operations.
#[async_trait]
pub trait UnitOfWork: CapacityLedger + SelectionStore {
    /// Make every operation of this unit visible atomically.
    async fn commit(&mut self) -> AppResult<()>;

    /// Discard every operation of this unit.
    async fn rollback(&mut self) -> AppResult<()>;
}

/// Transactional access to selections and occupancy.
#[async_trait]
pub trait AllocationStore: Send + Sync + std::fmt::Debug {
    /// Open a unit of work for `key`, waiting for any other unit on the same
    /// pair to finish.
    async fn begin(&self, key: SelectionKey) -> AppResult<Box<dyn UnitOfWork>>;

    /// The committed selection of `key`.
    async fn current_selection(&self, key: SelectionKey) -> AppResult<Option<SubjectId>>;

    /// Committed occupancy of `subject_id`.
    async fn occupancy(&self, subject_id: SubjectId) -> AppResult<u32>;

    /// All committed selections of a student.
    async fn selections_for_student(&self, student_id: StudentId) -> AppResult<Vec<Selection>>;

    /// Recount occupancy from selections and repair any cached counter.
    async fn reconcile(&self) -> AppResult<ReconcileReport>;
}

/// Read-only lookups of the records an allocation decision depends on.
#[async_trait]
pub trait Catalog: Send + Sync + std::fmt::Debug {
    /// Find an elective.
    async fn find_elective(&self, id: ElectiveId) -> AppResult<Option<Elective>>;

    /// Find a subject.
    async fn find_subject(&self, id: SubjectId) -> AppResult<Option<Subject>>;

    /// Team memberships of a student; `None` when the student does not exist.
    async fn find_student_teams(&self, id: StudentId) -> AppResult<Option<HashSet<TeamId>>>;

    /// All electives.
    async fn list_electives(&self) -> AppResult<Vec<Elective>>;

    /// Subjects of one elective.
    async fn list_subjects(&self, elective_id: ElectiveId) -> AppResult<Vec<Subject>>;
}

/// A cached occupancy counter that disagreed with the selection count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyDrift {
    /// The subject.
    pub subject_id: SubjectId,
    /// Counter value before reconciliation.
    pub recorded: u32,
    /// Number of selections referencing the subject.
    pub counted: u32,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Number of subjects inspected.
    pub subjects_checked: usize,
    /// Counters that were corrected.
    pub drifted: Vec<OccupancyDrift>,
    /// Subjects whose counted occupancy exceeds capacity.
    pub over_capacity: Vec<SubjectOccupancy>,
}

impl ReconcileReport {
    /// Whether the pass found nothing to report.
    pub fn is_consistent(&self) -> bool {
        self.drifted.is_empty() && self.over_capacity.is_empty()
    }
}
