//! Capacity ledger: per-subject occupancy and admission control.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use electives_core::result::AppResult;
use electives_core::types::SubjectId;

/// Result of attempting to reserve a seat in a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reservation {
    /// A seat is held by the current unit of work.
    Reserved,
    /// Occupancy already equals capacity.
    Full {
        /// The subject's capacity.
        capacity: u32,
    },
}

/// Seat accounting inside a unit of work.
///
/// Occupancy always equals the number of selections referencing a subject
/// once the unit of work commits. A reservation is visible to other callers
/// only through that commit.
#[async_trait]
pub trait CapacityLedger: Send {
    /// Reserve one seat in `subject_id` if occupancy is below capacity.
    async fn try_reserve(&mut self, subject_id: SubjectId) -> AppResult<Reservation>;

    /// Release one seat previously held by a selection of `subject_id`.
    ///
    /// Callers release at most once per selection.
    async fn release(&mut self, subject_id: SubjectId) -> AppResult<()>;
}
