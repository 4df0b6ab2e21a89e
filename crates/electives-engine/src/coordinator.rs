//! Allocation coordinator: the `select` / `deselect` state machine.
//!
//! Each operation resolves its records, passes the window and eligibility
//! gates, and then runs inside one unit of work:
//!
//! 1. Load the prior selection of (student, elective).
//! 2. Re-selecting the same subject is a no-op.
//! 3. Reserve a seat in the new subject, or fail with `SubjectFull`.
//! 4. Point the selection at the new subject.
//! 5. Release the prior subject's seat.
//!
//! The new seat is reserved before the old one is released, and before the
//! mapping changes, so occupancy is never understated and a selection never
//! exists without its seat.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use electives_core::config::AllocationConfig;
use electives_core::types::{ElectiveId, SelectionKey, StudentId, SubjectId};
use electives_entity::{Elective, Subject};

use crate::context::StudentContext;
use crate::eligibility::{self, Eligibility};
use crate::error::AllocationError;
use crate::store::{AllocationStore, Catalog, Reservation, UnitOfWork};
use crate::window;

/// Successful outcome of `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SelectOutcome {
    /// The student had no selection in the elective.
    Enrolled,
    /// The student already held this subject; nothing changed.
    Unchanged,
    /// The student moved from another subject of the elective.
    Switched {
        /// The released subject.
        from: SubjectId,
    },
}

/// Successful outcome of `deselect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeselectOutcome {
    /// The selection was removed and its seat released.
    Removed {
        /// The released subject.
        subject: SubjectId,
    },
    /// There was no selection; nothing changed.
    NothingSelected,
}

/// Orchestrates window clock, eligibility, capacity ledger, and selection
/// store into atomic enrollment changes.
#[derive(Debug, Clone)]
pub struct AllocationCoordinator {
    /// Read-only records.
    catalog: Arc<dyn Catalog>,
    /// Transactional selections and occupancy.
    store: Arc<dyn AllocationStore>,
    /// Retry policy.
    config: AllocationConfig,
}

impl AllocationCoordinator {
    /// Creates a new allocation coordinator.
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn AllocationStore>,
        config: AllocationConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            config,
        }
    }

    /// Builds a student context from the catalog's team memberships.
    ///
    /// For callers without an identity provider of their own (tooling, tests).
    pub async fn student_context(
        &self,
        student_id: StudentId,
    ) -> Result<StudentContext, AllocationError> {
        let teams = self
            .catalog
            .find_student_teams(student_id)
            .await?
            .ok_or_else(|| AllocationError::NotFound(format!("Student {student_id} not found")))?;
        Ok(StudentContext { student_id, teams })
    }

    /// Select `subject_id` of `elective_id` for the student at instant `now`.
    pub async fn select(
        &self,
        student: &StudentContext,
        elective_id: ElectiveId,
        subject_id: SubjectId,
        now: DateTime<Utc>,
    ) -> Result<SelectOutcome, AllocationError> {
        let (elective, subject) = self.resolve(student, elective_id, subject_id).await?;

        let state = window::state(&elective.window(), now);
        if !state.accepts_selections() {
            debug!(
                student_id = %student.student_id,
                elective_id = %elective_id,
                state = %state,
                "Selection rejected: elective closed"
            );
            return Err(AllocationError::ElectiveClosed { elective_id, state });
        }

        if let Eligibility::Ineligible(reason) =
            eligibility::evaluate(&student.teams, &elective, &subject)
        {
            debug!(
                student_id = %student.student_id,
                subject_id = %subject_id,
                reason = %reason,
                "Selection rejected: not eligible"
            );
            return Err(AllocationError::NotEligible { reason });
        }

        let key = SelectionKey::new(student.student_id, elective_id);
        let subject = &subject;
        let outcome = self
            .with_storage_retry("select", key, move || self.apply_select(key, subject))
            .await?;

        info!(
            student_id = %key.student_id,
            elective_id = %key.elective_id,
            subject_id = %subject_id,
            outcome = ?outcome,
            "Selection applied"
        );
        Ok(outcome)
    }

    /// Remove the student's selection in `elective_id`, if any.
    ///
    /// Never gated by the enrollment window.
    pub async fn deselect(
        &self,
        student_id: StudentId,
        elective_id: ElectiveId,
    ) -> Result<DeselectOutcome, AllocationError> {
        let key = SelectionKey::new(student_id, elective_id);
        let outcome = self
            .with_storage_retry("deselect", key, move || self.apply_deselect(key))
            .await?;

        info!(
            student_id = %student_id,
            elective_id = %elective_id,
            outcome = ?outcome,
            "Deselection applied"
        );
        Ok(outcome)
    }

    /// The committed selection of the student in `elective_id`.
    pub async fn current_selection(
        &self,
        student_id: StudentId,
        elective_id: ElectiveId,
    ) -> Result<Option<SubjectId>, AllocationError> {
        let key = SelectionKey::new(student_id, elective_id);
        Ok(self.store.current_selection(key).await?)
    }

    async fn resolve(
        &self,
        student: &StudentContext,
        elective_id: ElectiveId,
        subject_id: SubjectId,
    ) -> Result<(Elective, Subject), AllocationError> {
        let elective = self
            .catalog
            .find_elective(elective_id)
            .await?
            .ok_or_else(|| AllocationError::NotFound(format!("Elective {elective_id} not found")))?;

        let subject = self
            .catalog
            .find_subject(subject_id)
            .await?
            .filter(|s| s.elective_id == elective_id)
            .ok_or_else(|| {
                AllocationError::NotFound(format!(
                    "Subject {subject_id} not found in elective {elective_id}"
                ))
            })?;

        if self
            .catalog
            .find_student_teams(student.student_id)
            .await?
            .is_none()
        {
            return Err(AllocationError::NotFound(format!(
                "Student {} not found",
                student.student_id
            )));
        }

        Ok((elective, subject))
    }

    async fn apply_select(
        &self,
        key: SelectionKey,
        subject: &Subject,
    ) -> Result<SelectOutcome, AllocationError> {
        let mut unit = self.store.begin(key).await?;
        let result = select_within(unit.as_mut(), subject).await;
        finish(unit.as_mut(), result).await
    }

    async fn apply_deselect(&self, key: SelectionKey) -> Result<DeselectOutcome, AllocationError> {
        let mut unit = self.store.begin(key).await?;
        let result = deselect_within(unit.as_mut()).await;
        finish(unit.as_mut(), result).await
    }

    /// Run `unit_of_work` again after storage failures, up to the configured
    /// number of retries. Domain outcomes are returned immediately.
    async fn with_storage_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        key: SelectionKey,
        mut unit_of_work: F,
    ) -> Result<T, AllocationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AllocationError>>,
    {
        let mut attempt = 0u32;
        loop {
            match unit_of_work().await {
                Err(AllocationError::Storage(err))
                    if attempt < self.config.storage_retry_attempts =>
                {
                    attempt += 1;
                    warn!(
                        operation = operation,
                        key = %key,
                        attempt = attempt,
                        error = %err,
                        "Storage failure, retrying unit of work"
                    );
                    let backoff = self.config.retry_backoff_ms * u64::from(attempt);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(AllocationError::Storage(err)) => {
                    error!(
                        operation = operation,
                        key = %key,
                        attempts = attempt + 1,
                        error = %err,
                        "Storage failure, giving up"
                    );
                    return Err(AllocationError::Storage(err));
                }
                Err(AllocationError::Internal(err)) => {
                    error!(
                        operation = operation,
                        key = %key,
                        error = %err,
                        "Unit of work failed with an internal error"
                    );
                    return Err(AllocationError::Internal(err));
                }
                other => return other,
            }
        }
    }
}

async fn select_within(
    unit: &mut dyn UnitOfWork,
    subject: &Subject,
) -> Result<SelectOutcome, AllocationError> {
    let prior = unit.get().await?;
    if prior == Some(subject.id) {
        return Ok(SelectOutcome::Unchanged);
    }

    if let Reservation::Full { capacity } = unit.try_reserve(subject.id).await? {
        return Err(AllocationError::SubjectFull {
            subject_id: subject.id,
            capacity,
        });
    }

    unit.put(subject.id).await?;

    match prior {
        Some(previous) => {
            unit.release(previous).await?;
            Ok(SelectOutcome::Switched { from: previous })
        }
        None => Ok(SelectOutcome::Enrolled),
    }
}

async fn deselect_within(unit: &mut dyn UnitOfWork) -> Result<DeselectOutcome, AllocationError> {
    match unit.remove().await? {
        Some(subject) => {
            unit.release(subject).await?;
            Ok(DeselectOutcome::Removed { subject })
        }
        None => Ok(DeselectOutcome::NothingSelected),
    }
}

/// Commit on success, roll back on any failure.
async fn finish<T>(
    unit: &mut dyn UnitOfWork,
    result: Result<T, AllocationError>,
) -> Result<T, AllocationError> {
    match result {
        Ok(value) => {
            unit.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = unit.rollback().await {
                warn!(
                    key = %unit.key(),
                    error = %rollback_err,
                    "Rollback failed; the unit of work is discarded on drop"
                );
            }
            Err(err)
        }
    }
}
