//! Catalog browsing: which electives a student sees and how full they are.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use electives_core::error::AppError;
use electives_core::result::AppResult;
use electives_core::types::{ElectiveId, SelectionKey, StudentId, SubjectId};
use electives_entity::{Elective, Selection, Subject, SubjectOccupancy};

use crate::context::StudentContext;
use crate::eligibility::{self, Eligibility, IneligibilityReason};
use crate::store::{AllocationStore, Catalog};
use crate::window::{self, WindowState};

/// One subject as presented to a student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectAvailability {
    /// The subject.
    pub subject: Subject,
    /// Committed occupancy.
    pub occupancy: SubjectOccupancy,
    /// Why the student may not select it, if they may not.
    pub ineligibility: Option<IneligibilityReason>,
}

impl SubjectAvailability {
    /// Whether the student passes the team restrictions.
    pub fn is_eligible(&self) -> bool {
        self.ineligibility.is_none()
    }
}

/// One elective as presented to a student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectiveOverview {
    /// The elective.
    pub elective: Elective,
    /// Window state at the requested instant.
    pub window_state: WindowState,
    /// When the window state changes next.
    pub next_transition: Option<DateTime<Utc>>,
    /// The student's current subject.
    pub current_selection: Option<SubjectId>,
    /// Subjects with their availability.
    pub subjects: Vec<SubjectAvailability>,
}

/// Read-only views for students browsing electives.
#[derive(Debug, Clone)]
pub struct CatalogService {
    /// Read-only records.
    catalog: Arc<dyn Catalog>,
    /// Committed selections and occupancy.
    store: Arc<dyn AllocationStore>,
}

impl CatalogService {
    /// Creates a new catalog service.
    pub fn new(catalog: Arc<dyn Catalog>, store: Arc<dyn AllocationStore>) -> Self {
        Self { catalog, store }
    }

    /// Every elective the student may see, with availability at `now`.
    pub async fn visible_electives(
        &self,
        student: &StudentContext,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ElectiveOverview>> {
        let mut overviews = Vec::new();
        for elective in self.catalog.list_electives().await? {
            if eligibility::can_view(&student.teams, &elective) {
                overviews.push(self.overview(student, elective, now).await?);
            }
        }
        Ok(overviews)
    }

    /// One elective, if the student may see it.
    pub async fn elective_overview(
        &self,
        student: &StudentContext,
        elective_id: ElectiveId,
        now: DateTime<Utc>,
    ) -> AppResult<ElectiveOverview> {
        let elective = self
            .catalog
            .find_elective(elective_id)
            .await?
            .filter(|e| eligibility::can_view(&student.teams, e))
            .ok_or_else(|| AppError::not_found(format!("Elective {elective_id} not found")))?;

        self.overview(student, elective, now).await
    }

    /// The student's committed selections.
    pub async fn student_selections(&self, student_id: StudentId) -> AppResult<Vec<Selection>> {
        self.store.selections_for_student(student_id).await
    }

    async fn overview(
        &self,
        student: &StudentContext,
        elective: Elective,
        now: DateTime<Utc>,
    ) -> AppResult<ElectiveOverview> {
        let window = elective.window();
        let current_selection = self
            .store
            .current_selection(SelectionKey::new(student.student_id, elective.id))
            .await?;

        let mut subjects = Vec::new();
        for subject in self.catalog.list_subjects(elective.id).await? {
            let occupied = self.store.occupancy(subject.id).await?;
            let ineligibility = match eligibility::evaluate(&student.teams, &elective, &subject) {
                Eligibility::Eligible => None,
                Eligibility::Ineligible(reason) => Some(reason),
            };
            subjects.push(SubjectAvailability {
                occupancy: SubjectOccupancy {
                    subject_id: subject.id,
                    capacity: subject.capacity,
                    occupied: i64::from(occupied),
                },
                subject,
                ineligibility,
            });
        }

        Ok(ElectiveOverview {
            window_state: window::state(&window, now),
            next_transition: window::next_transition(&window, now),
            current_selection,
            subjects,
            elective,
        })
    }
}
