//! Selection entity: a student's chosen subject within an elective.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use electives_core::types::{ElectiveId, SelectionKey, StudentId, SubjectId};

/// The single active choice of a student within one elective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Selection {
    /// The selecting student.
    pub student_id: StudentId,
    /// The elective.
    pub elective_id: ElectiveId,
    /// The chosen subject; always a subject of `elective_id`.
    pub subject_id: SubjectId,
    /// When this subject was selected.
    pub selected_at: DateTime<Utc>,
}

impl Selection {
    /// The (student, elective) key this selection occupies.
    pub fn key(&self) -> SelectionKey {
        SelectionKey::new(self.student_id, self.elective_id)
    }
}
