//! Read access to committed selections.
//!
//! Selections are only written through the allocation store, which holds
//! the locks that keep occupancy within capacity.

use sqlx::PgPool;

use electives_core::error::{AppError, ErrorKind};
use electives_core::result::AppResult;
use electives_core::types::{SelectionKey, StudentId, SubjectId};
use electives_entity::Selection;

/// Repository for selection records.
#[derive(Debug, Clone)]
pub struct SelectionRepository {
    pool: PgPool,
}

impl SelectionRepository {
    /// Create a new selection repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the selection of a (student, elective) pair.
    pub async fn find(&self, key: SelectionKey) -> AppResult<Option<Selection>> {
        sqlx::query_as::<_, Selection>(
            "SELECT * FROM selections WHERE student_id = $1 AND elective_id = $2",
        )
        .bind(key.student_id)
        .bind(key.elective_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find selection", e))
    }

    /// Every selection of a student.
    pub async fn list_by_student(&self, student_id: StudentId) -> AppResult<Vec<Selection>> {
        sqlx::query_as::<_, Selection>(
            "SELECT * FROM selections WHERE student_id = $1 ORDER BY selected_at",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list selections", e))
    }

    /// Every selection of a subject.
    pub async fn list_by_subject(&self, subject_id: SubjectId) -> AppResult<Vec<Selection>> {
        sqlx::query_as::<_, Selection>(
            "SELECT * FROM selections WHERE subject_id = $1 ORDER BY selected_at",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list selections", e))
    }

    /// Number of students holding a subject.
    pub async fn count_by_subject(&self, subject_id: SubjectId) -> AppResult<u32> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM selections WHERE subject_id = $1")
                .bind(subject_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count selections", e)
                })?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}
