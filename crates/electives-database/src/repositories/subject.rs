//! Subject repository.

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use electives_core::error::{AppError, ErrorKind};
use electives_core::result::AppResult;
use electives_core::types::{ElectiveId, SubjectId};
use electives_entity::{NewSubject, Subject, SubjectOccupancy};

use super::write_error;

const OCCUPANCY_SELECT: &str = "SELECT s.id AS subject_id, s.capacity, \
     (SELECT COUNT(*) FROM selections sel WHERE sel.subject_id = s.id) AS occupied \
     FROM subjects s";

/// Repository for subjects.
#[derive(Debug, Clone)]
pub struct SubjectRepository {
    pool: PgPool,
}

impl SubjectRepository {
    /// Create a new subject repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a subject in an existing elective.
    pub async fn create(&self, new: &NewSubject) -> AppResult<Subject> {
        new.validate()?;
        sqlx::query_as::<_, Subject>(
            "INSERT INTO subjects (id, elective_id, name, description, team_id, capacity, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(SubjectId::new())
        .bind(new.elective_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.team_id)
        .bind(new.capacity)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error("Failed to create subject", e))
    }

    /// Find a subject by ID.
    pub async fn find_by_id(&self, id: SubjectId) -> AppResult<Option<Subject>> {
        sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find subject", e))
    }

    /// Subjects of an elective by name.
    pub async fn list_by_elective(&self, elective_id: ElectiveId) -> AppResult<Vec<Subject>> {
        sqlx::query_as::<_, Subject>(
            "SELECT * FROM subjects WHERE elective_id = $1 ORDER BY name, id",
        )
        .bind(elective_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list subjects", e))
    }

    /// Change a subject's capacity.
    ///
    /// Refuses a capacity below the number of students currently holding the
    /// subject. The subject row is locked as the allocation path locks it, so
    /// no selection can slip in between the count and the update.
    pub async fn update_capacity(&self, id: SubjectId, capacity: i32) -> AppResult<Subject> {
        if capacity < 1 {
            return Err(AppError::validation("Subject capacity must be positive"));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let locked: Option<SubjectId> =
            sqlx::query_scalar("SELECT id FROM subjects WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to lock subject", e)
                })?;
        if locked.is_none() {
            return Err(AppError::not_found(format!("Subject {id} not found")));
        }

        let occupied: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM selections WHERE subject_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count selections", e)
                })?;
        if occupied > i64::from(capacity) {
            return Err(AppError::conflict(format!(
                "Subject {id} has {occupied} students; capacity {capacity} is too small"
            )));
        }

        let subject = sqlx::query_as::<_, Subject>(
            "UPDATE subjects SET capacity = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(capacity)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| write_error("Failed to update subject capacity", e))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })?;

        info!(subject_id = %id, capacity, occupied, "Subject capacity updated");
        Ok(subject)
    }

    /// Current occupancy of one subject.
    pub async fn occupancy(&self, id: SubjectId) -> AppResult<Option<SubjectOccupancy>> {
        sqlx::query_as::<_, SubjectOccupancy>(&format!("{OCCUPANCY_SELECT} WHERE s.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load subject occupancy", e)
            })
    }

    /// Current occupancy of every subject of an elective.
    pub async fn occupancy_by_elective(
        &self,
        elective_id: ElectiveId,
    ) -> AppResult<Vec<SubjectOccupancy>> {
        sqlx::query_as::<_, SubjectOccupancy>(&format!(
            "{OCCUPANCY_SELECT} WHERE s.elective_id = $1 ORDER BY s.name, s.id"
        ))
        .bind(elective_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load subject occupancy", e)
        })
    }
}
