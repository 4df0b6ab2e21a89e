//! Student repository.

use chrono::Utc;
use sqlx::PgPool;
use validator::Validate;

use electives_core::error::{AppError, ErrorKind};
use electives_core::result::AppResult;
use electives_core::types::StudentId;
use electives_entity::{NewStudent, Student};

use super::write_error;

/// Repository for students.
#[derive(Debug, Clone)]
pub struct StudentRepository {
    pool: PgPool,
}

impl StudentRepository {
    /// Create a new student repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a student.
    pub async fn create(&self, new: &NewStudent) -> AppResult<Student> {
        new.validate()?;
        sqlx::query_as::<_, Student>(
            "INSERT INTO students (id, username, display_name, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(StudentId::new())
        .bind(&new.username)
        .bind(&new.display_name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error("Failed to create student", e))
    }

    /// Find a student by ID.
    pub async fn find_by_id(&self, id: StudentId) -> AppResult<Option<Student>> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find student", e))
    }

    /// Find a student by username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<Student>> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find student", e))
    }

    /// List students by username with pagination.
    pub async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Student>> {
        sqlx::query_as::<_, Student>(
            "SELECT * FROM students ORDER BY username LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list students", e))
    }
}
