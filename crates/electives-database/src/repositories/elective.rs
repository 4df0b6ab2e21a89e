//! Elective repository.

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use electives_core::error::{AppError, ErrorKind};
use electives_core::result::AppResult;
use electives_core::types::{ElectiveId, TeamId};
use electives_entity::elective::validate_window;
use electives_entity::{Elective, ElectiveWindow, NewElective};

use super::write_error;

/// Repository for electives.
#[derive(Debug, Clone)]
pub struct ElectiveRepository {
    pool: PgPool,
}

impl ElectiveRepository {
    /// Create a new elective repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an elective.
    pub async fn create(&self, new: &NewElective) -> AppResult<Elective> {
        new.validate()?;
        sqlx::query_as::<_, Elective>(
            "INSERT INTO electives (id, name, description, team_id, start_date, end_date, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(ElectiveId::new())
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.team_id)
        .bind(new.window.start_date)
        .bind(new.window.end_date)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error("Failed to create elective", e))
    }

    /// Find an elective by ID.
    pub async fn find_by_id(&self, id: ElectiveId) -> AppResult<Option<Elective>> {
        sqlx::query_as::<_, Elective>("SELECT * FROM electives WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find elective", e))
    }

    /// List all electives by name.
    pub async fn list(&self) -> AppResult<Vec<Elective>> {
        sqlx::query_as::<_, Elective>("SELECT * FROM electives ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list electives", e))
    }

    /// Electives restricted to a team.
    pub async fn list_by_team(&self, team_id: TeamId) -> AppResult<Vec<Elective>> {
        sqlx::query_as::<_, Elective>(
            "SELECT * FROM electives WHERE team_id = $1 ORDER BY name, id",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list electives", e))
    }

    /// Replace the enrollment window.
    ///
    /// Existing selections are unaffected; the new window only gates future
    /// selections.
    pub async fn update_window(
        &self,
        id: ElectiveId,
        window: ElectiveWindow,
    ) -> AppResult<Elective> {
        validate_window(&window).map_err(|e| {
            AppError::validation(
                e.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            )
        })?;

        let elective = sqlx::query_as::<_, Elective>(
            "UPDATE electives SET start_date = $2, end_date = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(window.start_date)
        .bind(window.end_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error("Failed to update elective window", e))?
        .ok_or_else(|| AppError::not_found(format!("Elective {id} not found")))?;

        info!(
            elective_id = %id,
            start_date = ?window.start_date,
            end_date = ?window.end_date,
            "Elective window updated"
        );
        Ok(elective)
    }

    /// Delete an elective with its subjects and selections.
    pub async fn delete(&self, id: ElectiveId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM electives WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete elective", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}
