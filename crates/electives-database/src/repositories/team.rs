//! Team and team membership repository.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::PgPool;
use validator::Validate;

use electives_core::error::{AppError, ErrorKind};
use electives_core::result::AppResult;
use electives_core::types::{StudentId, TeamId};
use electives_entity::{NewTeam, Student, Team};

use super::write_error;

/// Repository for teams and their members.
#[derive(Debug, Clone)]
pub struct TeamRepository {
    pool: PgPool,
}

impl TeamRepository {
    /// Create a new team repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a team.
    pub async fn create(&self, new: &NewTeam) -> AppResult<Team> {
        new.validate()?;
        sqlx::query_as::<_, Team>(
            "INSERT INTO teams (id, name, created_at) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(TeamId::new())
        .bind(&new.name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error("Failed to create team", e))
    }

    /// Find a team by ID.
    pub async fn find_by_id(&self, id: TeamId) -> AppResult<Option<Team>> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find team", e))
    }

    /// Find a team by name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Team>> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find team", e))
    }

    /// List all teams by name.
    pub async fn list(&self) -> AppResult<Vec<Team>> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list teams", e))
    }

    /// Add a student to a team. Adding an existing member is a no-op.
    pub async fn add_member(&self, team_id: TeamId, student_id: StudentId) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO team_memberships (student_id, team_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(student_id)
        .bind(team_id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("Failed to add team member", e))?;
        Ok(())
    }

    /// Remove a student from a team. Returns whether a membership existed.
    ///
    /// Existing selections are kept; eligibility is only checked when a
    /// selection is made.
    pub async fn remove_member(&self, team_id: TeamId, student_id: StudentId) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM team_memberships WHERE student_id = $1 AND team_id = $2")
                .bind(student_id)
                .bind(team_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to remove team member", e)
                })?;
        Ok(result.rows_affected() > 0)
    }

    /// Members of a team.
    pub async fn members(&self, team_id: TeamId) -> AppResult<Vec<Student>> {
        sqlx::query_as::<_, Student>(
            "SELECT s.* FROM students s \
             JOIN team_memberships m ON m.student_id = s.id \
             WHERE m.team_id = $1 ORDER BY s.username",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list team members", e))
    }

    /// Teams a student belongs to.
    pub async fn teams_of_student(&self, student_id: StudentId) -> AppResult<HashSet<TeamId>> {
        let teams: Vec<TeamId> =
            sqlx::query_scalar("SELECT team_id FROM team_memberships WHERE student_id = $1")
                .bind(student_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to load memberships", e)
                })?;
        Ok(teams.into_iter().collect())
    }
}
