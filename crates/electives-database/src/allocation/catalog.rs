//! Catalog lookups backed by the repositories.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;

use electives_core::result::AppResult;
use electives_core::types::{ElectiveId, StudentId, SubjectId, TeamId};
use electives_engine::Catalog;
use electives_entity::{Elective, Subject};

use crate::repositories::{
    ElectiveRepository, StudentRepository, SubjectRepository, TeamRepository,
};

/// Read-only catalog over PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    electives: ElectiveRepository,
    subjects: SubjectRepository,
    students: StudentRepository,
    teams: TeamRepository,
}

impl PgCatalog {
    /// Creates a catalog sharing `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self {
            electives: ElectiveRepository::new(pool.clone()),
            subjects: SubjectRepository::new(pool.clone()),
            students: StudentRepository::new(pool.clone()),
            teams: TeamRepository::new(pool),
        }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn find_elective(&self, id: ElectiveId) -> AppResult<Option<Elective>> {
        self.electives.find_by_id(id).await
    }

    async fn find_subject(&self, id: SubjectId) -> AppResult<Option<Subject>> {
        self.subjects.find_by_id(id).await
    }

    async fn find_student_teams(&self, id: StudentId) -> AppResult<Option<HashSet<TeamId>>> {
        if self.students.find_by_id(id).await?.is_none() {
            return Ok(None);
        }
        self.teams.teams_of_student(id).await.map(Some)
    }

    async fn list_electives(&self) -> AppResult<Vec<Elective>> {
        self.electives.list().await
    }

    async fn list_subjects(&self, elective_id: ElectiveId) -> AppResult<Vec<Subject>> {
        self.subjects.list_by_elective(elective_id).await
    }
}
