//! In-memory catalog of teams, students, electives, and subjects.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use electives_core::error::AppError;
use electives_core::result::AppResult;
use electives_core::types::{ElectiveId, StudentId, SubjectId, TeamId};
use electives_entity::{Elective, Subject, Team};

use crate::store::Catalog;

/// Catalog backed by concurrent hash maps.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    teams: DashMap<TeamId, Team>,
    students: DashMap<StudentId, HashSet<TeamId>>,
    electives: DashMap<ElectiveId, Elective>,
    subjects: DashMap<SubjectId, Subject>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a team.
    pub fn insert_team(&self, team: Team) {
        debug!(team_id = %team.id, name = %team.name, "Team registered");
        self.teams.insert(team.id, team);
    }

    /// Register a student with their team memberships.
    pub fn insert_student(&self, student_id: StudentId, teams: impl IntoIterator<Item = TeamId>) {
        self.students
            .insert(student_id, teams.into_iter().collect());
    }

    /// Add a student to a team.
    pub fn add_membership(&self, student_id: StudentId, team_id: TeamId) -> AppResult<()> {
        let mut teams = self
            .students
            .get_mut(&student_id)
            .ok_or_else(|| AppError::not_found(format!("Student {student_id} not found")))?;
        teams.insert(team_id);
        Ok(())
    }

    /// Register an elective.
    pub fn insert_elective(&self, elective: Elective) {
        self.electives.insert(elective.id, elective);
    }

    /// Register a subject. Its elective must already be registered.
    pub fn insert_subject(&self, subject: Subject) -> AppResult<()> {
        if !self.electives.contains_key(&subject.elective_id) {
            return Err(AppError::not_found(format!(
                "Elective {} not found",
                subject.elective_id
            )));
        }
        if subject.capacity < 1 {
            return Err(AppError::validation("Subject capacity must be positive"));
        }
        self.subjects.insert(subject.id, subject);
        Ok(())
    }

    /// Capacity of a subject, if registered.
    pub fn capacity_of(&self, subject_id: &SubjectId) -> Option<u32> {
        self.subjects.get(subject_id).map(|s| s.seats())
    }

    /// Registered subject ids.
    pub fn subject_ids(&self) -> Vec<SubjectId> {
        self.subjects.iter().map(|entry| *entry.key()).collect()
    }

    /// All teams.
    pub fn teams(&self) -> Vec<Team> {
        self.teams.iter().map(|entry| entry.value().clone()).collect()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_elective(&self, id: ElectiveId) -> AppResult<Option<Elective>> {
        Ok(self.electives.get(&id).map(|e| e.value().clone()))
    }

    async fn find_subject(&self, id: SubjectId) -> AppResult<Option<Subject>> {
        Ok(self.subjects.get(&id).map(|s| s.value().clone()))
    }

    async fn find_student_teams(&self, id: StudentId) -> AppResult<Option<HashSet<TeamId>>> {
        Ok(self.students.get(&id).map(|t| t.value().clone()))
    }

    async fn list_electives(&self) -> AppResult<Vec<Elective>> {
        let mut electives: Vec<Elective> = self
            .electives
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        electives.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(electives)
    }

    async fn list_subjects(&self, elective_id: ElectiveId) -> AppResult<Vec<Subject>> {
        let mut subjects: Vec<Subject> = self
            .subjects
            .iter()
            .filter(|entry| entry.elective_id == elective_id)
            .map(|entry| entry.value().clone())
            .collect();
        subjects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subjects)
    }
}
