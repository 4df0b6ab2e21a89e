//! Identity of the student performing an allocation request.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use electives_core::types::{StudentId, TeamId};

/// The verified student and their current team memberships.
///
/// Produced by the identity provider outside this crate and trusted as
/// already authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentContext {
    /// The authenticated student.
    pub student_id: StudentId,
    /// Teams the student belongs to at request time.
    pub teams: HashSet<TeamId>,
}

impl StudentContext {
    /// Creates a new student context.
    pub fn new(student_id: StudentId, teams: impl IntoIterator<Item = TeamId>) -> Self {
        Self {
            student_id,
            teams: teams.into_iter().collect(),
        }
    }

    /// Returns whether the student belongs to `team_id`.
    pub fn is_member_of(&self, team_id: &TeamId) -> bool {
        self.teams.contains(team_id)
    }
}
