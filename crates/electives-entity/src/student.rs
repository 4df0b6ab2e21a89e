//! Student entity and team membership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use electives_core::types::{StudentId, TeamId};

/// A student who may enroll into subjects.
///
/// Authentication lives outside this system; `username` is the stable
/// handle the identity provider maps onto this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Student {
    /// Unique student identifier.
    pub id: StudentId,
    /// Unique login name.
    pub username: String,
    /// Human-readable display name.
    pub display_name: Option<String>,
    /// When the student was created.
    pub created_at: DateTime<Utc>,
}

/// A single (student, team) membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct TeamMembership {
    /// The member.
    pub student_id: StudentId,
    /// The team.
    pub team_id: TeamId,
}

/// Data required to create a new student.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewStudent {
    /// Desired username.
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    /// Display name (optional).
    #[validate(length(max = 256))]
    pub display_name: Option<String>,
}
