//! Team entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use electives_core::types::TeamId;

/// A named group of students. Electives and subjects may be restricted
/// to the members of one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Team {
    /// Unique team identifier.
    pub id: TeamId,
    /// Display name, unique across teams.
    pub name: String,
    /// When the team was created.
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new team.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewTeam {
    /// Display name.
    #[validate(length(min = 1, max = 128))]
    pub name: String,
}
