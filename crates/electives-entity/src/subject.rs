//! Subject entity and occupancy view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use electives_core::types::{ElectiveId, SubjectId, TeamId};

/// An enrollable unit with a seat cap, belonging to exactly one elective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Subject {
    /// Unique subject identifier.
    pub id: SubjectId,
    /// The owning elective.
    pub elective_id: ElectiveId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// When set, only members of this team may enroll, in addition to the
    /// elective's own restriction.
    pub team_id: Option<TeamId>,
    /// Maximum number of selections. Always positive.
    pub capacity: i32,
    /// When the subject was created.
    pub created_at: DateTime<Utc>,
}

impl Subject {
    /// Capacity as an unsigned seat count.
    pub fn seats(&self) -> u32 {
        u32::try_from(self.capacity).unwrap_or(0)
    }
}

/// Occupancy of one subject, counted from its selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SubjectOccupancy {
    /// The subject.
    pub subject_id: SubjectId,
    /// Configured capacity.
    pub capacity: i32,
    /// Number of selections referencing the subject.
    pub occupied: i64,
}

impl SubjectOccupancy {
    /// Seats still free (never negative).
    pub fn remaining(&self) -> u32 {
        u32::try_from(i64::from(self.capacity) - self.occupied).unwrap_or(0)
    }

    /// Whether no seat is left.
    pub fn is_full(&self) -> bool {
        self.occupied >= i64::from(self.capacity)
    }
}

/// Data required to create a new subject.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewSubject {
    /// The owning elective.
    pub elective_id: ElectiveId,
    /// Display name.
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Optional team restriction.
    pub team_id: Option<TeamId>,
    /// Seat cap.
    #[validate(range(min = 1))]
    pub capacity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_never_negative() {
        let occupancy = SubjectOccupancy {
            subject_id: SubjectId::new(),
            capacity: 2,
            occupied: 3,
        };
        assert_eq!(occupancy.remaining(), 0);
        assert!(occupancy.is_full());
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let subject = NewSubject {
            elective_id: ElectiveId::new(),
            name: "Welding".to_string(),
            description: None,
            team_id: None,
            capacity: 0,
        };
        assert!(subject.validate().is_err());
    }
}
