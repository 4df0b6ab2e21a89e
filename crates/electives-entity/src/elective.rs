//! Elective entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use electives_core::types::{ElectiveId, TeamId};

/// A time-bounded group of subjects a student chooses one from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Elective {
    /// Unique elective identifier.
    pub id: ElectiveId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// When set, only members of this team may see or enroll.
    pub team_id: Option<TeamId>,
    /// Enrollment opens at this instant (unbounded when `None`).
    pub start_date: Option<DateTime<Utc>>,
    /// Enrollment closes after this instant (unbounded when `None`).
    pub end_date: Option<DateTime<Utc>>,
    /// When the elective was created.
    pub created_at: DateTime<Utc>,
}

impl Elective {
    /// The configured enrollment window.
    pub fn window(&self) -> ElectiveWindow {
        ElectiveWindow {
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// The optional start/end bounds of an elective's enrollment window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElectiveWindow {
    /// Opening instant.
    pub start_date: Option<DateTime<Utc>>,
    /// Closing instant.
    pub end_date: Option<DateTime<Utc>>,
}

impl ElectiveWindow {
    /// A window with neither bound set.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Whether both bounds are set and the start lies after the end.
    pub fn is_inverted(&self) -> bool {
        matches!((self.start_date, self.end_date), (Some(start), Some(end)) if start > end)
    }
}

/// Data required to create a new elective.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_new_elective_window"))]
pub struct NewElective {
    /// Display name.
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Owning team, if restricted.
    pub team_id: Option<TeamId>,
    /// Enrollment window.
    #[serde(default)]
    pub window: ElectiveWindow,
}

fn validate_new_elective_window(elective: &NewElective) -> Result<(), ValidationError> {
    validate_window(&elective.window)
}

/// Reject windows whose start lies after their end.
pub fn validate_window(window: &ElectiveWindow) -> Result<(), ValidationError> {
    if window.is_inverted() {
        let mut err = ValidationError::new("window_inverted");
        err.message = Some("start_date must not be after end_date".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_elective(window: ElectiveWindow) -> NewElective {
        NewElective {
            name: "Robotics".to_string(),
            description: None,
            team_id: None,
            window,
        }
    }

    #[test]
    fn test_unbounded_window_is_valid() {
        assert!(new_elective(ElectiveWindow::unbounded()).validate().is_ok());
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let now = Utc::now();
        let window = ElectiveWindow {
            start_date: Some(now),
            end_date: Some(now - Duration::days(1)),
        };
        assert!(window.is_inverted());
        assert!(new_elective(window).validate().is_err());
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let mut elective = new_elective(ElectiveWindow::unbounded());
        elective.name.clear();
        assert!(elective.validate().is_err());
    }
}
