//! Allocation outcomes that are not a success.

use thiserror::Error;

use electives_core::error::{AppError, ErrorKind};
use electives_core::types::{ElectiveId, SubjectId};

use crate::eligibility::IneligibilityReason;
use crate::window::WindowState;

/// Why a `select` or `deselect` did not succeed.
///
/// Every variant except [`AllocationError::Storage`] and
/// [`AllocationError::Internal`] is an expected business outcome reported to
/// the student, not an operational fault.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The elective's enrollment window does not accept selections.
    #[error("elective {elective_id} is not open for enrollment ({state})")]
    ElectiveClosed {
        /// The elective.
        elective_id: ElectiveId,
        /// Its window state at request time.
        state: WindowState,
    },
    /// The student fails a team restriction.
    #[error("not eligible: {reason}")]
    NotEligible {
        /// The failed restriction.
        reason: IneligibilityReason,
    },
    /// The subject has no free seat.
    #[error("subject {subject_id} is full ({capacity} seats)")]
    SubjectFull {
        /// The subject.
        subject_id: SubjectId,
        /// Its capacity.
        capacity: u32,
    },
    /// A referenced student, elective, or subject does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The unit of work could not be committed. Nothing was applied.
    #[error("storage failure: {0}")]
    Storage(#[source] AppError),
    /// A backend broke one of its own invariants. Nothing was applied and
    /// repeating the request will fail the same way.
    #[error("internal error: {0}")]
    Internal(#[source] AppError),
}

impl AllocationError {
    /// Whether retrying the identical request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<AppError> for AllocationError {
    fn from(err: AppError) -> Self {
        match err.kind {
            ErrorKind::NotFound => Self::NotFound(err.message),
            ErrorKind::Database | ErrorKind::Io => Self::Storage(err),
            _ => Self::Internal(err),
        }
    }
}

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::ElectiveClosed { .. } | AllocationError::SubjectFull { .. } => {
                AppError::conflict(err.to_string())
            }
            AllocationError::NotEligible { .. } => AppError::authorization(err.to_string()),
            AllocationError::NotFound(message) => AppError::not_found(message),
            AllocationError::Storage(inner) | AllocationError::Internal(inner) => inner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use electives_core::types::TeamId;

    #[test]
    fn test_not_found_app_error_is_domain_outcome() {
        let err = AllocationError::from(AppError::not_found("Subject not found"));
        assert!(matches!(err, AllocationError::NotFound(ref m) if m == "Subject not found"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_database_error_is_storage_failure() {
        let err = AllocationError::from(AppError::database("connection reset"));
        assert!(err.is_retryable());

        let app: AppError = err.into();
        assert_eq!(app.kind, ErrorKind::Database);
    }

    #[test]
    fn test_subject_full_maps_to_conflict() {
        let app: AppError = AllocationError::SubjectFull {
            subject_id: SubjectId::new(),
            capacity: 3,
        }
        .into();
        assert_eq!(app.kind, ErrorKind::Conflict);
        assert!(app.message.contains("3 seats"));
    }

    #[test]
    fn test_internal_error_is_not_retryable() {
        let err = AllocationError::from(AppError::internal("release without a reservation"));
        assert!(matches!(err, AllocationError::Internal(_)));
        assert!(!err.is_retryable());

        let app: AppError = err.into();
        assert_eq!(app.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_io_error_is_storage_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "socket closed");
        let err = AllocationError::from(AppError::from(io));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_not_eligible_maps_to_authorization() {
        let app: AppError = AllocationError::NotEligible {
            reason: IneligibilityReason::ElectiveTeamRequired {
                team_id: TeamId::new(),
            },
        }
        .into();
        assert_eq!(app.kind, ErrorKind::Authorization);
        assert!(app.message.starts_with("not eligible"));
    }
}
