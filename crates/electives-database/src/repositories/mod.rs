//! Repository implementations for all Electives entities.

pub mod elective;
pub mod selection;
pub mod student;
pub mod subject;
pub mod team;

pub use elective::ElectiveRepository;
pub use selection::SelectionRepository;
pub use student::StudentRepository;
pub use subject::SubjectRepository;
pub use team::TeamRepository;

use electives_core::error::{AppError, ErrorKind};

/// Map a failed write, turning constraint violations into caller errors.
pub(crate) fn write_error(context: &str, err: sqlx::Error) -> AppError {
    let kind = match err.as_database_error() {
        Some(db) if db.is_unique_violation() => ErrorKind::Conflict,
        Some(db) if db.is_foreign_key_violation() => ErrorKind::NotFound,
        Some(db) if db.is_check_violation() => ErrorKind::Validation,
        _ => ErrorKind::Database,
    };
    AppError::with_source(kind, format!("{context}: {err}"), err)
}
