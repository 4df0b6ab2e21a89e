//! # electives-entity
//!
//! Domain entity models for Electives. Every struct in this crate represents
//! a database table row or a domain value object. Database entities derive
//! `sqlx::FromRow`; input records derive `validator::Validate`.

pub mod elective;
pub mod selection;
pub mod student;
pub mod subject;
pub mod team;

pub use elective::{Elective, ElectiveWindow, NewElective};
pub use selection::Selection;
pub use student::{NewStudent, Student, TeamMembership};
pub use subject::{NewSubject, Subject, SubjectOccupancy};
pub use team::{NewTeam, Team};
