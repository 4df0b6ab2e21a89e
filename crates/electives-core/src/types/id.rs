//! Newtype wrappers around [`uuid::Uuid`] for all domain entity identifiers.
//!
//! Using distinct types prevents accidentally passing a `SubjectId` where an
//! `ElectiveId` is expected. When the `sqlx` feature is enabled, each ID type
//! also implements `sqlx::Type`, `sqlx::Encode`, and `sqlx::Decode` for
//! PostgreSQL.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a newtype ID wrapper around `Uuid`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new time-ordered identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Return the inner UUID value.
            pub fn into_uuid(self) -> Uuid {
                self.0
            }

            /// Return a reference to the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }

        #[cfg(feature = "sqlx")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <Uuid as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <Uuid as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                <Uuid as sqlx::Decode<'r, sqlx::Postgres>>::decode(value).map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a team.
    TeamId
);

define_id!(
    /// Unique identifier for a student.
    StudentId
);

define_id!(
    /// Unique identifier for an elective.
    ElectiveId
);

define_id!(
    /// Unique identifier for a subject within an elective.
    SubjectId
);

/// The (student, elective) pair that owns at most one selection.
///
/// Every mutation of a selection is serialized on this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SelectionKey {
    /// The selecting student.
    pub student_id: StudentId,
    /// The elective the selection belongs to.
    pub elective_id: ElectiveId,
}

impl SelectionKey {
    /// Create a new selection key.
    pub fn new(student_id: StudentId, elective_id: ElectiveId) -> Self {
        Self {
            student_id,
            elective_id,
        }
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.student_id, self.elective_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_id_new() {
        let id1 = StudentId::new();
        let id2 = StudentId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_subject_id_display() {
        let uuid = Uuid::new_v4();
        let id = SubjectId::from_uuid(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn test_elective_id_from_str() {
        let uuid = Uuid::new_v4();
        let id: ElectiveId = uuid.to_string().parse().expect("should parse");
        assert_eq!(id.0, uuid);
        assert!("not-a-uuid".parse::<ElectiveId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = TeamId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{}\"", id.0));
    }

    #[test]
    fn test_selection_key_display() {
        let key = SelectionKey::new(StudentId::new(), ElectiveId::new());
        assert_eq!(
            key.to_string(),
            format!("{}:{}", key.student_id, key.elective_id)
        );
    }
}
