//! Selection store: the (student, elective) -> subject mapping.

use async_trait::async_trait;

use electives_core::result::AppResult;
use electives_core::types::{SelectionKey, SubjectId};

/// Access to the single selection of the (student, elective) pair a unit
/// of work was opened for.
#[async_trait]
pub trait SelectionStore: Send {
    /// The pair this store is bound to.
    fn key(&self) -> SelectionKey;

    /// The currently selected subject, if any.
    async fn get(&mut self) -> AppResult<Option<SubjectId>>;

    /// Point the selection at `subject_id`, replacing any prior subject.
    ///
    /// The subject must have been reserved in the same unit of work.
    async fn put(&mut self, subject_id: SubjectId) -> AppResult<()>;

    /// Delete the selection. Returns the removed subject; `None` is not an
    /// error.
    async fn remove(&mut self) -> AppResult<Option<SubjectId>>;
}
