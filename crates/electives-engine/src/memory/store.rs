//! In-memory allocation store using a Tokio mutex for atomicity.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use electives_core::error::AppError;
use electives_core::result::AppResult;
use electives_core::types::{SelectionKey, StudentId, SubjectId};
use electives_entity::{Selection, SubjectOccupancy};

use super::catalog::MemoryCatalog;
use crate::store::{
    AllocationStore, CapacityLedger, OccupancyDrift, ReconcileReport, Reservation,
    SelectionStore, UnitOfWork,
};

/// Selections and the occupancy counters derived from them.
#[derive(Debug, Default)]
struct AllocationState {
    /// (student, elective) -> (subject, selected at).
    selections: HashMap<SelectionKey, (SubjectId, DateTime<Utc>)>,
    /// Cached count of selections per subject.
    occupancy: HashMap<SubjectId, u32>,
}

/// In-memory allocation store.
///
/// A unit of work owns the state mutex until it commits or rolls back, so
/// units are serialized and readers never observe a half-applied change.
/// Suitable for single-node deployments only.
#[derive(Debug, Clone)]
pub struct MemoryAllocationStore {
    /// Source of subject capacities.
    catalog: Arc<MemoryCatalog>,
    /// Protected allocation state.
    state: Arc<Mutex<AllocationState>>,
}

impl MemoryAllocationStore {
    /// Creates an empty store reading capacities from `catalog`.
    pub fn new(catalog: Arc<MemoryCatalog>) -> Self {
        Self {
            catalog,
            state: Arc::new(Mutex::new(AllocationState::default())),
        }
    }
}

#[async_trait]
impl AllocationStore for MemoryAllocationStore {
    async fn begin(&self, key: SelectionKey) -> AppResult<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(MemoryUnitOfWork {
            key,
            catalog: Arc::clone(&self.catalog),
            state: guard,
            journal: Vec::new(),
            reserved: HashSet::new(),
            finished: false,
        }))
    }

    async fn current_selection(&self, key: SelectionKey) -> AppResult<Option<SubjectId>> {
        let state = self.state.lock().await;
        Ok(state.selections.get(&key).map(|(subject_id, _)| *subject_id))
    }

    async fn occupancy(&self, subject_id: SubjectId) -> AppResult<u32> {
        let state = self.state.lock().await;
        Ok(state.occupancy.get(&subject_id).copied().unwrap_or(0))
    }

    async fn selections_for_student(&self, student_id: StudentId) -> AppResult<Vec<Selection>> {
        let state = self.state.lock().await;
        let mut selections: Vec<Selection> = state
            .selections
            .iter()
            .filter(|(key, _)| key.student_id == student_id)
            .map(|(key, (subject_id, selected_at))| Selection {
                student_id: key.student_id,
                elective_id: key.elective_id,
                subject_id: *subject_id,
                selected_at: *selected_at,
            })
            .collect();
        selections.sort_by_key(|s| s.selected_at);
        Ok(selections)
    }

    async fn reconcile(&self) -> AppResult<ReconcileReport> {
        let mut state = self.state.lock().await;

        let mut counted: HashMap<SubjectId, u32> = HashMap::new();
        for (subject_id, _) in state.selections.values() {
            *counted.entry(*subject_id).or_insert(0) += 1;
        }

        let mut subjects: HashSet<SubjectId> = self.catalog.subject_ids().into_iter().collect();
        subjects.extend(state.occupancy.keys().copied());
        subjects.extend(counted.keys().copied());

        let mut report = ReconcileReport {
            subjects_checked: subjects.len(),
            ..ReconcileReport::default()
        };

        for subject_id in subjects {
            let recorded = state.occupancy.get(&subject_id).copied().unwrap_or(0);
            let actual = counted.get(&subject_id).copied().unwrap_or(0);

            if recorded != actual {
                warn!(
                    subject_id = %subject_id,
                    recorded = recorded,
                    counted = actual,
                    "Occupancy drift detected, reconciling"
                );
                report.drifted.push(OccupancyDrift {
                    subject_id,
                    recorded,
                    counted: actual,
                });
            }

            if actual == 0 {
                state.occupancy.remove(&subject_id);
            } else {
                state.occupancy.insert(subject_id, actual);
            }

            if let Some(capacity) = self.catalog.capacity_of(&subject_id) {
                if actual > capacity {
                    error!(
                        subject_id = %subject_id,
                        capacity = capacity,
                        occupied = actual,
                        "Subject is over capacity"
                    );
                    report.over_capacity.push(SubjectOccupancy {
                        subject_id,
                        capacity: i32::try_from(capacity).unwrap_or(i32::MAX),
                        occupied: i64::from(actual),
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Reversal of one applied operation.
#[derive(Debug)]
enum Undo {
    /// A seat was reserved; give it back.
    Reserved(SubjectId),
    /// A seat was released; take it again.
    Released(SubjectId),
    /// The mapping changed; restore the previous value.
    Mapping(Option<(SubjectId, DateTime<Utc>)>),
}

/// A unit of work holding the store's state lock.
///
/// Operations apply directly to the locked state and are journaled; the
/// journal is replayed backwards on rollback or when dropped uncommitted.
struct MemoryUnitOfWork {
    key: SelectionKey,
    catalog: Arc<MemoryCatalog>,
    state: OwnedMutexGuard<AllocationState>,
    journal: Vec<Undo>,
    reserved: HashSet<SubjectId>,
    finished: bool,
}

impl MemoryUnitOfWork {
    fn ensure_active(&self) -> AppResult<()> {
        if self.finished {
            return Err(AppError::internal("Unit of work already finished"));
        }
        Ok(())
    }

    fn undo_all(&mut self) {
        while let Some(entry) = self.journal.pop() {
            match entry {
                Undo::Reserved(subject_id) => {
                    if let Some(count) = self.state.occupancy.get_mut(&subject_id) {
                        *count = count.saturating_sub(1);
                    }
                }
                Undo::Released(subject_id) => {
                    *self.state.occupancy.entry(subject_id).or_insert(0) += 1;
                }
                Undo::Mapping(previous) => match previous {
                    Some(value) => {
                        self.state.selections.insert(self.key, value);
                    }
                    None => {
                        self.state.selections.remove(&self.key);
                    }
                },
            }
        }
        self.reserved.clear();
    }
}

#[async_trait]
impl CapacityLedger for MemoryUnitOfWork {
    async fn try_reserve(&mut self, subject_id: SubjectId) -> AppResult<Reservation> {
        self.ensure_active()?;

        let capacity = self
            .catalog
            .capacity_of(&subject_id)
            .ok_or_else(|| AppError::not_found(format!("Subject {subject_id} not found")))?;

        let occupied = self.state.occupancy.entry(subject_id).or_insert(0);
        if *occupied >= capacity {
            debug!(subject_id = %subject_id, capacity = capacity, "Subject full");
            return Ok(Reservation::Full { capacity });
        }

        *occupied += 1;
        self.journal.push(Undo::Reserved(subject_id));
        self.reserved.insert(subject_id);
        Ok(Reservation::Reserved)
    }

    async fn release(&mut self, subject_id: SubjectId) -> AppResult<()> {
        self.ensure_active()?;

        match self.state.occupancy.get_mut(&subject_id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                self.journal.push(Undo::Released(subject_id));
                Ok(())
            }
            _ => Err(AppError::internal(format!(
                "Release of subject {subject_id} with no occupied seat"
            ))),
        }
    }
}

#[async_trait]
impl SelectionStore for MemoryUnitOfWork {
    fn key(&self) -> SelectionKey {
        self.key
    }

    async fn get(&mut self) -> AppResult<Option<SubjectId>> {
        self.ensure_active()?;
        Ok(self
            .state
            .selections
            .get(&self.key)
            .map(|(subject_id, _)| *subject_id))
    }

    async fn put(&mut self, subject_id: SubjectId) -> AppResult<()> {
        self.ensure_active()?;

        if !self.reserved.contains(&subject_id) {
            return Err(AppError::internal(format!(
                "Subject {subject_id} was not reserved in this unit of work"
            )));
        }

        let previous = self
            .state
            .selections
            .insert(self.key, (subject_id, Utc::now()));
        self.journal.push(Undo::Mapping(previous));
        Ok(())
    }

    async fn remove(&mut self) -> AppResult<Option<SubjectId>> {
        self.ensure_active()?;

        let previous = self.state.selections.remove(&self.key);
        let removed = previous.map(|(subject_id, _)| subject_id);
        if previous.is_some() {
            self.journal.push(Undo::Mapping(previous));
        }
        Ok(removed)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(&mut self) -> AppResult<()> {
        self.ensure_active()?;
        self.journal.clear();
        self.reserved.clear();
        self.finished = true;
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        self.ensure_active()?;
        self.undo_all();
        self.finished = true;
        Ok(())
    }
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        if !self.finished && !self.journal.is_empty() {
            info!(key = %self.key, "Rolling back abandoned unit of work");
            self.undo_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use electives_core::types::{ElectiveId, StudentId};
    use electives_entity::{Elective, Subject};

    fn setup(capacity: i32) -> (MemoryAllocationStore, ElectiveId, SubjectId) {
        let catalog = Arc::new(MemoryCatalog::new());
        let elective = Elective {
            id: ElectiveId::new(),
            name: "Arts".to_string(),
            description: None,
            team_id: None,
            start_date: None,
            end_date: None,
            created_at: Utc::now(),
        };
        let subject = Subject {
            id: SubjectId::new(),
            elective_id: elective.id,
            name: "Pottery".to_string(),
            description: None,
            team_id: None,
            capacity,
            created_at: Utc::now(),
        };
        let (elective_id, subject_id) = (elective.id, subject.id);
        catalog.insert_elective(elective);
        catalog.insert_subject(subject).unwrap();
        (MemoryAllocationStore::new(catalog), elective_id, subject_id)
    }

    #[tokio::test]
    async fn test_commit_publishes_reservation_and_mapping() {
        let (store, elective_id, subject_id) = setup(2);
        let key = SelectionKey::new(StudentId::new(), elective_id);

        let mut unit = store.begin(key).await.unwrap();
        assert_eq!(
            unit.try_reserve(subject_id).await.unwrap(),
            Reservation::Reserved
        );
        unit.put(subject_id).await.unwrap();
        unit.commit().await.unwrap();
        drop(unit);

        assert_eq!(store.occupancy(subject_id).await.unwrap(), 1);
        assert_eq!(
            store.current_selection(key).await.unwrap(),
            Some(subject_id)
        );
    }

    #[tokio::test]
    async fn test_rollback_restores_state() {
        let (store, elective_id, subject_id) = setup(2);
        let key = SelectionKey::new(StudentId::new(), elective_id);

        let mut unit = store.begin(key).await.unwrap();
        unit.try_reserve(subject_id).await.unwrap();
        unit.put(subject_id).await.unwrap();
        unit.rollback().await.unwrap();
        drop(unit);

        assert_eq!(store.occupancy(subject_id).await.unwrap(), 0);
        assert_eq!(store.current_selection(key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_drop_without_commit_rolls_back() {
        let (store, elective_id, subject_id) = setup(1);
        let key = SelectionKey::new(StudentId::new(), elective_id);

        {
            let mut unit = store.begin(key).await.unwrap();
            unit.try_reserve(subject_id).await.unwrap();
        }

        assert_eq!(store.occupancy(subject_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reserve_reports_full() {
        let (store, elective_id, subject_id) = setup(1);

        let mut first = store
            .begin(SelectionKey::new(StudentId::new(), elective_id))
            .await
            .unwrap();
        first.try_reserve(subject_id).await.unwrap();
        first.put(subject_id).await.unwrap();
        first.commit().await.unwrap();
        drop(first);

        let mut second = store
            .begin(SelectionKey::new(StudentId::new(), elective_id))
            .await
            .unwrap();
        assert_eq!(
            second.try_reserve(subject_id).await.unwrap(),
            Reservation::Full { capacity: 1 }
        );
    }

    #[tokio::test]
    async fn test_put_requires_reservation() {
        let (store, elective_id, subject_id) = setup(1);
        let mut unit = store
            .begin(SelectionKey::new(StudentId::new(), elective_id))
            .await
            .unwrap();
        assert!(unit.put(subject_id).await.is_err());
    }

    #[tokio::test]
    async fn test_release_without_seat_fails() {
        let (store, elective_id, subject_id) = setup(1);
        let mut unit = store
            .begin(SelectionKey::new(StudentId::new(), elective_id))
            .await
            .unwrap();
        assert!(unit.release(subject_id).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let (store, elective_id, _) = setup(1);
        let mut unit = store
            .begin(SelectionKey::new(StudentId::new(), elective_id))
            .await
            .unwrap();
        assert_eq!(unit.remove().await.unwrap(), None);
        unit.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_reconcile_repairs_drift() {
        let (store, elective_id, subject_id) = setup(3);
        let key = SelectionKey::new(StudentId::new(), elective_id);

        let mut unit = store.begin(key).await.unwrap();
        unit.try_reserve(subject_id).await.unwrap();
        unit.put(subject_id).await.unwrap();
        unit.commit().await.unwrap();
        drop(unit);

        store.state.lock().await.occupancy.insert(subject_id, 3);

        let report = store.reconcile().await.unwrap();
        assert_eq!(
            report.drifted,
            vec![OccupancyDrift {
                subject_id,
                recorded: 3,
                counted: 1,
            }]
        );
        assert!(report.over_capacity.is_empty());
        assert_eq!(store.occupancy(subject_id).await.unwrap(), 1);

        let again = store.reconcile().await.unwrap();
        assert!(again.is_consistent());
    }
}
