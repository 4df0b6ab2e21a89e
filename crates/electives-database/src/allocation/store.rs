//! Transactional allocation store over PostgreSQL.
//!
//! A unit of work is one database transaction. It first takes a
//! transaction-scoped advisory lock on its (student, elective) pair, then
//! locks at most one subject row with `FOR UPDATE` when reserving a seat.
//! Locks are always taken in that order and released at commit or rollback.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, info};

use electives_core::error::{AppError, ErrorKind};
use electives_core::result::AppResult;
use electives_core::types::{SelectionKey, StudentId, SubjectId};
use electives_engine::{
    AllocationStore, CapacityLedger, ReconcileReport, Reservation, SelectionStore, UnitOfWork,
};
use electives_entity::{Selection, SubjectOccupancy};

use crate::repositories::{SelectionRepository, write_error};

/// Allocation store over PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgAllocationStore {
    pool: PgPool,
    selections: SelectionRepository,
}

impl PgAllocationStore {
    /// Creates a store sharing `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self {
            selections: SelectionRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl AllocationStore for PgAllocationStore {
    async fn begin(&self, key: SelectionKey) -> AppResult<Box<dyn UnitOfWork>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(key.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to lock selection key", e)
            })?;

        debug!(key = %key, "Unit of work started");
        Ok(Box::new(PgUnitOfWork {
            key,
            tx: Some(tx),
            reserved: HashSet::new(),
        }))
    }

    async fn current_selection(&self, key: SelectionKey) -> AppResult<Option<SubjectId>> {
        Ok(self.selections.find(key).await?.map(|s| s.subject_id))
    }

    async fn occupancy(&self, subject_id: SubjectId) -> AppResult<u32> {
        self.selections.count_by_subject(subject_id).await
    }

    async fn selections_for_student(&self, student_id: StudentId) -> AppResult<Vec<Selection>> {
        self.selections.list_by_student(student_id).await
    }

    async fn reconcile(&self) -> AppResult<ReconcileReport> {
        let subjects_checked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subjects")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count subjects", e)
            })?;

        let over_capacity = sqlx::query_as::<_, SubjectOccupancy>(
            "SELECT s.id AS subject_id, s.capacity, COUNT(sel.student_id) AS occupied \
             FROM subjects s JOIN selections sel ON sel.subject_id = s.id \
             GROUP BY s.id, s.capacity \
             HAVING COUNT(sel.student_id) > s.capacity",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check subject occupancy", e)
        })?;

        for occupancy in &over_capacity {
            error!(
                subject_id = %occupancy.subject_id,
                capacity = occupancy.capacity,
                occupied = occupancy.occupied,
                "Subject over capacity"
            );
        }

        info!(
            subjects_checked,
            over_capacity = over_capacity.len(),
            "Occupancy recount finished"
        );
        Ok(ReconcileReport {
            subjects_checked: usize::try_from(subjects_checked).unwrap_or(usize::MAX),
            drifted: Vec::new(),
            over_capacity,
        })
    }
}

/// One allocation transaction, bound to a (student, elective) pair.
///
/// Dropping it without commit rolls the transaction back.
pub struct PgUnitOfWork {
    key: SelectionKey,
    tx: Option<Transaction<'static, Postgres>>,
    /// Subjects with a seat held by this transaction.
    reserved: HashSet<SubjectId>,
}

impl PgUnitOfWork {
    fn tx(&mut self) -> AppResult<&mut Transaction<'static, Postgres>> {
        let key = self.key;
        self.tx.as_mut().ok_or_else(|| finished(key))
    }
}

fn finished(key: SelectionKey) -> AppError {
    AppError::internal(format!("Unit of work for {key} already finished"))
}

#[async_trait]
impl CapacityLedger for PgUnitOfWork {
    async fn try_reserve(&mut self, subject_id: SubjectId) -> AppResult<Reservation> {
        let tx = self.tx()?;

        let capacity: i32 =
            sqlx::query_scalar("SELECT capacity FROM subjects WHERE id = $1 FOR UPDATE")
                .bind(subject_id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to lock subject", e)
                })?
                .ok_or_else(|| AppError::not_found(format!("Subject {subject_id} not found")))?;

        let occupied: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM selections WHERE subject_id = $1")
                .bind(subject_id)
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count selections", e)
                })?;

        if occupied >= i64::from(capacity) {
            debug!(subject_id = %subject_id, capacity, occupied, "Subject full");
            return Ok(Reservation::Full {
                capacity: u32::try_from(capacity).unwrap_or(0),
            });
        }

        self.reserved.insert(subject_id);
        Ok(Reservation::Reserved)
    }

    async fn release(&mut self, subject_id: SubjectId) -> AppResult<()> {
        // Occupancy follows the selection rows, so the seat is already free
        // once the row moved or was deleted.
        self.tx()?;
        debug!(key = %self.key, subject_id = %subject_id, "Seat released");
        Ok(())
    }
}

#[async_trait]
impl SelectionStore for PgUnitOfWork {
    fn key(&self) -> SelectionKey {
        self.key
    }

    async fn get(&mut self) -> AppResult<Option<SubjectId>> {
        let key = self.key;
        let tx = self.tx()?;
        sqlx::query_scalar(
            "SELECT subject_id FROM selections WHERE student_id = $1 AND elective_id = $2",
        )
        .bind(key.student_id)
        .bind(key.elective_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read selection", e))
    }

    async fn put(&mut self, subject_id: SubjectId) -> AppResult<()> {
        if !self.reserved.contains(&subject_id) {
            return Err(AppError::internal(format!(
                "No seat reserved in subject {subject_id} for {}",
                self.key
            )));
        }

        let key = self.key;
        let tx = self.tx()?;
        sqlx::query(
            "INSERT INTO selections (student_id, elective_id, subject_id, selected_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (student_id, elective_id) \
             DO UPDATE SET subject_id = EXCLUDED.subject_id, selected_at = EXCLUDED.selected_at",
        )
        .bind(key.student_id)
        .bind(key.elective_id)
        .bind(subject_id)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await
        .map_err(|e| write_error("Failed to write selection", e))?;
        Ok(())
    }

    async fn remove(&mut self) -> AppResult<Option<SubjectId>> {
        let key = self.key;
        let tx = self.tx()?;
        sqlx::query_scalar(
            "DELETE FROM selections WHERE student_id = $1 AND elective_id = $2 \
             RETURNING subject_id",
        )
        .bind(key.student_id)
        .bind(key.elective_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete selection", e))
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(&mut self) -> AppResult<()> {
        let tx = self.tx.take().ok_or_else(|| finished(self.key))?;
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit selection", e)
        })?;
        debug!(key = %self.key, "Unit of work committed");
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        tx.rollback().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to roll back selection", e)
        })?;
        debug!(key = %self.key, "Unit of work rolled back");
        Ok(())
    }
}
