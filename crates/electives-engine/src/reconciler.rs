//! Occupancy reconciliation between cached counters and selections.
//!
//! Occupancy is always reconstructable by counting selections. The
//! reconciler asks the store to recount, repairs cached counters, and
//! reports subjects that ended up over capacity.

use std::sync::Arc;

use tracing::{error, info, warn};

use electives_core::result::AppResult;

use crate::store::{AllocationStore, ReconcileReport};

/// Reconciles the allocation store's occupancy with its selections.
#[derive(Debug, Clone)]
pub struct OccupancyReconciler {
    /// Store to reconcile.
    store: Arc<dyn AllocationStore>,
}

impl OccupancyReconciler {
    /// Creates a new occupancy reconciler.
    pub fn new(store: Arc<dyn AllocationStore>) -> Self {
        Self { store }
    }

    /// Performs a full reconciliation pass and logs what it found.
    pub async fn reconcile(&self) -> AppResult<ReconcileReport> {
        let report = self.store.reconcile().await?;

        if !report.drifted.is_empty() {
            warn!(
                drifted = report.drifted.len(),
                subjects_checked = report.subjects_checked,
                "Occupancy drift corrected"
            );
        }

        for over in &report.over_capacity {
            error!(
                subject_id = %over.subject_id,
                capacity = over.capacity,
                occupied = over.occupied,
                "Subject holds more selections than its capacity"
            );
        }

        Ok(report)
    }

    /// Reconcile once during startup to recover from a crash.
    pub async fn startup_recovery(&self) -> AppResult<()> {
        info!("Running startup occupancy recovery");

        let report = self.reconcile().await?;

        if report.is_consistent() {
            info!(
                subjects_checked = report.subjects_checked,
                "Startup recovery: occupancy is consistent"
            );
        } else {
            info!(
                drifted = report.drifted.len(),
                over_capacity = report.over_capacity.len(),
                "Startup recovery finished with corrections"
            );
        }

        Ok(())
    }
}
