//! Allocation engine configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Which storage backend holds selections and occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local state; lost on restart. Single node only.
    ///
    /// For services that embed the engine and construct
    /// `MemoryAllocationStore` themselves. The `electives` CLI runs one
    /// command per process and refuses this backend for allocation commands.
    Memory,
    /// PostgreSQL transactions with row-level locking.
    #[default]
    Postgres,
}

/// Allocation coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AllocationConfig {
    /// Storage backend for the allocation state.
    #[serde(default)]
    pub backend: StorageBackend,
    /// How many times a unit of work is retried after a storage failure.
    #[serde(default = "default_storage_retry_attempts")]
    #[validate(range(min = 0, max = 10))]
    pub storage_retry_attempts: u32,
    /// Base delay between retries in milliseconds (multiplied by attempt).
    #[serde(default = "default_retry_backoff_ms")]
    #[validate(range(max = 5000))]
    pub retry_backoff_ms: u64,
    /// Whether occupancy is reconciled against selections on startup.
    #[serde(default = "default_true")]
    pub reconcile_on_startup: bool,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            storage_retry_attempts: default_storage_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            reconcile_on_startup: default_true(),
        }
    }
}

fn default_storage_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    25
}

fn default_true() -> bool {
    true
}
