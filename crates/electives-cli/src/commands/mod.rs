//! CLI command definitions and dispatch.

pub mod allocate;
pub mod config;
pub mod elective;
pub mod migrate;
pub mod reconcile;
pub mod selection;
pub mod student;
pub mod subject;
pub mod team;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing::debug;

use crate::output::OutputFormat;
use electives_core::config::{AppConfig, StorageBackend};
use electives_core::error::AppError;
use electives_database::{DatabasePool, PgAllocationStore, PgCatalog};
use electives_engine::{AllocationCoordinator, CatalogService, OccupancyReconciler};

/// Electives: enrollment administration and allocation
#[derive(Debug, Parser)]
#[command(name = "electives", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Team and membership management
    Team(team::TeamArgs),
    /// Student management
    Student(student::StudentArgs),
    /// Elective management
    Elective(elective::ElectiveArgs),
    /// Subject management
    Subject(subject::SubjectArgs),
    /// Select a subject of an elective for a student
    Select(allocate::SelectArgs),
    /// Remove a student's selection in an elective
    Deselect(allocate::DeselectArgs),
    /// Inspect selections
    Selection(selection::SelectionArgs),
    /// Recount occupancy and report inconsistencies
    Reconcile,
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config, self.format).await,
            Commands::Team(args) => team::execute(args, &config, self.format).await,
            Commands::Student(args) => student::execute(args, &config, self.format).await,
            Commands::Elective(args) => elective::execute(args, &config, self.format).await,
            Commands::Subject(args) => subject::execute(args, &config, self.format).await,
            Commands::Select(args) => allocate::select(args, &config, self.format).await,
            Commands::Deselect(args) => allocate::deselect(args, &config, self.format).await,
            Commands::Selection(args) => selection::execute(args, &config, self.format).await,
            Commands::Reconcile => reconcile::execute(&config, self.format).await,
            Commands::Config(args) => config::execute(args, &config, &self.config, self.format),
        }
    }
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<PgPool, AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    Ok(pool.pool().clone())
}

/// Allocation services wired to the configured backend.
pub struct Allocation {
    /// The select/deselect coordinator.
    pub coordinator: AllocationCoordinator,
    /// Read-only views.
    pub catalog: CatalogService,
    /// Occupancy recount.
    pub reconciler: OccupancyReconciler,
}

/// Helper: build the allocation services.
///
/// Every CLI invocation is a fresh process, so only the PostgreSQL backend
/// carries selections between commands.
pub async fn create_allocation(config: &AppConfig) -> Result<Allocation, AppError> {
    if config.allocation.backend == StorageBackend::Memory {
        return Err(AppError::configuration(
            "allocation.backend = \"memory\" keeps selections in-process; \
             CLI allocation commands require the postgres backend",
        ));
    }

    let pool = create_db_pool(config).await?;
    let catalog = Arc::new(PgCatalog::new(pool.clone()));
    let store = Arc::new(PgAllocationStore::new(pool));
    let reconciler = OccupancyReconciler::new(store.clone());

    if config.allocation.reconcile_on_startup {
        reconciler.startup_recovery().await?;
    }

    debug!(
        retries = config.allocation.storage_retry_attempts,
        backoff_ms = config.allocation.retry_backoff_ms,
        "Allocation services ready"
    );
    Ok(Allocation {
        coordinator: AllocationCoordinator::new(
            catalog.clone(),
            store.clone(),
            config.allocation.clone(),
        ),
        catalog: CatalogService::new(catalog, store),
        reconciler,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use electives_core::error::ErrorKind;

    #[tokio::test]
    async fn test_memory_backend_is_refused_before_connecting() {
        let mut config = AppConfig::default();
        config.allocation.backend = StorageBackend::Memory;
        config.database.url = "postgres://nobody@unreachable.invalid/electives".to_string();

        let Err(err) = create_allocation(&config).await else {
            panic!("memory backend must be refused");
        };
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message.contains("postgres backend"));
    }
}
