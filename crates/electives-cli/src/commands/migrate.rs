//! Database migration management commands.

use std::collections::HashSet;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use electives_core::config::AppConfig;
use electives_core::error::{AppError, ErrorKind};
use electives_database::migration::{MIGRATOR, run_migrations};

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Show which embedded migrations are applied
    Status,
}

/// Migration status row
#[derive(Debug, Serialize, Tabled)]
struct MigrationRow {
    /// Version
    version: i64,
    /// Description
    description: String,
    /// Applied
    applied: bool,
}

/// Execute migration commands
pub async fn execute(
    args: &MigrateArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let pool = super::create_db_pool(config).await?;

    match &args.command {
        MigrateCommand::Run => {
            run_migrations(&pool).await?;
            output::print_success("All migrations applied.");
        }
        MigrateCommand::Status => {
            let applied: HashSet<i64> = sqlx::query_scalar::<_, i64>(
                "SELECT version FROM _sqlx_migrations WHERE success = TRUE",
            )
            .fetch_all(&pool)
            .await
            .or_else(|e| {
                // Relation missing: nothing has been applied yet.
                let missing = e.as_database_error().and_then(|db| db.code()).as_deref()
                    == Some("42P01");
                if missing {
                    Ok(Vec::new())
                } else {
                    Err(AppError::with_source(
                        ErrorKind::Database,
                        "Failed to read migration history",
                        e,
                    ))
                }
            })?
            .into_iter()
            .collect();

            let rows: Vec<MigrationRow> = MIGRATOR
                .iter()
                .map(|m| MigrationRow {
                    version: m.version,
                    description: m.description.to_string(),
                    applied: applied.contains(&m.version),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
