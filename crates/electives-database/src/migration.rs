//! Database migration runner.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use electives_core::error::{AppError, ErrorKind};
use electives_core::result::AppResult;

/// Schema migrations embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Run all pending database migrations.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    info!(
        available = MIGRATOR.iter().count(),
        "Running database migrations"
    );

    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Failed to run migrations: {e}"),
            e,
        )
    })?;

    info!("Database migrations completed");
    Ok(())
}

/// Versions of the embedded migrations, in order.
pub fn embedded_versions() -> Vec<i64> {
    MIGRATOR.iter().map(|m| m.version).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_embedded_in_order() {
        let versions = embedded_versions();
        assert!(!versions.is_empty());
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }
}
