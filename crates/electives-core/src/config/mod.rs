//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod allocation;
pub mod database;
pub mod logging;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::allocation::{AllocationConfig, StorageBackend};
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// configuration sources (base file + environment overlay + `ELECTIVES__*`
/// variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Allocation engine settings.
    #[serde(default)]
    #[validate(nested)]
    pub allocation: AllocationConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// The file at `path` is merged with an optional `config/{env}` overlay,
    /// where `env` comes from `ELECTIVES_ENV`, and environment variables
    /// prefixed with `ELECTIVES__` (for example
    /// `ELECTIVES__ALLOCATION__BACKEND=memory`).
    pub fn load(path: &str) -> Result<Self, AppError> {
        let env = std::env::var("ELECTIVES_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("ELECTIVES")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }
}
