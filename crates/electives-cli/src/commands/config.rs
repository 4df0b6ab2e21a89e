//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use electives_core::config::AppConfig;
use electives_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
}

/// Execute config commands
pub fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let backend = serde_json::to_value(config.allocation.backend)?;
            output::print_record(
                config,
                &[
                    ("Config file", config_path.to_string()),
                    ("Database", mask_password(&config.database.url)),
                    (
                        "Pool",
                        format!(
                            "{}..{} connections",
                            config.database.min_connections, config.database.max_connections
                        ),
                    ),
                    ("Backend", backend.as_str().unwrap_or_default().to_string()),
                    (
                        "Storage retries",
                        format!(
                            "{} (backoff {} ms)",
                            config.allocation.storage_retry_attempts,
                            config.allocation.retry_backoff_ms
                        ),
                    ),
                    (
                        "Reconcile on startup",
                        config.allocation.reconcile_on_startup.to_string(),
                    ),
                    (
                        "Logging",
                        format!("{} ({})", config.logging.level, config.logging.format),
                    ),
                ],
                format,
            );
        }
    }

    Ok(())
}

/// Mask password in database URL for display
fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                let mut masked = url[..colon_pos + 1].to_string();
                masked.push_str("****");
                masked.push_str(&url[at_pos..]);
                return masked;
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("postgres://app:hunter2@db:5432/electives"),
            "postgres://app:****@db:5432/electives"
        );
        assert_eq!(mask_password("postgres://db/electives"), "postgres://db/electives");
    }
}
