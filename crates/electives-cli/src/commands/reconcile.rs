//! Occupancy reconciliation command.

use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use electives_core::config::AppConfig;
use electives_core::error::AppError;

/// Over-capacity subject row
#[derive(Debug, Serialize, Tabled)]
struct OverCapacityRow {
    /// Subject ID
    subject: String,
    /// Capacity
    capacity: i32,
    /// Occupied
    occupied: i64,
}

/// Execute the reconcile command
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let allocation = super::create_allocation(config).await?;
    let report = allocation.reconciler.reconcile().await?;

    if format == OutputFormat::Json {
        output::print_record(&report, &[], format);
        return Ok(());
    }

    output::print_kv("Subjects checked", &report.subjects_checked.to_string());
    output::print_kv("Counters corrected", &report.drifted.len().to_string());

    if report.is_consistent() {
        output::print_success("Occupancy matches selections");
        return Ok(());
    }

    let rows: Vec<OverCapacityRow> = report
        .over_capacity
        .iter()
        .map(|o| OverCapacityRow {
            subject: o.subject_id.to_string(),
            capacity: o.capacity,
            occupied: o.occupied,
        })
        .collect();
    if !rows.is_empty() {
        output::print_warning("Subjects over capacity:");
        output::print_list(&rows, format);
    }
    Ok(())
}
