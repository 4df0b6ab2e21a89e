//! Select and deselect commands.

use chrono::Utc;
use clap::Args;

use crate::output::{self, OutputFormat};
use electives_core::config::AppConfig;
use electives_core::error::AppError;
use electives_core::types::{ElectiveId, StudentId, SubjectId};
use electives_engine::{AllocationError, DeselectOutcome, SelectOutcome};

/// Arguments for the select command
#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Student ID
    pub student: StudentId,
    /// Elective ID
    pub elective: ElectiveId,
    /// Subject ID
    pub subject: SubjectId,
}

/// Arguments for the deselect command
#[derive(Debug, Args)]
pub struct DeselectArgs {
    /// Student ID
    pub student: StudentId,
    /// Elective ID
    pub elective: ElectiveId,
}

/// Execute the select command
pub async fn select(
    args: &SelectArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let allocation = super::create_allocation(config).await?;
    let context = allocation.coordinator.student_context(args.student).await?;

    let outcome = allocation
        .coordinator
        .select(&context, args.elective, args.subject, Utc::now())
        .await
        .map_err(|e| {
            if let AllocationError::SubjectFull { capacity, .. } = &e {
                output::print_warning(&format!("All {capacity} seats are taken"));
            }
            AppError::from(e)
        })?;

    if format == OutputFormat::Json {
        output::print_record(&outcome, &[], format);
        return Ok(());
    }

    match outcome {
        SelectOutcome::Enrolled => output::print_success(&format!(
            "Student {} enrolled in subject {}",
            args.student, args.subject
        )),
        SelectOutcome::Unchanged => output::print_success(&format!(
            "Student {} already holds subject {}",
            args.student, args.subject
        )),
        SelectOutcome::Switched { from } => output::print_success(&format!(
            "Student {} moved from subject {from} to subject {}",
            args.student, args.subject
        )),
    }
    Ok(())
}

/// Execute the deselect command
pub async fn deselect(
    args: &DeselectArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let allocation = super::create_allocation(config).await?;
    let outcome = allocation
        .coordinator
        .deselect(args.student, args.elective)
        .await?;

    if format == OutputFormat::Json {
        output::print_record(&outcome, &[], format);
        return Ok(());
    }

    match outcome {
        DeselectOutcome::Removed { subject } => output::print_success(&format!(
            "Student {} released subject {subject}",
            args.student
        )),
        DeselectOutcome::NothingSelected => output::print_warning(&format!(
            "Student {} had no selection in elective {}",
            args.student, args.elective
        )),
    }
    Ok(())
}
