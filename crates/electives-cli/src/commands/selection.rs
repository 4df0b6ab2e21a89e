//! Selection inspection commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use electives_core::config::AppConfig;
use electives_core::error::AppError;
use electives_core::types::{ElectiveId, StudentId, SubjectId};
use electives_database::repositories::SelectionRepository;
use electives_entity::Selection;

/// Arguments for selection commands
#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Selection subcommand
    #[command(subcommand)]
    pub command: SelectionCommand,
}

/// Selection subcommands
#[derive(Debug, Subcommand)]
pub enum SelectionCommand {
    /// Show a student's selection in one elective
    Show {
        /// Student ID
        student: StudentId,
        /// Elective ID
        elective: ElectiveId,
    },
    /// List a student's selections
    List {
        /// Student ID
        student: StudentId,
    },
    /// List the students holding a subject
    Holders {
        /// Subject ID
        subject: SubjectId,
    },
}

/// Selection display row
#[derive(Debug, Serialize, Tabled)]
struct SelectionRow {
    /// Student ID
    student: String,
    /// Elective ID
    elective: String,
    /// Subject ID
    subject: String,
    /// Selected at
    selected_at: String,
}

impl From<&Selection> for SelectionRow {
    fn from(selection: &Selection) -> Self {
        Self {
            student: selection.student_id.to_string(),
            elective: selection.elective_id.to_string(),
            subject: selection.subject_id.to_string(),
            selected_at: selection.selected_at.to_rfc3339(),
        }
    }
}

/// Execute selection commands
pub async fn execute(
    args: &SelectionArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        SelectionCommand::Show { student, elective } => {
            let allocation = super::create_allocation(config).await?;
            let subject = allocation
                .coordinator
                .current_selection(*student, *elective)
                .await?;
            match subject {
                Some(subject) => output::print_record(
                    &subject,
                    &[
                        ("Student", student.to_string()),
                        ("Elective", elective.to_string()),
                        ("Subject", subject.to_string()),
                    ],
                    format,
                ),
                None => output::print_warning(&format!(
                    "Student {student} has no selection in elective {elective}"
                )),
            }
        }
        SelectionCommand::List { student } => {
            let allocation = super::create_allocation(config).await?;
            let rows: Vec<SelectionRow> = allocation
                .catalog
                .student_selections(*student)
                .await?
                .iter()
                .map(SelectionRow::from)
                .collect();
            output::print_list(&rows, format);
        }
        SelectionCommand::Holders { subject } => {
            let selections = SelectionRepository::new(super::create_db_pool(config).await?);
            let rows: Vec<SelectionRow> = selections
                .list_by_subject(*subject)
                .await?
                .iter()
                .map(SelectionRow::from)
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
