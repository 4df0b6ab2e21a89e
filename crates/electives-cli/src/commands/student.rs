//! Student CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use electives_core::config::AppConfig;
use electives_core::error::AppError;
use electives_core::types::StudentId;
use electives_database::repositories::{StudentRepository, TeamRepository};
use electives_entity::{NewStudent, Student};

/// Arguments for student commands
#[derive(Debug, Args)]
pub struct StudentArgs {
    /// Student subcommand
    #[command(subcommand)]
    pub command: StudentCommand,
}

/// Student subcommands
#[derive(Debug, Subcommand)]
pub enum StudentCommand {
    /// Create a student
    Create {
        /// Unique username
        username: String,
        /// Display name
        #[arg(long)]
        display_name: Option<String>,
    },
    /// List students
    List {
        /// Maximum number of rows
        #[arg(long, default_value_t = 50)]
        limit: i64,
        /// Rows to skip
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Show one student with their teams
    Show {
        /// Student ID
        id: StudentId,
    },
}

/// Student display row
#[derive(Debug, Serialize, Tabled)]
pub(crate) struct StudentRow {
    /// Student ID
    id: String,
    /// Username
    username: String,
    /// Display name
    display_name: String,
}

impl From<&Student> for StudentRow {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id.to_string(),
            username: student.username.clone(),
            display_name: output::or_dash(student.display_name.as_deref()),
        }
    }
}

/// Execute student commands
pub async fn execute(
    args: &StudentArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let pool = super::create_db_pool(config).await?;
    let students = StudentRepository::new(pool.clone());

    match &args.command {
        StudentCommand::Create {
            username,
            display_name,
        } => {
            let student = students
                .create(&NewStudent {
                    username: username.clone(),
                    display_name: display_name.clone(),
                })
                .await?;
            output::print_success(&format!(
                "Student '{}' created ({})",
                student.username, student.id
            ));
        }
        StudentCommand::List { limit, offset } => {
            let rows: Vec<StudentRow> = students
                .list(*limit, *offset)
                .await?
                .iter()
                .map(StudentRow::from)
                .collect();
            output::print_list(&rows, format);
        }
        StudentCommand::Show { id } => {
            let student = students
                .find_by_id(*id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Student {id} not found")))?;
            let mut teams: Vec<String> = TeamRepository::new(pool)
                .teams_of_student(*id)
                .await?
                .iter()
                .map(ToString::to_string)
                .collect();
            teams.sort();

            output::print_record(
                &student,
                &[
                    ("ID", student.id.to_string()),
                    ("Username", student.username.clone()),
                    ("Display name", output::or_dash(student.display_name.as_deref())),
                    ("Teams", if teams.is_empty() { "-".to_string() } else { teams.join(", ") }),
                    ("Created", student.created_at.to_rfc3339()),
                ],
                format,
            );
        }
    }

    Ok(())
}
