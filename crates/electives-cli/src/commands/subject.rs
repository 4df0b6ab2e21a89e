//! Subject CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use electives_core::config::AppConfig;
use electives_core::error::AppError;
use electives_core::types::{ElectiveId, SubjectId, TeamId};
use electives_database::repositories::SubjectRepository;
use electives_entity::NewSubject;

/// Arguments for subject commands
#[derive(Debug, Args)]
pub struct SubjectArgs {
    /// Subject subcommand
    #[command(subcommand)]
    pub command: SubjectCommand,
}

/// Subject subcommands
#[derive(Debug, Subcommand)]
pub enum SubjectCommand {
    /// Create a subject in an elective
    Create {
        /// Elective ID
        elective: ElectiveId,
        /// Subject name
        name: String,
        /// Number of seats
        #[arg(long)]
        capacity: i32,
        /// Description
        #[arg(long)]
        description: Option<String>,
        /// Restrict the subject to members of this team
        #[arg(long)]
        team: Option<TeamId>,
    },
    /// List the subjects of an elective with occupancy
    List {
        /// Elective ID
        elective: ElectiveId,
    },
    /// Change a subject's capacity
    SetCapacity {
        /// Subject ID
        id: SubjectId,
        /// New number of seats; must cover current occupancy
        capacity: i32,
    },
}

/// Subject display row
#[derive(Debug, Serialize, Tabled)]
struct SubjectRow {
    /// Subject ID
    id: String,
    /// Name
    name: String,
    /// Team
    team: String,
    /// Capacity
    capacity: i32,
    /// Occupied
    occupied: i64,
    /// Remaining
    remaining: u32,
}

/// Execute subject commands
pub async fn execute(
    args: &SubjectArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let pool = super::create_db_pool(config).await?;
    let subjects = SubjectRepository::new(pool);

    match &args.command {
        SubjectCommand::Create {
            elective,
            name,
            capacity,
            description,
            team,
        } => {
            let subject = subjects
                .create(&NewSubject {
                    elective_id: *elective,
                    name: name.clone(),
                    description: description.clone(),
                    team_id: *team,
                    capacity: *capacity,
                })
                .await?;
            output::print_success(&format!(
                "Subject '{}' created with {} seats ({})",
                subject.name, subject.capacity, subject.id
            ));
        }
        SubjectCommand::List { elective } => {
            let listed = subjects.list_by_elective(*elective).await?;
            let occupancy = subjects.occupancy_by_elective(*elective).await?;

            let rows: Vec<SubjectRow> = listed
                .iter()
                .map(|subject| {
                    let occupied = occupancy
                        .iter()
                        .find(|o| o.subject_id == subject.id)
                        .map(|o| o.occupied)
                        .unwrap_or(0);
                    SubjectRow {
                        id: subject.id.to_string(),
                        name: subject.name.clone(),
                        team: output::or_dash(subject.team_id),
                        capacity: subject.capacity,
                        occupied,
                        remaining: u32::try_from(i64::from(subject.capacity) - occupied)
                            .unwrap_or(0),
                    }
                })
                .collect();
            output::print_list(&rows, format);
        }
        SubjectCommand::SetCapacity { id, capacity } => {
            let subject = subjects.update_capacity(*id, *capacity).await?;
            output::print_success(&format!(
                "Subject '{}' now has {} seats",
                subject.name, subject.capacity
            ));
        }
    }

    Ok(())
}
