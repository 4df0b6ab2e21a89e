//! Elective CLI commands.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use electives_core::config::AppConfig;
use electives_core::error::AppError;
use electives_core::types::{ElectiveId, StudentId, TeamId};
use electives_database::repositories::ElectiveRepository;
use electives_engine::window;
use electives_entity::{Elective, ElectiveWindow, NewElective};

/// Arguments for elective commands
#[derive(Debug, Args)]
pub struct ElectiveArgs {
    /// Elective subcommand
    #[command(subcommand)]
    pub command: ElectiveCommand,
}

/// Enrollment window bounds as RFC 3339 timestamps
#[derive(Debug, Clone, Args)]
pub struct WindowArgs {
    /// Enrollment opens at this instant
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,
    /// Enrollment closes after this instant
    #[arg(long)]
    pub end: Option<DateTime<Utc>>,
}

impl From<&WindowArgs> for ElectiveWindow {
    fn from(args: &WindowArgs) -> Self {
        Self {
            start_date: args.start,
            end_date: args.end,
        }
    }
}

/// Elective subcommands
#[derive(Debug, Subcommand)]
pub enum ElectiveCommand {
    /// Create an elective
    Create {
        /// Elective name
        name: String,
        /// Description
        #[arg(long)]
        description: Option<String>,
        /// Restrict the elective to members of this team
        #[arg(long)]
        team: Option<TeamId>,
        /// Enrollment window
        #[command(flatten)]
        window: WindowArgs,
    },
    /// List electives with their current window state
    List,
    /// Show one elective with subject availability as seen by a student
    Show {
        /// Elective ID
        id: ElectiveId,
        /// View as this student
        #[arg(long)]
        student: StudentId,
    },
    /// Replace the enrollment window
    SetWindow {
        /// Elective ID
        id: ElectiveId,
        /// New window; omitted bounds become unbounded
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Delete an elective with its subjects and selections
    Delete {
        /// Elective ID
        id: ElectiveId,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

/// Elective display row
#[derive(Debug, Serialize, Tabled)]
struct ElectiveRow {
    /// Elective ID
    id: String,
    /// Name
    name: String,
    /// Team
    team: String,
    /// Start
    start: String,
    /// End
    end: String,
    /// State
    state: String,
}

impl ElectiveRow {
    fn new(elective: &Elective, now: DateTime<Utc>) -> Self {
        Self {
            id: elective.id.to_string(),
            name: elective.name.clone(),
            team: output::or_dash(elective.team_id),
            start: output::or_dash(elective.start_date.map(|d| d.to_rfc3339())),
            end: output::or_dash(elective.end_date.map(|d| d.to_rfc3339())),
            state: window::state(&elective.window(), now).to_string(),
        }
    }
}

/// Subject availability row
#[derive(Debug, Serialize, Tabled)]
struct AvailabilityRow {
    /// Subject ID
    id: String,
    /// Name
    name: String,
    /// Capacity
    capacity: i32,
    /// Occupied
    occupied: i64,
    /// Remaining
    remaining: u32,
    /// Eligible
    eligible: String,
}

/// Execute elective commands
pub async fn execute(
    args: &ElectiveArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let now = Utc::now();

    match &args.command {
        ElectiveCommand::Create {
            name,
            description,
            team,
            window,
        } => {
            let electives = ElectiveRepository::new(super::create_db_pool(config).await?);
            let elective = electives
                .create(&NewElective {
                    name: name.clone(),
                    description: description.clone(),
                    team_id: *team,
                    window: window.into(),
                })
                .await?;
            output::print_success(&format!(
                "Elective '{}' created ({})",
                elective.name, elective.id
            ));
        }
        ElectiveCommand::List => {
            let electives = ElectiveRepository::new(super::create_db_pool(config).await?);
            let rows: Vec<ElectiveRow> = electives
                .list()
                .await?
                .iter()
                .map(|e| ElectiveRow::new(e, now))
                .collect();
            output::print_list(&rows, format);
        }
        ElectiveCommand::Show { id, student } => {
            let allocation = super::create_allocation(config).await?;
            let context = allocation.coordinator.student_context(*student).await?;
            let overview = allocation
                .catalog
                .elective_overview(&context, *id, now)
                .await?;

            if format == OutputFormat::Json {
                output::print_record(&overview, &[], format);
                return Ok(());
            }

            output::print_kv("ID", &overview.elective.id.to_string());
            output::print_kv("Name", &overview.elective.name);
            output::print_kv("Team", &output::or_dash(overview.elective.team_id));
            output::print_kv("Window state", overview.window_state.as_str());
            output::print_kv(
                "Next transition",
                &output::or_dash(overview.next_transition.map(|d| d.to_rfc3339())),
            );
            output::print_kv(
                "Current selection",
                &output::or_dash(overview.current_selection),
            );
            println!();

            let rows: Vec<AvailabilityRow> = overview
                .subjects
                .iter()
                .map(|a| AvailabilityRow {
                    id: a.subject.id.to_string(),
                    name: a.subject.name.clone(),
                    capacity: a.occupancy.capacity,
                    occupied: a.occupancy.occupied,
                    remaining: a.occupancy.remaining(),
                    eligible: match &a.ineligibility {
                        None => "yes".to_string(),
                        Some(reason) => format!("no ({reason})"),
                    },
                })
                .collect();
            output::print_list(&rows, format);
        }
        ElectiveCommand::SetWindow { id, window } => {
            let electives = ElectiveRepository::new(super::create_db_pool(config).await?);
            let elective = electives.update_window(*id, window.into()).await?;
            output::print_success(&format!(
                "Elective '{}' is now {}",
                elective.name,
                window::state(&elective.window(), now)
            ));
        }
        ElectiveCommand::Delete { id, force } => {
            let prompt = format!("Delete elective {id} with all its subjects and selections?");
            if !output::confirm(&prompt, *force)? {
                println!("Cancelled.");
                return Ok(());
            }

            let electives = ElectiveRepository::new(super::create_db_pool(config).await?);
            if electives.delete(*id).await? {
                output::print_success(&format!("Elective {id} deleted"));
            } else {
                output::print_warning(&format!("Elective {id} not found"));
            }
        }
    }

    Ok(())
}
