//! Team and membership CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use electives_core::config::AppConfig;
use electives_core::error::AppError;
use electives_core::types::{StudentId, TeamId};
use electives_database::repositories::TeamRepository;
use electives_entity::{NewTeam, Team};

/// Arguments for team commands
#[derive(Debug, Args)]
pub struct TeamArgs {
    /// Team subcommand
    #[command(subcommand)]
    pub command: TeamCommand,
}

/// Team subcommands
#[derive(Debug, Subcommand)]
pub enum TeamCommand {
    /// Create a team
    Create {
        /// Team name
        name: String,
    },
    /// List teams
    List,
    /// List the members of a team
    Members {
        /// Team ID
        team: TeamId,
    },
    /// Add a student to a team
    AddMember {
        /// Team ID
        team: TeamId,
        /// Student ID
        student: StudentId,
    },
    /// Remove a student from a team
    RemoveMember {
        /// Team ID
        team: TeamId,
        /// Student ID
        student: StudentId,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

/// Team display row
#[derive(Debug, Serialize, Tabled)]
pub(crate) struct TeamRow {
    /// Team ID
    id: String,
    /// Name
    name: String,
    /// Created
    created: String,
}

impl From<&Team> for TeamRow {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id.to_string(),
            name: team.name.clone(),
            created: team.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute team commands
pub async fn execute(
    args: &TeamArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let pool = super::create_db_pool(config).await?;
    let teams = TeamRepository::new(pool);

    match &args.command {
        TeamCommand::Create { name } => {
            let team = teams.create(&NewTeam { name: name.clone() }).await?;
            output::print_success(&format!("Team '{}' created ({})", team.name, team.id));
        }
        TeamCommand::List => {
            let rows: Vec<TeamRow> = teams.list().await?.iter().map(TeamRow::from).collect();
            output::print_list(&rows, format);
        }
        TeamCommand::Members { team } => {
            let rows: Vec<super::student::StudentRow> = teams
                .members(*team)
                .await?
                .iter()
                .map(super::student::StudentRow::from)
                .collect();
            output::print_list(&rows, format);
        }
        TeamCommand::AddMember { team, student } => {
            teams.add_member(*team, *student).await?;
            output::print_success(&format!("Student {student} added to team {team}"));
        }
        TeamCommand::RemoveMember {
            team,
            student,
            force,
        } => {
            let prompt = format!(
                "Remove student {student} from team {team}? Existing selections are kept."
            );
            if !output::confirm(&prompt, *force)? {
                println!("Cancelled.");
                return Ok(());
            }

            if teams.remove_member(*team, *student).await? {
                output::print_success(&format!("Student {student} removed from team {team}"));
            } else {
                output::print_warning(&format!("Student {student} was not in team {team}"));
            }
        }
    }

    Ok(())
}
