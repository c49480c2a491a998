//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod chat;
mod job;
mod org;
mod schedule;

pub use job::JobCommands;
pub use org::OrgCommands;
pub use schedule::ScheduleCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Report jobs
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Ask the agent a question
    Chat {
        /// The message to send
        message: String,
    },
    /// Organization management
    Org {
        #[command(subcommand)]
        command: OrgCommands,
    },
    /// Scheduled reports
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommands,
    },
}

/// Routes the command to the appropriate handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::Chat { message } => chat::handle_chat(message, config).await,
        Commands::Org { command } => org::handle_org_command(command, config).await,
        Commands::Schedule { command } => schedule::handle_schedule_command(command, config).await,
    }
}
