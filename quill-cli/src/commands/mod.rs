//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod display;
mod generate;
mod job;
mod request;

pub use generate::GenerateArgs;
pub use job::JobCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Asynchronous generation jobs
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Generate a document and wait for it, without creating a job
    Generate(GenerateArgs),
}

/// Routes the command to the appropriate handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::Generate(args) => generate::handle_generate(args, config).await,
    }
}
