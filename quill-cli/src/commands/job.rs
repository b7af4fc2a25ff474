//! Job command handlers
//!
//! Submit, inspect, watch, cancel and list asynchronous jobs.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use quill_client::OrchestratorClient;
use quill_core::domain::job::JobStatus;
use quill_core::dto::job::{CreateJob, JobStatusView};
use std::time::Duration;
use uuid::Uuid;

use crate::commands::display::{
    colorize_status, print_document_summary, print_failure, print_job_summary, print_stage,
    print_status,
};
use crate::commands::request::RequestArgs;
use crate::config::Config;
use crate::id_resolver::resolve_job_id;
use crate::types::IdOrPrefix;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Submit a generation job
    Submit {
        #[command(flatten)]
        request: RequestArgs,

        /// Idempotency key; resubmitting the same id returns the existing job
        #[arg(long)]
        id: Option<Uuid>,

        /// Keep polling until the job finishes
        #[arg(short, long)]
        watch: bool,
    },
    /// Show status, stage progress and result
    Status {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Poll a job until it finishes
    Watch {
        /// Job ID or unambiguous prefix
        id: String,

        /// Seconds between polls
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },
    /// Cancel a job that has not finished
    Cancel {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// List jobs, newest first
    List {
        /// Only jobs in this status (e.g. Queued, Failed)
        #[arg(long)]
        status: Option<JobStatus>,
    },
}

/// Routes job subcommands to their respective handlers
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        JobCommands::Submit { request, id, watch } => {
            submit_job(&client, request, id, watch).await
        }
        JobCommands::Status { id } => get_status(&client, &id).await,
        JobCommands::Watch { id, interval } => {
            let uuid = resolve_job_id(&client, &IdOrPrefix::parse(&id)).await?;
            watch_job(&client, uuid, Duration::from_secs(interval.max(1))).await
        }
        JobCommands::Cancel { id } => cancel_job(&client, &id).await,
        JobCommands::List { status } => list_jobs(&client, status).await,
    }
}

async fn submit_job(
    client: &OrchestratorClient,
    request: RequestArgs,
    id: Option<Uuid>,
    watch: bool,
) -> Result<()> {
    let job = client
        .create_job(CreateJob {
            id,
            request: request.into(),
        })
        .await
        .context("Failed to submit job")?;

    println!("{} Job {} submitted", "✓".green(), job.id.to_string().cyan());
    println!("  Status: {}", colorize_status(job.status));

    if watch {
        println!();
        watch_job(client, job.id, Duration::from_secs(2)).await?;
    }

    Ok(())
}

async fn get_status(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let view = client.get_job_status(uuid).await?;

    print_status(&view);

    Ok(())
}

/// Polls until the job reaches a terminal state, printing stages as they
/// finish
async fn watch_job(client: &OrchestratorClient, id: Uuid, interval: Duration) -> Result<()> {
    println!("{} {}", "Watching job".bold(), id.to_string().cyan());

    let mut last_status = None;
    let mut printed_stages = 0;

    let view = loop {
        let view = client.get_job_status(id).await?;

        if last_status != Some(view.status) {
            println!("  Status: {}", colorize_status(view.status));
            last_status = Some(view.status);
        }

        for stage in &view.stages[printed_stages..] {
            print_stage(stage);
        }
        printed_stages = view.stages.len();

        if view.status.is_terminal() {
            break view;
        }

        tokio::time::sleep(interval).await;
    };

    finish_watch(&view)
}

fn finish_watch(view: &JobStatusView) -> Result<()> {
    println!();
    match view.status {
        JobStatus::Completed => {
            if let Some(document) = &view.document {
                print_document_summary(document);
            }
            Ok(())
        }
        JobStatus::Failed => {
            if let Some(error) = &view.error {
                print_failure(error);
            }
            bail!("Job {} failed", view.id)
        }
        JobStatus::Cancelled => {
            println!("{}", "Job was cancelled.".yellow());
            Ok(())
        }
        other => bail!("Job {} stopped watching in status {}", view.id, other),
    }
}

async fn cancel_job(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;

    let job = client.cancel_job(uuid).await.map_err(|e| {
        if e.is_conflict() {
            anyhow::anyhow!("Job {} can no longer be cancelled: {}", uuid, e)
        } else {
            e.into()
        }
    })?;

    println!(
        "{} Job {} is {}",
        "✓".green(),
        job.id.to_string().cyan(),
        colorize_status(job.status)
    );

    Ok(())
}

async fn list_jobs(client: &OrchestratorClient, status: Option<JobStatus>) -> Result<()> {
    let jobs = client.list_jobs(status).await?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}
