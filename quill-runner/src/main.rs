//! Quill Runner
//!
//! A stateless worker that turns queued generation jobs into documents.
//!
//! Architecture:
//! - Configuration: settings from environment or defaults
//! - Repositories: job store and task queue over the orchestrator API
//! - Scheduler: delivery polling with bounded parallelism
//!
//! Job state lives entirely in the orchestrator; any number of runners can
//! share one queue.

mod config;
mod repository;
mod scheduler;

use anyhow::{Context, Result};
use quill_client::OrchestratorClient;
use quill_jobs::{Worker, WorkerConfig};
use quill_pipeline::enrichment::HttpEnrichmentSource;
use quill_pipeline::{HttpProvider, StageOrchestrator};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::repository::{HttpJobStore, HttpTaskQueue};
use crate::scheduler::DeliveryPoller;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill_runner=info,quill_jobs=info,quill_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Quill Runner");

    let config = load_config()?;
    info!(
        "Loaded configuration: runner_id={}, orchestrator_url={}",
        config.runner_id, config.orchestrator_url
    );

    let client = Arc::new(OrchestratorClient::new(config.orchestrator_url.clone()));
    let store = Arc::new(HttpJobStore::new(client.clone()));
    let queue = Arc::new(HttpTaskQueue::new(client, config.runner_id.clone()));

    let provider =
        HttpProvider::new(config.provider.clone()).context("Failed to build generation provider")?;
    info!(
        "Generation provider: {} ({})",
        config.provider.base_url,
        provider.model()
    );

    let mut pipeline = StageOrchestrator::new(Arc::new(provider), config.pipeline.clone());
    if let Some(url) = &config.enrichment_url {
        let source = HttpEnrichmentSource::new("research", url.clone(), Duration::from_secs(10))
            .context("Failed to build enrichment source")?;
        pipeline = pipeline.with_enrichment(Arc::new(source));
        info!("Research enrichment enabled: {}", url);
    }
    let pipeline = Arc::new(pipeline);

    let worker = Arc::new(Worker::new(
        store,
        queue.clone(),
        pipeline,
        WorkerConfig {
            max_attempts: config.max_job_attempts,
            ..WorkerConfig::default()
        },
    ));

    let poller = DeliveryPoller::new(config, queue, worker);

    info!("Runner initialized successfully");

    if let Err(e) = poller.run().await {
        error!("Poller error: {:#}", e);
        return Err(e);
    }

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            info!("Failed to load config from environment ({}), using defaults", e);
            Config::default()
        }
    };

    config.validate()?;
    Ok(config)
}
