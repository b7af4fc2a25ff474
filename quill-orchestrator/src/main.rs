use quill_pipeline::enrichment::HttpEnrichmentSource;
use quill_pipeline::{HttpProvider, StageOrchestrator};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod state;

use crate::config::Config;
use crate::repository::{PgJobStore, PgTaskQueue};
use crate::state::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Quill Orchestrator...");

    let config = Config::from_env().expect("Failed to load configuration");

    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Database connection pool created");

    // Run migrations
    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // Pipeline used by the synchronous endpoint
    let provider = HttpProvider::new(config.provider.clone()).expect("Failed to build provider");
    tracing::info!("Generation provider: {} ({})", config.provider.base_url, provider.model());

    let mut pipeline = StageOrchestrator::new(Arc::new(provider), config.pipeline.clone());
    if let Some(url) = &config.enrichment_url {
        let source = HttpEnrichmentSource::new("research", url.clone(), Duration::from_secs(10))
            .expect("Failed to build enrichment source");
        pipeline = pipeline.with_enrichment(Arc::new(source));
        tracing::info!("Research enrichment enabled: {}", url);
    }

    let state = AppState::new(
        Arc::new(PgJobStore::new(pool.clone())),
        Arc::new(PgTaskQueue::new(pool, config.queue_lease)),
        Arc::new(pipeline),
    );

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
