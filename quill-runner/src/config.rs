//! Runner configuration
//!
//! Polling, parallelism, retry budget, generation provider and pipeline
//! settings.

use quill_pipeline::{PipelineConfig, ProviderSettings};
use std::time::Duration;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Unique identifier for this runner instance
    pub runner_id: String,

    /// Orchestrator base URL (e.g., "http://localhost:8080")
    pub orchestrator_url: String,

    /// How often to lease new deliveries
    pub poll_interval: Duration,

    /// Max jobs processed at the same time
    pub max_parallel_jobs: usize,

    /// Claims per job before a transient failure becomes terminal
    pub max_job_attempts: u32,

    pub provider: ProviderSettings,

    /// Optional research enrichment service
    pub enrichment_url: Option<String>,

    pub pipeline: PipelineConfig,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(runner_id: String, orchestrator_url: String) -> Self {
        Self {
            runner_id,
            orchestrator_url,
            poll_interval: Duration::from_secs(5),
            max_parallel_jobs: 2,
            max_job_attempts: 3,
            provider: ProviderSettings {
                base_url: "http://localhost:11434/v1".to_string(),
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                timeout: Duration::from_secs(120),
            },
            enrichment_url: None,
            pipeline: PipelineConfig::default(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - RUNNER_ID (required)
    /// - ORCHESTRATOR_URL (required)
    /// - POLL_INTERVAL (optional, seconds, default: 5)
    /// - MAX_PARALLEL_JOBS (optional, default: 2)
    /// - MAX_JOB_ATTEMPTS (optional, default: 3)
    /// - PROVIDER_URL (optional, default: local OpenAI-compatible server)
    /// - PROVIDER_API_KEY (optional)
    /// - PROVIDER_MODEL (optional, default: gpt-4o-mini)
    /// - PROVIDER_TIMEOUT (optional, seconds, default: 120)
    /// - ENRICHMENT_URL (optional)
    pub fn from_env() -> anyhow::Result<Self> {
        let runner_id = std::env::var("RUNNER_ID")
            .map_err(|_| anyhow::anyhow!("RUNNER_ID environment variable not set"))?;

        let orchestrator_url = std::env::var("ORCHESTRATOR_URL")
            .map_err(|_| anyhow::anyhow!("ORCHESTRATOR_URL environment variable not set"))?;

        let mut config = Self::new(runner_id, orchestrator_url);

        if let Some(secs) = parse_var::<u64>("POLL_INTERVAL") {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(n) = parse_var("MAX_PARALLEL_JOBS") {
            config.max_parallel_jobs = n;
        }
        if let Some(n) = parse_var("MAX_JOB_ATTEMPTS") {
            config.max_job_attempts = n;
        }
        if let Ok(url) = std::env::var("PROVIDER_URL") {
            config.provider.base_url = url;
        }
        config.provider.api_key = std::env::var("PROVIDER_API_KEY").ok();
        if let Ok(model) = std::env::var("PROVIDER_MODEL") {
            config.provider.model = model;
        }
        if let Some(secs) = parse_var::<u64>("PROVIDER_TIMEOUT") {
            config.provider.timeout = Duration::from_secs(secs);
        }
        config.enrichment_url = std::env::var("ENRICHMENT_URL").ok();

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.runner_id.is_empty() {
            anyhow::bail!("runner_id cannot be empty");
        }

        for (name, url) in [
            ("orchestrator_url", &self.orchestrator_url),
            ("provider url", &self.provider.base_url),
        ]
        .into_iter()
        .chain(self.enrichment_url.iter().map(|url| ("enrichment_url", url)))
        {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.max_parallel_jobs == 0 {
            anyhow::bail!("max_parallel_jobs must be greater than 0");
        }

        if self.max_job_attempts == 0 {
            anyhow::bail!("max_job_attempts must be greater than 0");
        }

        self.pipeline.validate().map_err(anyhow::Error::msg)?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            "http://localhost:8080".to_string(),
        )
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
