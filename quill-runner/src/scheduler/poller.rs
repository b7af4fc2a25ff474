//! Delivery poller
//!
//! Leases at most as many deliveries as there are free slots, runs
//! `handle_delivery` for each in its own task and acknowledges the
//! delivery once the outcome is recorded.

use anyhow::{Context, Result};
use quill_core::dto::queue::Delivery;
use quill_jobs::{DeliverySource, Worker};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::config::Config;

pub struct DeliveryPoller {
    config: Config,
    deliveries: Arc<dyn DeliverySource>,
    worker: Arc<Worker>,
    semaphore: Arc<Semaphore>,
}

impl DeliveryPoller {
    pub fn new(config: Config, deliveries: Arc<dyn DeliverySource>, worker: Arc<Worker>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallel_jobs));
        Self {
            config,
            deliveries,
            worker,
            semaphore,
        }
    }

    /// Starts the polling loop
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting delivery poller (interval: {:?}, parallel jobs: {})",
            self.config.poll_interval, self.config.max_parallel_jobs
        );

        let mut interval = time::interval(self.config.poll_interval);

        loop {
            interval.tick().await;

            match self.poll_once().await {
                Ok(handled) => {
                    if handled > 0 {
                        info!("Handled {} deliveries this cycle", handled);
                    }
                }
                Err(e) => {
                    error!("Error during poll cycle: {:#}", e);
                }
            }
        }
    }

    /// Performs a single poll cycle and waits for its deliveries
    pub async fn poll_once(&self) -> Result<usize> {
        let free = self.semaphore.available_permits();
        if free == 0 {
            debug!("All job slots busy");
            return Ok(0);
        }

        let deliveries = self
            .deliveries
            .lease(free)
            .await
            .context("Failed to lease deliveries")?;

        if deliveries.is_empty() {
            debug!("No deliveries available");
            return Ok(0);
        }

        let mut handles = Vec::new();

        for delivery in deliveries {
            // The lease expires and the delivery comes back if no slot is free
            match self.semaphore.clone().try_acquire_owned() {
                Ok(permit) => handles.push(self.spawn_delivery_task(delivery, permit)),
                Err(_) => debug!("No free slot for delivery {}", delivery.id),
            }
        }

        let handled = handles.len();

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Delivery task panicked: {}", e);
            }
        }

        Ok(handled)
    }

    fn spawn_delivery_task(
        &self,
        delivery: Delivery,
        _permit: OwnedSemaphorePermit,
    ) -> tokio::task::JoinHandle<()> {
        let worker = Arc::clone(&self.worker);
        let deliveries = Arc::clone(&self.deliveries);

        tokio::spawn(async move {
            if let Err(e) = Self::handle(delivery, worker, deliveries).await {
                error!("{:#}", e);
            }
            // Permit is released when dropped
        })
    }

    async fn handle(
        delivery: Delivery,
        worker: Arc<Worker>,
        deliveries: Arc<dyn DeliverySource>,
    ) -> Result<()> {
        debug!(
            "Handling delivery {} for job {} (delivery #{})",
            delivery.id, delivery.job_id, delivery.delivery_count
        );

        let outcome = worker
            .handle_delivery(delivery.job_id)
            .await
            .with_context(|| format!("Failed to handle job {}", delivery.job_id))?;

        info!("Job {}: {:?}", delivery.job_id, outcome);

        if outcome.should_ack() {
            deliveries
                .ack(delivery.id)
                .await
                .with_context(|| format!("Failed to ack delivery {}", delivery.id))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::domain::job::JobStatus;
    use quill_core::domain::request::GenerationRequest;
    use quill_core::dto::job::CreateJob;
    use quill_jobs::memory::{InMemoryJobStore, InMemoryTaskQueue};
    use quill_jobs::{JobService, WorkerConfig};
    use quill_pipeline::testing::ScriptedProvider;
    use quill_pipeline::{PipelineConfig, StageOrchestrator};
    use std::time::Duration;

    struct Setup {
        poller: DeliveryPoller,
        service: JobService,
        queue: Arc<InMemoryTaskQueue>,
    }

    fn setup(max_parallel_jobs: usize) -> Setup {
        let store = Arc::new(InMemoryJobStore::new());
        let queue = Arc::new(InMemoryTaskQueue::new(Duration::from_secs(60)));
        let pipeline = Arc::new(StageOrchestrator::new(
            Arc::new(ScriptedProvider::new()),
            PipelineConfig {
                retry_backoff_ms: 0,
                max_retry_backoff_ms: 0,
                ..PipelineConfig::default()
            },
        ));
        let worker = Arc::new(Worker::new(
            store.clone(),
            queue.clone(),
            pipeline,
            WorkerConfig::default(),
        ));

        let config = Config {
            max_parallel_jobs,
            ..Config::default()
        };

        Setup {
            poller: DeliveryPoller::new(config, queue.clone(), worker),
            service: JobService::new(store, queue.clone()),
            queue,
        }
    }

    fn create() -> CreateJob {
        CreateJob {
            id: None,
            request: GenerationRequest::new("Async Rust", vec!["tokio".into()], 300),
        }
    }

    #[tokio::test]
    async fn test_poll_once_completes_and_acks() {
        let s = setup(2);
        let job = s.service.create_job(create()).await.unwrap();

        assert_eq!(s.poller.poll_once().await.unwrap(), 1);

        let job = s.service.get_job(job.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.document.is_some());
        assert!(s.queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_poll_once_respects_parallelism() {
        let s = setup(2);
        for _ in 0..3 {
            s.service.create_job(create()).await.unwrap();
        }

        assert_eq!(s.poller.poll_once().await.unwrap(), 2);
        assert_eq!(s.queue.len().await, 1);

        let completed = s.service.list_jobs(Some(JobStatus::Completed)).await.unwrap();
        assert_eq!(completed.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_job_is_acked_without_running() {
        let s = setup(1);
        let job = s.service.create_job(create()).await.unwrap();
        s.service.cancel_job(job.id).await.unwrap();

        assert_eq!(s.poller.poll_once().await.unwrap(), 1);

        let job = s.service.get_job(job.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.stages.is_empty());
        assert!(s.queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_queue() {
        let s = setup(1);
        assert_eq!(s.poller.poll_once().await.unwrap(), 0);
    }
}
