//! Worker entry point
//!
//! `handle_delivery` is invoked once per queue delivery. Deliveries are
//! at-least-once, so the handler is idempotent: finished jobs short-circuit,
//! and only a `Queued` job is claimed, through a conditional update that at
//! most one worker can win.

use async_trait::async_trait;
use quill_core::domain::job::{Job, JobFailure, JobStatus, JobUpdate};
use quill_core::domain::stage::{StageKind, StageResult};
use quill_pipeline::{Interrupt, PipelineError, RunControl, StageOrchestrator};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::queue::{QueueError, TaskQueue};
use crate::store::{JobStore, StoreError};

/// Worker settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Claims per job before a transient failure becomes terminal
    pub max_attempts: u32,

    /// Delay before the first re-delivery, doubled per attempt
    pub requeue_backoff: Duration,
    pub max_requeue_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            requeue_backoff: Duration::from_secs(5),
            max_requeue_backoff: Duration::from_secs(120),
        }
    }
}

impl WorkerConfig {
    /// Re-delivery delay after attempt number `attempt` failed
    pub fn requeue_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.requeue_backoff
            .saturating_mul(factor)
            .min(self.max_requeue_backoff)
    }
}

/// What a delivery led to
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Completed,
    Failed(JobFailure),
    /// Transient failure with budget left; the job is queued again
    Requeued { attempts: u32, delay: Duration },
    Cancelled,
    /// The job had already finished; nothing ran
    AlreadyFinished(JobStatus),
    /// Another worker is processing the job
    InProgress,
    /// Another worker claimed the job first
    ClaimLost,
    /// The job is still `Pending`; its creation has not finished
    NotReady,
    /// No such job
    Missing,
}

impl DeliveryOutcome {
    /// Whether the delivery can be acknowledged
    ///
    /// `NotReady` and `InProgress` deliveries are left to expire and come
    /// back later, so a job whose worker died keeps a pending delivery.
    pub fn should_ack(&self) -> bool {
        !matches!(self, DeliveryOutcome::NotReady | DeliveryOutcome::InProgress)
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("job {job_id} interrupted: {reason}")]
    Interrupted { job_id: Uuid, reason: String },
}

/// Runs the pipeline for delivered jobs
pub struct Worker {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn TaskQueue>,
    pipeline: Arc<StageOrchestrator>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<dyn TaskQueue>,
        pipeline: Arc<StageOrchestrator>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            queue,
            pipeline,
            config,
        }
    }

    /// Handles one delivery of `job_id`
    ///
    /// An `Err` means the outcome could not be recorded; the delivery should
    /// not be acknowledged so that it is retried.
    pub async fn handle_delivery(&self, job_id: Uuid) -> Result<DeliveryOutcome, WorkerError> {
        let Some(job) = self.store.get(job_id).await? else {
            warn!("Delivery for unknown job {}", job_id);
            return Ok(DeliveryOutcome::Missing);
        };

        match job.status {
            status if status.is_terminal() => {
                debug!("Job {} already {}, skipping", job_id, status);
                return Ok(DeliveryOutcome::AlreadyFinished(status));
            }
            JobStatus::Pending => {
                debug!("Job {} not queued yet", job_id);
                return Ok(DeliveryOutcome::NotReady);
            }
            JobStatus::Processing => {
                debug!("Job {} is being processed elsewhere", job_id);
                return Ok(DeliveryOutcome::InProgress);
            }
            _ => {}
        }

        let job = match self
            .store
            .conditional_update(job_id, JobUpdate::claim(job.attempts))
            .await
        {
            Ok(job) => job,
            Err(e) if e.is_conflict() => {
                debug!("Lost claim on job {}: {}", job_id, e);
                return Ok(DeliveryOutcome::ClaimLost);
            }
            Err(e) => return Err(e.into()),
        };

        let attempt = job.attempts;
        info!(
            "Job {} claimed (attempt {}/{})",
            job_id, attempt, self.config.max_attempts
        );

        self.process(job, attempt).await
    }

    async fn process(&self, job: Job, attempt: u32) -> Result<DeliveryOutcome, WorkerError> {
        let control = JobRunControl {
            store: self.store.clone(),
            job_id: job.id,
            attempt,
        };

        match self.pipeline.run_with(&job.request, &control).await {
            Ok(document) => {
                match self
                    .store
                    .conditional_update(job.id, JobUpdate::complete(attempt, document))
                    .await
                {
                    Ok(_) => {
                        info!("Job {} completed", job.id);
                        Ok(DeliveryOutcome::Completed)
                    }
                    Err(StoreError::Conflict {
                        actual_status: JobStatus::Cancelled,
                        ..
                    }) => {
                        info!("Job {} was cancelled during its last stage", job.id);
                        Ok(DeliveryOutcome::Cancelled)
                    }
                    Err(e) if e.is_conflict() => Ok(DeliveryOutcome::ClaimLost),
                    Err(e) => Err(e.into()),
                }
            }
            Err(PipelineError::Cancelled { before_stage }) => {
                info!("Job {} cancelled before stage {}", job.id, before_stage);
                Ok(DeliveryOutcome::Cancelled)
            }
            Err(PipelineError::Interrupted { stage, interrupt }) => match interrupt {
                Interrupt::Lost(reason) => {
                    warn!("Job {} lost at stage {}: {}", job.id, stage, reason);
                    Ok(DeliveryOutcome::ClaimLost)
                }
                other => Err(WorkerError::Interrupted {
                    job_id: job.id,
                    reason: other.to_string(),
                }),
            },
            Err(e) => self.handle_failure(&job, attempt, e).await,
        }
    }

    async fn handle_failure(
        &self,
        job: &Job,
        attempt: u32,
        err: PipelineError,
    ) -> Result<DeliveryOutcome, WorkerError> {
        let transient = err.is_transient();
        let failure = JobFailure {
            stage: err.stage(),
            message: err.to_string(),
            attempts: attempt,
            transient,
        };

        if transient && attempt < self.config.max_attempts {
            let delay = self.config.requeue_delay(attempt);
            warn!(
                "Job {} attempt {}/{} failed: {}; re-enqueueing in {:?}",
                job.id, attempt, self.config.max_attempts, err, delay
            );

            match self
                .store
                .conditional_update(job.id, JobUpdate::requeue(attempt, failure))
                .await
            {
                Ok(_) => {}
                Err(StoreError::Conflict {
                    actual_status: JobStatus::Cancelled,
                    ..
                }) => return Ok(DeliveryOutcome::Cancelled),
                Err(e) if e.is_conflict() => return Ok(DeliveryOutcome::ClaimLost),
                Err(e) => return Err(e.into()),
            }

            self.queue.enqueue(job.id, delay).await?;
            return Ok(DeliveryOutcome::Requeued {
                attempts: attempt,
                delay,
            });
        }

        error!(
            "Job {} failed permanently after {} attempt(s): {}",
            job.id, attempt, err
        );

        match self
            .store
            .conditional_update(job.id, JobUpdate::fail(attempt, failure.clone()))
            .await
        {
            Ok(_) => Ok(DeliveryOutcome::Failed(failure)),
            Err(StoreError::Conflict {
                actual_status: JobStatus::Cancelled,
                ..
            }) => Ok(DeliveryOutcome::Cancelled),
            Err(e) if e.is_conflict() => Ok(DeliveryOutcome::ClaimLost),
            Err(e) => Err(e.into()),
        }
    }
}

/// Ties a pipeline run to the job record
///
/// Before each stage the job is re-read so cancellation is noticed; after
/// each stage a snapshot is appended under the claim.
struct JobRunControl {
    store: Arc<dyn JobStore>,
    job_id: Uuid,
    attempt: u32,
}

#[async_trait]
impl RunControl for JobRunControl {
    async fn before_stage(&self, stage: StageKind) -> Result<(), Interrupt> {
        let job = self
            .store
            .get(self.job_id)
            .await
            .map_err(|e| Interrupt::Store(e.to_string()))?
            .ok_or_else(|| Interrupt::Lost("job record disappeared".to_string()))?;

        match job.status {
            JobStatus::Cancelled => Err(Interrupt::Cancelled),
            JobStatus::Processing if job.attempts == self.attempt => Ok(()),
            status => Err(Interrupt::Lost(format!(
                "job is {} at attempt {} before stage {}",
                status, job.attempts, stage
            ))),
        }
    }

    async fn after_stage(&self, result: &StageResult) -> Result<(), Interrupt> {
        match self
            .store
            .conditional_update(
                self.job_id,
                JobUpdate::record_stage(self.attempt, result.clone()),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(StoreError::Conflict {
                actual_status: JobStatus::Cancelled,
                ..
            }) => Err(Interrupt::Cancelled),
            Err(e) if e.is_conflict() => Err(Interrupt::Lost(e.to_string())),
            Err(e) => Err(Interrupt::Store(e.to_string())),
        }
    }
}
