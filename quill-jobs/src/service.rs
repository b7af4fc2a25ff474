//! Job Service
//!
//! Business logic for the job lifecycle exposed to callers: create, poll,
//! cancel and list.

use quill_core::domain::job::{Job, JobStatus, JobUpdate};
use quill_core::dto::job::{CreateJob, JobStatusView, JobSummary};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::queue::{QueueError, TaskQueue};
use crate::store::{JobFilter, JobStore, StoreError};

/// Bound on optimistic retries when a concurrent writer wins
const MAX_UPDATE_RETRIES: usize = 5;

/// Service error type
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("job id {0} is already used by a different request")]
    IdConflict(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Lifecycle operations on jobs
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn TaskQueue>,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>, queue: Arc<dyn TaskQueue>) -> Self {
        Self { store, queue }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Creates a job and enqueues it
    ///
    /// A caller-supplied id acts as an idempotency key: when a job with the
    /// same id and request exists, it is returned unchanged (and enqueued if
    /// an earlier attempt stopped before that).
    pub async fn create_job(&self, req: CreateJob) -> Result<Job, JobError> {
        req.request.validate().map_err(JobError::ValidationError)?;

        let id = req.id.unwrap_or_else(Uuid::new_v4);
        let job = match self.store.create(Job::new(id, req.request.clone())).await {
            Ok(job) => {
                info!("Job created: {} ({})", job.id, job.request.topic);
                job
            }
            Err(StoreError::AlreadyExists(_)) => {
                let existing = self.get_job(id).await?;
                if existing.request != req.request {
                    return Err(JobError::IdConflict(id));
                }
                debug!("Job {} already exists with status {}", id, existing.status);
                existing
            }
            Err(e) => return Err(e.into()),
        };

        if job.status != JobStatus::Pending {
            return Ok(job);
        }

        self.enqueue_pending(job).await
    }

    /// Enqueues a pending job and moves it to `Queued`
    async fn enqueue_pending(&self, job: Job) -> Result<Job, JobError> {
        self.queue.enqueue(job.id, Duration::ZERO).await?;

        match self
            .store
            .conditional_update(
                job.id,
                JobUpdate::transition(JobStatus::Pending, job.attempts, JobStatus::Queued),
            )
            .await
        {
            Ok(job) => {
                info!("Job {} queued", job.id);
                Ok(job)
            }
            Err(e) if e.is_conflict() => {
                // Someone else queued or cancelled it meanwhile
                self.get_job(job.id).await
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Job, JobError> {
        self.store.get(id).await?.ok_or(JobError::NotFound(id))
    }

    /// Status, stage progress and result or error of a job
    pub async fn get_job_status(&self, id: Uuid) -> Result<JobStatusView, JobError> {
        Ok(self.get_job(id).await?.into())
    }

    /// Lists jobs, newest first
    pub async fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<JobSummary>, JobError> {
        let jobs = self
            .store
            .list(JobFilter {
                status,
                limit: None,
            })
            .await?;
        Ok(jobs.into_iter().map(JobSummary::from).collect())
    }

    /// Cancels a job that has not finished yet
    ///
    /// Cancelling an already cancelled job is a no-op. A processing worker
    /// notices the cancellation before its next stage.
    pub async fn cancel_job(&self, id: Uuid) -> Result<Job, JobError> {
        for _ in 0..MAX_UPDATE_RETRIES {
            let job = self.get_job(id).await?;

            if job.status == JobStatus::Cancelled {
                return Ok(job);
            }
            if !job.status.is_cancellable() {
                return Err(JobError::InvalidState(format!(
                    "Job {} is {} and cannot be cancelled",
                    id, job.status
                )));
            }

            match self
                .store
                .conditional_update(
                    id,
                    JobUpdate::transition(job.status, job.attempts, JobStatus::Cancelled),
                )
                .await
            {
                Ok(job) => {
                    info!("Job {} cancelled", id);
                    return Ok(job);
                }
                Err(e) if e.is_conflict() => {
                    debug!("Job {} changed while cancelling, retrying", id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!("Gave up cancelling job {} after {} conflicts", id, MAX_UPDATE_RETRIES);
        Err(JobError::InvalidState(format!(
            "Job {} kept changing while cancelling",
            id
        )))
    }
}
