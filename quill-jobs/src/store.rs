//! Job store abstraction
//!
//! The store is the single source of truth for job state. Every write goes
//! through [`JobStore::conditional_update`], which only applies when the job
//! still has the expected status and attempt counter.

use async_trait::async_trait;
use quill_core::domain::job::{Job, JobStatus, JobUpdate, UpdateRejected};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job {0} already exists")]
    AlreadyExists(Uuid),

    #[error("job is {actual_status} (attempts {actual_attempts}), expected {expected_status} (attempts {expected_attempts})")]
    Conflict {
        expected_status: JobStatus,
        expected_attempts: u32,
        actual_status: JobStatus,
        actual_attempts: u32,
    },

    #[error("illegal update: {0}")]
    IllegalTransition(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<UpdateRejected> for StoreError {
    fn from(rejected: UpdateRejected) -> Self {
        match rejected {
            UpdateRejected::Conflict {
                expected_status,
                expected_attempts,
                actual_status,
                actual_attempts,
            } => StoreError::Conflict {
                expected_status,
                expected_attempts,
                actual_status,
                actual_attempts,
            },
            other => StoreError::IllegalTransition(other.to_string()),
        }
    }
}

/// Listing filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub limit: Option<usize>,
}

impl JobFilter {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            limit: None,
        }
    }
}

/// Durable job records
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a new job; fails with [`StoreError::AlreadyExists`] when the
    /// id is taken
    async fn create(&self, job: Job) -> Result<Job, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Applies `update` atomically and returns the updated job
    ///
    /// # Arguments
    /// * `id` - Job to update
    /// * `update` - Expected status/attempts, new status and fields
    async fn conditional_update(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError>;

    /// Lists jobs, newest first
    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>, StoreError>;
}
