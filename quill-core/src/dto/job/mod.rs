//! Job DTOs for inter-service communication

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::document::ContentDocument;
use crate::domain::job::{Job, JobFailure, JobStatus};
use crate::domain::request::GenerationRequest;
use crate::domain::stage::StageKind;
use crate::domain::warning::StructuralWarning;

pub use crate::domain::job::{JobFields, JobUpdate};

/// Request to create a new asynchronous job
///
/// `id` doubles as an idempotency key: submitting the same id twice
/// returns the existing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub request: GenerationRequest,
}

/// Poll response for a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusView {
    pub id: Uuid,
    pub status: JobStatus,
    pub attempts: u32,
    pub stages: Vec<StageProgress>,
    pub document: Option<ContentDocument>,
    /// Only set for failed jobs
    pub error: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Progress entry for a finished stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageProgress {
    pub stage: StageKind,
    pub attempt: u32,
    pub provider_calls: u32,
    pub metrics: BTreeMap<String, f64>,
    pub warnings: Vec<StructuralWarning>,
    pub recorded_at: DateTime<Utc>,
}

impl From<Job> for JobStatusView {
    fn from(job: Job) -> Self {
        let error = match job.status {
            JobStatus::Failed => job.error,
            _ => None,
        };

        Self {
            id: job.id,
            status: job.status,
            attempts: job.attempts,
            stages: job
                .stages
                .into_iter()
                .map(|s| StageProgress {
                    stage: s.result.stage,
                    attempt: s.attempt,
                    provider_calls: s.result.provider_calls,
                    metrics: s.result.metrics,
                    warnings: s.result.warnings,
                    recorded_at: s.recorded_at,
                })
                .collect(),
            document: job.document,
            error,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Lightweight job summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub topic: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobSummary {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            topic: job.request.topic,
            status: job.status,
            attempts: job.attempts,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
