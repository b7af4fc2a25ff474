//! Job-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use quill_core::domain::job::{Job, JobStatus, JobUpdate};
use quill_core::dto::job::{CreateJob, JobStatusView, JobSummary};
use uuid::Uuid;

impl OrchestratorClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Create a job and queue it for processing
    ///
    /// Submitting the same `id` twice returns the existing job.
    pub async fn create_job(&self, req: CreateJob) -> Result<Job> {
        let url = format!("{}/jobs", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Get the full job record
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get status, stage progress and result or error of a job
    pub async fn get_job_status(&self, job_id: Uuid) -> Result<JobStatusView> {
        let url = format!("{}/jobs/{}/status", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List jobs, newest first
    ///
    /// # Arguments
    /// * `status` - Only return jobs in this status
    pub async fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<JobSummary>> {
        let url = format!("{}/jobs", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }
        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// Cancel a job that has not finished yet
    pub async fn cancel_job(&self, job_id: Uuid) -> Result<Job> {
        let url = format!("{}/jobs/{}/cancel", self.base_url, job_id);
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Job Updates (Runner-specific)
    // =============================================================================

    /// Apply a conditional update
    ///
    /// Fails with a 409 [`ApiError`](crate::ClientError::ApiError) when the
    /// job no longer has the expected status and attempt counter.
    pub async fn update_job(&self, job_id: Uuid, update: &JobUpdate) -> Result<Job> {
        let url = format!("{}/jobs/{}/update", self.base_url, job_id);
        let response = self.client.post(&url).json(update).send().await?;

        self.handle_response(response).await
    }
}
