//! Jobs repository
//!
//! [`JobStore`] over the orchestrator's job endpoints. Conditional updates
//! are answered with 409 when the job moved on; the current state is then
//! read back so the worker learns what happened (e.g. a cancellation).

use async_trait::async_trait;
use quill_client::{ClientError, OrchestratorClient};
use quill_core::domain::job::{Job, JobUpdate};
use quill_jobs::{JobFilter, JobStore, StoreError};
use std::sync::Arc;
use uuid::Uuid;

pub struct HttpJobStore {
    client: Arc<OrchestratorClient>,
}

impl HttpJobStore {
    pub fn new(client: Arc<OrchestratorClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobStore for HttpJobStore {
    /// Jobs are created through the orchestrator's job API, which also
    /// enqueues them; runners never insert records directly
    async fn create(&self, job: Job) -> Result<Job, StoreError> {
        Err(StoreError::Backend(format!(
            "job {} must be created through the orchestrator",
            job.id
        )))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        match self.client.get_job(id).await {
            Ok(job) => Ok(Some(job)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(store_error(e, id)),
        }
    }

    async fn conditional_update(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError> {
        match self.client.update_job(id, &update).await {
            Ok(job) => Ok(job),
            Err(e) if e.is_conflict() => {
                let current = self.get(id).await?.ok_or(StoreError::NotFound(id))?;
                Err(StoreError::Conflict {
                    expected_status: update.expected_status,
                    expected_attempts: update.expected_attempts,
                    actual_status: current.status,
                    actual_attempts: current.attempts,
                })
            }
            Err(e) => Err(store_error(e, id)),
        }
    }

    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>, StoreError> {
        let summaries = self
            .client
            .list_jobs(filter.status)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let limit = filter.limit.unwrap_or(summaries.len());
        let mut jobs = Vec::with_capacity(limit.min(summaries.len()));
        for summary in summaries.into_iter().take(limit) {
            // Jobs deleted in between are skipped
            if let Some(job) = self.get(summary.id).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }
}

/// Maps a non-conflict client error onto the store's error kinds
fn store_error(err: ClientError, id: Uuid) -> StoreError {
    match &err {
        ClientError::ApiError { status: 404, .. } => StoreError::NotFound(id),
        ClientError::ApiError {
            status: 400,
            message,
        } => StoreError::IllegalTransition(message.clone()),
        _ => StoreError::Backend(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_store_errors() {
        let id = Uuid::new_v4();

        assert_eq!(
            store_error(ClientError::api_error(404, "gone"), id),
            StoreError::NotFound(id)
        );
        assert_eq!(
            store_error(ClientError::api_error(400, "illegal transition"), id),
            StoreError::IllegalTransition("illegal transition".to_string())
        );
        assert!(matches!(
            store_error(ClientError::api_error(500, "boom"), id),
            StoreError::Backend(_)
        ));
    }
}
