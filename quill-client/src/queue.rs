//! Delivery queue endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use quill_core::dto::queue::{Delivery, EnqueueRequest, LeaseRequest};
use std::time::Duration;
use uuid::Uuid;

impl OrchestratorClient {
    /// Put a job on the queue, visible after `delay`
    pub async fn enqueue(&self, job_id: Uuid, delay: Duration) -> Result<()> {
        let url = format!("{}/queue/enqueue", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EnqueueRequest {
                job_id,
                delay_secs: delay.as_secs(),
            })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Lease up to `max` deliveries for this runner
    pub async fn lease_deliveries(&self, runner_id: &str, max: usize) -> Result<Vec<Delivery>> {
        let url = format!("{}/queue/lease", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&LeaseRequest {
                runner_id: runner_id.to_string(),
                max,
            })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Acknowledge a handled delivery
    pub async fn ack_delivery(&self, delivery_id: i64) -> Result<()> {
        let url = format!("{}/queue/{}/ack", self.base_url, delivery_id);
        let response = self.client.post(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
