//! Queue repository

use async_trait::async_trait;
use quill_client::OrchestratorClient;
use quill_core::dto::queue::Delivery;
use quill_jobs::{DeliverySource, QueueError, TaskQueue};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Task queue reached through the orchestrator's queue endpoints
pub struct HttpTaskQueue {
    client: Arc<OrchestratorClient>,
    runner_id: String,
}

impl HttpTaskQueue {
    /// # Arguments
    /// * `client` - Shared orchestrator client
    /// * `runner_id` - Reported to the orchestrator when leasing
    pub fn new(client: Arc<OrchestratorClient>, runner_id: String) -> Self {
        Self { client, runner_id }
    }
}

#[async_trait]
impl TaskQueue for HttpTaskQueue {
    async fn enqueue(&self, job_id: Uuid, delay: Duration) -> Result<(), QueueError> {
        self.client
            .enqueue(job_id, delay)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))
    }
}

#[async_trait]
impl DeliverySource for HttpTaskQueue {
    async fn lease(&self, max: usize) -> Result<Vec<Delivery>, QueueError> {
        self.client
            .lease_deliveries(&self.runner_id, max)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))
    }

    async fn ack(&self, delivery_id: i64) -> Result<(), QueueError> {
        self.client
            .ack_delivery(delivery_id)
            .await
            .map_err(|e| match e {
                e if e.is_not_found() => QueueError::UnknownDelivery(delivery_id),
                e => QueueError::Backend(e.to_string()),
            })
    }
}
