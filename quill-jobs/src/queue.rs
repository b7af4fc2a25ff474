//! Task queue abstraction
//!
//! Delivery is at-least-once and unordered. Producers only enqueue job ids;
//! consumers lease deliveries and acknowledge them once handled. A delivery
//! that is not acknowledged before its lease runs out is handed out again.

use async_trait::async_trait;
use quill_core::dto::queue::Delivery;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("delivery {0} not found")]
    UnknownDelivery(i64),

    #[error("queue backend error: {0}")]
    Backend(String),
}

/// Producer side of the queue
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueues a job; the delivery becomes visible after `delay`
    async fn enqueue(&self, job_id: Uuid, delay: Duration) -> Result<(), QueueError>;
}

/// Consumer side of the queue
#[async_trait]
pub trait DeliverySource: Send + Sync {
    /// Leases up to `max` visible deliveries
    async fn lease(&self, max: usize) -> Result<Vec<Delivery>, QueueError>;

    /// Removes a handled delivery
    async fn ack(&self, delivery_id: i64) -> Result<(), QueueError>;
}
