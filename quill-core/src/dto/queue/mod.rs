//! Task queue DTOs for inter-service communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to put a job on the delivery queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub job_id: Uuid,
    /// Seconds before the delivery becomes visible
    #[serde(default)]
    pub delay_secs: u64,
}

/// Request to lease deliveries for processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseRequest {
    pub runner_id: String,
    pub max: usize,
}

/// A leased delivery
///
/// The delivery stays invisible until its lease expires. Unacknowledged
/// deliveries are handed out again, so the same job may arrive twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: i64,
    pub job_id: Uuid,
    /// How many times this delivery has been leased, including this one
    pub delivery_count: u32,
}
