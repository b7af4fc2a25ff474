//! In-memory job store and task queue
//!
//! Process-local implementations with the same semantics as the durable
//! backends. Used by tests and by single-process setups.

use async_trait::async_trait;
use chrono::Utc;
use quill_core::domain::job::{Job, JobUpdate};
use quill_core::dto::queue::Delivery;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use crate::queue::{DeliverySource, QueueError, TaskQueue};
use crate::store::{JobFilter, JobStore, StoreError};

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: Job) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists(job.id));
        }
        jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn conditional_update(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        job.apply_update(update, Utc::now())?;
        Ok(job.clone())
    }

    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut result: Vec<Job> = jobs
            .values()
            .filter(|j| filter.status.is_none_or(|s| j.status == s))
            .cloned()
            .collect();

        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            result.truncate(limit);
        }
        Ok(result)
    }
}

struct Entry {
    id: i64,
    job_id: Uuid,
    delivery_count: u32,
    visible_at: Instant,
}

#[derive(Default)]
struct QueueState {
    next_id: i64,
    entries: VecDeque<Entry>,
}

/// Queue with visibility timeouts, mirroring the durable queue
pub struct InMemoryTaskQueue {
    state: Mutex<QueueState>,
    lease: Duration,
}

impl InMemoryTaskQueue {
    pub fn new(lease: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            lease,
        }
    }

    /// Number of deliveries not yet acknowledged
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Job ids of all unacknowledged deliveries, in enqueue order
    pub async fn job_ids(&self) -> Vec<Uuid> {
        self.state
            .lock()
            .await
            .entries
            .iter()
            .map(|e| e.job_id)
            .collect()
    }
}

impl Default for InMemoryTaskQueue {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, job_id: Uuid, delay: Duration) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = state.next_id;
        state.entries.push_back(Entry {
            id,
            job_id,
            delivery_count: 0,
            visible_at: Instant::now() + delay,
        });
        Ok(())
    }
}

#[async_trait]
impl DeliverySource for InMemoryTaskQueue {
    async fn lease(&self, max: usize) -> Result<Vec<Delivery>, QueueError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let mut leased = Vec::new();

        for entry in state.entries.iter_mut() {
            if leased.len() >= max {
                break;
            }
            if entry.visible_at > now {
                continue;
            }

            entry.delivery_count += 1;
            entry.visible_at = now + self.lease;
            leased.push(Delivery {
                id: entry.id,
                job_id: entry.job_id,
                delivery_count: entry.delivery_count,
            });
        }

        Ok(leased)
    }

    async fn ack(&self, delivery_id: i64) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let position = state
            .entries
            .iter()
            .position(|e| e.id == delivery_id)
            .ok_or(QueueError::UnknownDelivery(delivery_id))?;
        state.entries.remove(position);
        Ok(())
    }
}
